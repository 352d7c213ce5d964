pub mod changes;
pub mod event;
#[cfg(test)]
pub mod memory;
pub mod store;

use crate::PGPool;
use log::info;
use sqlx::postgres::PgPoolOptions;

pub async fn init_db_pool(db_url: &str) -> PGPool {
    let pool: PGPool = PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .unwrap_or_else(|err| {
            panic!("Failed to connect to postgres: {:?}", err);
        });
    info!("Connected to postgres");
    pool
}
