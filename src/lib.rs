pub mod db;
pub mod dto;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod service;

use sqlx::{postgres::Postgres, Pool};

pub type PGPool = Pool<Postgres>;

pub type AppCoordinator = service::coordinator::EventCoordinator<db::event::PgEventStore>;
