use std::env;
use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use dotenv::dotenv;

use event_agenda_service::db::changes::ChangeBus;
use event_agenda_service::db::event::PgEventStore;
use event_agenda_service::db::init_db_pool;
use event_agenda_service::handlers;
use event_agenda_service::service::clock::{Clock, SystemClock};
use event_agenda_service::service::coordinator::EventCoordinator;
use event_agenda_service::service::log::{init_logger, RequestLogger};
use event_agenda_service::service::notify::{DesktopAlerts, NotificationDispatcher};
use event_agenda_service::service::reminders::ReminderScheduler;
use event_agenda_service::service::settings::{FileSettingsStore, SettingsRepository};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    init_logger();

    let db_url = env::var("DATABASE_URL").unwrap_or_else(|e| {
        panic!("Failed to get env with name 'DATABASE_URL': {:?}", e);
    });
    let pool = init_db_pool(&db_url).await;
    if let Err(err) = sqlx::migrate!("./migrations").run(&pool).await {
        panic!("Failed to run migrations: {:?}", err);
    }

    let store = Arc::new(PgEventStore::new(pool.clone(), ChangeBus::default()));
    let file_store = FileSettingsStore::new().unwrap_or_else(|err| {
        panic!("Failed to open the settings store: {:?}", err);
    });
    let settings = Arc::new(SettingsRepository::new(Box::new(file_store)));
    let dispatcher = Arc::new(NotificationDispatcher::new(
        settings.clone(),
        Box::new(DesktopAlerts),
    ));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let scheduler = Arc::new(ReminderScheduler::new(
        clock.clone(),
        dispatcher.clone(),
        settings.clone(),
    ));
    let coordinator = EventCoordinator::new(store, clock, dispatcher.clone(), scheduler);
    coordinator.clone().run();

    let coordinator_data = web::Data::from(coordinator.clone());
    let dispatcher_data = web::Data::from(dispatcher);
    let settings_data = web::Data::from(settings);

    let served = HttpServer::new(move || {
        App::new()
            .app_data(coordinator_data.clone())
            .app_data(dispatcher_data.clone())
            .app_data(settings_data.clone())
            .wrap(RequestLogger)
            .service(web::scope("/events").configure(handlers::event::config))
            .service(web::scope("/settings/notifications").configure(handlers::settings::config))
            .service(web::scope("/notifications").configure(handlers::settings::config_notifications))
    })
    .bind(("127.0.0.1", 8080))?
    .run()
    .await;

    coordinator.teardown().await;
    served
}
