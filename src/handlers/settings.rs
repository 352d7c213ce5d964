use actix_web::{get, post, put, web, HttpResponse, Responder};
use uuid::Uuid;

use crate::dto::IdentifyDto;
use crate::errors::ServiceError;
use crate::models::NotificationSettings;
use crate::service::notify::{NotificationDispatcher, Toast};
use crate::service::settings::SettingsRepository;

#[post("/identify")]
pub async fn identify(
   identify_dto: web::Json<IdentifyDto>,
   repository: web::Data<SettingsRepository>,
) -> impl Responder {
   let settings = repository.identify(identify_dto.into_inner().user_id);
   HttpResponse::Ok().json(settings)
}

#[get("/{user_id}")]
pub async fn get_settings(
   user_id: web::Path<Uuid>,
   repository: web::Data<SettingsRepository>,
) -> impl Responder {
   HttpResponse::Ok().json(repository.load(user_id.into_inner()))
}

#[put("/{user_id}")]
pub async fn save_settings(
   user_id: web::Path<Uuid>,
   settings: web::Json<NotificationSettings>,
   repository: web::Data<SettingsRepository>,
   dispatcher: web::Data<NotificationDispatcher>,
) -> impl Responder {
   match repository.save(user_id.into_inner(), settings.into_inner()) {
      Ok(()) => {
         dispatcher.toast(Toast::success("Notification settings saved"));
         HttpResponse::Ok().json("settings saved")
      }
      Err(err) => {
         dispatcher.toast(Toast::error("Failed to save notification settings"));
         HttpResponse::from_error(err)
      }
   }
}

#[post("/{user_id}/reset")]
pub async fn reset_settings(
   user_id: web::Path<Uuid>,
   repository: web::Data<SettingsRepository>,
) -> impl Responder {
   match repository.reset(user_id.into_inner()) {
      Ok(defaults) => HttpResponse::Ok().json(defaults),
      Err(err) => HttpResponse::from_error(err),
   }
}

pub fn config(cfg: &mut web::ServiceConfig) {
   cfg.service(identify);
   cfg.service(get_settings);
   cfg.service(save_settings);
   cfg.service(reset_settings);
}

#[get("/permission")]
pub async fn get_permission(dispatcher: web::Data<NotificationDispatcher>) -> impl Responder {
   HttpResponse::Ok().json(dispatcher.permission())
}

#[post("/permission")]
pub async fn request_permission(dispatcher: web::Data<NotificationDispatcher>) -> impl Responder {
   let state = dispatcher.request_permission().await;
   HttpResponse::Ok().json(state)
}

#[post("/test")]
pub async fn test_notification(dispatcher: web::Data<NotificationDispatcher>) -> impl Responder {
   let state = dispatcher.send_test().await;
   if state == crate::service::notify::PermissionState::Granted {
      HttpResponse::Ok().json(state)
   } else {
      HttpResponse::from_error(ServiceError::BadClientData)
   }
}

pub fn config_notifications(cfg: &mut web::ServiceConfig) {
   cfg.service(get_permission);
   cfg.service(request_permission);
   cfg.service(test_notification);
}
