use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse, Responder};
use uuid::Uuid;

use crate::dto::{EventFiltersQuery, NewEventDto, UpdateEventDto};
use crate::errors::ServiceError;
use crate::AppCoordinator;

fn user_from_headers(req: &HttpRequest) -> Result<Uuid, ServiceError> {
   let raw = match req.headers().get("x-user-id") {
      Some(value) => match value.to_str() {
         Ok(raw) => raw,
         Err(_) => return Err(ServiceError::Unauthorized),
      },
      None => return Err(ServiceError::Unauthorized),
   };
   match Uuid::parse_str(raw) {
      Ok(user_id) => Ok(user_id),
      Err(_) => Err(ServiceError::Unauthorized),
   }
}

#[get("/")]
pub async fn list(
   query: web::Query<EventFiltersQuery>,
   coordinator: web::Data<AppCoordinator>,
) -> impl Responder {
   let filters = match query.into_inner().into_filters() {
      Ok(filters) => filters,
      Err(err) => return HttpResponse::from_error(err),
   };
   match coordinator.fetch(filters).await {
      Ok(events) => HttpResponse::Ok().json(events),
      Err(err) => HttpResponse::from_error(err),
   }
}

#[get("/{id}")]
pub async fn get_by_id(
   id: web::Path<Uuid>,
   coordinator: web::Data<AppCoordinator>,
) -> impl Responder {
   match coordinator.event_by_id(id.into_inner()) {
      Some(event) => HttpResponse::Ok().json(event),
      None => HttpResponse::from_error(ServiceError::NotFound),
   }
}

#[post("/create")]
pub async fn create(
   req: HttpRequest,
   new_event_dto: web::Json<NewEventDto>,
   coordinator: web::Data<AppCoordinator>,
) -> impl Responder {
   let created_by = match user_from_headers(&req) {
      Ok(user_id) => user_id,
      Err(err) => return HttpResponse::from_error(err),
   };
   match coordinator.create(new_event_dto.into_inner(), Some(created_by)).await {
      Ok(event) => HttpResponse::Created().json(event),
      Err(err) => HttpResponse::from_error(err),
   }
}

#[put("/update/{id}")]
pub async fn update(
   id: web::Path<Uuid>,
   update_event_dto: web::Json<UpdateEventDto>,
   coordinator: web::Data<AppCoordinator>,
) -> impl Responder {
   let current = match coordinator.event_by_id(id.into_inner()) {
      Some(event) => event,
      None => return HttpResponse::from_error(ServiceError::NotFound),
   };
   let patched = update_event_dto.into_inner().apply_to(&current);
   match coordinator.update(patched).await {
      Ok(()) => HttpResponse::Ok().json("update successful"),
      Err(err) => HttpResponse::from_error(err),
   }
}

#[delete("/{id}")]
pub async fn remove(
   id: web::Path<Uuid>,
   coordinator: web::Data<AppCoordinator>,
) -> impl Responder {
   match coordinator.delete(id.into_inner()).await {
      Ok(()) => HttpResponse::Ok().json("delete successful"),
      Err(err) => HttpResponse::from_error(err),
   }
}

#[post("/reconcile")]
pub async fn reconcile(coordinator: web::Data<AppCoordinator>) -> impl Responder {
   match coordinator.reconcile_statuses().await {
      Ok(()) => HttpResponse::Ok().json("statuses reconciled"),
      Err(err) => HttpResponse::from_error(err),
   }
}

pub fn config(cfg: &mut web::ServiceConfig) {
   cfg.service(create);
   cfg.service(update);
   cfg.service(reconcile);
   cfg.service(list);
   cfg.service(get_by_id);
   cfg.service(remove);
}
