use actix_web::{
    error,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use derive_more::{Display, Error};

#[derive(Debug, Clone, Display, Error, serde::Deserialize, serde::Serialize)]
pub enum ServiceError {
    #[display(fmt = "internal error")]
    InternalError,

    #[display(fmt = "store failure")]
    StoreFailure,

    #[display(fmt = "not found")]
    NotFound,

    #[display(fmt = "bad request")]
    BadClientData,

    #[display(fmt = "unauthorized")]
    Unauthorized,
}

impl error::ResponseError for ServiceError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(self)
    }

    fn status_code(&self) -> StatusCode {
        match *self {
            ServiceError::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::StoreFailure => StatusCode::BAD_GATEWAY,
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::BadClientData => StatusCode::BAD_REQUEST,
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}
