use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Upload(String),
    #[error("{0}")]
    Storage(String),
    // Missing delete/resolve targets surface as 500, not 404; the dashboard
    // frontend keys on that contract.
    #[error("{0}")]
    NotFound(String),
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;
        let status = match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Upload(_) | ApiError::Storage(_) | ApiError::NotFound(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        HttpResponse::build(status).json(ApiErrorBody {
            error: self.to_string(),
        })
    }
}
