use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::forms::ValidationError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadGateway(&'static str),

    #[error("Server configuration error")]
    Misconfigured(String),

    #[error("Database Error")]
    Database(#[from] anyhow::Error),

    #[error("Storage Error")]
    Storage(#[from] opendal::Error),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.0)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::Misconfigured(detail) => {
                tracing::error!("Configuration error: {}", detail);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Database(e) => {
                tracing::error!("DB Error: {:#}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Storage(e) => {
                tracing::error!("Storage Error: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, self.to_string()).into_response()
    }
}
