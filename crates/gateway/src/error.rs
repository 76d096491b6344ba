use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

use services::error::{IdentityError, SessionError, StreakError};
use storage::repository::StorageError;
use trace_core::catalog::CatalogError;

/// Everything a handler can fail with, mapped onto HTTP status codes.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GatewayError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Streak(#[from] StreakError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::InvalidInput(_) => StatusCode::BAD_REQUEST,

            GatewayError::Session(SessionError::Catalog(CatalogError::UnknownShape(_))) => {
                StatusCode::NOT_FOUND
            }
            GatewayError::Session(_) => StatusCode::BAD_REQUEST,

            GatewayError::Streak(StreakError::UserNotFound) => StatusCode::NOT_FOUND,
            GatewayError::Streak(StreakError::AlreadyExists) => StatusCode::CONFLICT,
            GatewayError::Streak(StreakError::Storage(StorageError::Conflict)) => {
                StatusCode::CONFLICT
            }
            GatewayError::Streak(_) => StatusCode::SERVICE_UNAVAILABLE,

            GatewayError::Identity(IdentityError::Unauthenticated) => StatusCode::UNAUTHORIZED,
            GatewayError::Identity(IdentityError::Unconfirmed) => StatusCode::FORBIDDEN,
            GatewayError::Identity(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
