//! Error types for cashform-api

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cashform_config::ConfigError;
use cashform_core::{CoreError, ErrorCode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Ledger unavailable: {message}")]
    Unavailable { message: String },

    #[error("Internal server error")]
    InternalError,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        if !err.is_client_error() {
            log::error!("{}", err.to_details());
        }
        match err.code() {
            ErrorCode::AccountNotFound | ErrorCode::TransactionNotFound => ApiError::NotFound {
                resource: err.to_string(),
            },
            ErrorCode::FileNotFound | ErrorCode::ParseError | ErrorCode::IoError | ErrorCode::SyncError => {
                ApiError::Unavailable {
                    message: err.to_string(),
                }
            }
            ErrorCode::InternalError => ApiError::InternalError,
            _ => ApiError::BadRequest {
                message: err.to_string(),
            },
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::EntryNotFound { .. } => ApiError::NotFound {
                resource: err.to_string(),
            },
            ConfigError::ValidationError { .. } | ConfigError::InvalidValue { .. } | ConfigError::MissingField { .. } => {
                ApiError::BadRequest {
                    message: err.to_string(),
                }
            }
            _ => ApiError::Unavailable {
                message: err.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "success": false, "message": self.to_string() });
        (self.status(), axum::Json(body)).into_response()
    }
}
