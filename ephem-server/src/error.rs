use crate::metrics;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ephem_api::ValidationError;
use thiserror::Error;

/// Message for every unavailable paste, whatever the reason
pub const NOT_FOUND_MESSAGE: &str = "Paste not found or no longer available";

/// JSON API errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{}", NOT_FOUND_MESSAGE)]
    NotFound,

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "bad_request",
            AppError::Validation(_) => "validation",
            AppError::NotFound => "not_found",
            AppError::StoreUnavailable(_) => "store_unavailable",
            AppError::Internal(_) => "internal",
        }
    }
}

impl From<ephem_api::Error> for AppError {
    fn from(err: ephem_api::Error) -> Self {
        match err {
            ephem_api::Error::Validation(v) => AppError::Validation(v),
            ephem_api::Error::StoreUnavailable(e) => AppError::StoreUnavailable(e.to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        metrics::ERRORS_TOTAL
            .with_label_values(&[self.error_type()])
            .inc();

        let status = self.status();
        let message = match &self {
            AppError::StoreUnavailable(detail) | AppError::Internal(detail) => {
                tracing::error!(status = status.as_u16(), "{}", detail);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
