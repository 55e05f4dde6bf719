use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Invalid or missing configuration, detected at startup. Fatal.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// The channel could not accept an outbound message.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("provider rejected message (status {status}): {message}")]
    Rejected {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    #[error("send timed out after {0}s")]
    Timeout(u64),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to send message: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("{0}")]
    Validation(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(reason) => {
                tracing::warn!(reason = %reason, "rejected invalid request");
                StatusCode::BAD_REQUEST
            }
            AppError::Delivery(e) => {
                tracing::error!(error = %e, "message delivery failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
