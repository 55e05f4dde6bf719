use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, JsonRejection},
        State,
    },
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::models::message::ContactForm;
use crate::AppState;

// ── Response DTOs ────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct SentResponse {
    pub message: &'static str,
    pub sid: String,
}

#[derive(Serialize)]
pub struct ContactResponse {
    pub message: &'static str,
}

// ── Handlers ─────────────────────────────────────────────────

/// GET|OPTIONS / — liveness probe
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Server is running",
    })
}

/// GET /request — send an approval request to the approver
pub async fn request_approval(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SentResponse>, AppError> {
    let receipt = state.relay.request_approval().await?;
    Ok(Json(SentResponse {
        message: "Message sent successfully",
        sid: receipt.sid,
    }))
}

/// POST /contact — relay a contact form submission
pub async fn contact(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ContactForm>, JsonRejection>,
) -> Result<Json<ContactResponse>, AppError> {
    let Json(form) = payload
        .map_err(|e| AppError::Validation(format!("invalid request body: {}", e.body_text())))?;

    state.relay.relay_contact(form).await?;
    Ok(Json(ContactResponse {
        message: "Message sent successfully",
    }))
}

/// POST /webhook — inbound reply from the channel.
///
/// Always answers 200 "OK", whatever the payload, so the provider never retries.
/// An unreadable or oversized body counts as an empty reply.
pub async fn webhook(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> (StatusCode, &'static str) {
    let text = match body {
        Ok(body) => reply_text(&body),
        Err(e) => {
            tracing::warn!(error = %e, "unreadable webhook body, treating as empty reply");
            String::new()
        }
    };
    state.relay.receive_reply(&text).await;
    (StatusCode::OK, "OK")
}

/// Extract the `Body` field from a form-encoded payload; empty when absent.
fn reply_text(payload: &[u8]) -> String {
    url::form_urlencoded::parse(payload)
        .find(|(key, _)| key == "Body")
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default()
}
