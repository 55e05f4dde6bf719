use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use tracing::{debug, info, warn};

use super::ApprovalHook;
use crate::models::approval::Approval;

// ── Webhook Event Types ───────────────────────────────────────

/// A structured event payload sent to webhook endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookEvent {
    /// Event type identifier. Currently always "approval_received".
    pub event_type: String,
    /// ISO-8601 timestamp of when the event occurred.
    pub timestamp: String,
    pub approval: Approval,
    /// Normalized reply text.
    pub reply: String,
}

impl WebhookEvent {
    pub fn approval_received(approval: Approval, reply: &str) -> Self {
        Self {
            event_type: "approval_received".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            approval,
            reply: reply.to_string(),
        }
    }
}

// ── HMAC Signing ─────────────────────────────────────────────

/// Compute HMAC-SHA256 of `payload` using `secret`.
/// Returns "sha256=<lowercase hex>".
fn hmac_sha256_hex(secret: &str, payload: &[u8]) -> Result<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("invalid hmac key: {}", e))?;
    mac.update(payload);
    Ok(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}

// ── Webhook Hook ──────────────────────────────────────────────

/// Forwards every classified reply to the configured URLs.
/// - Body is signed with HMAC-SHA256 (X-Relay-Signature) when a secret is set
/// - One attempt per URL; failures are logged, not retried
#[derive(Clone)]
pub struct WebhookHook {
    client: reqwest::Client,
    urls: Vec<String>,
    signing_secret: Option<String>,
}

impl WebhookHook {
    pub fn new(urls: Vec<String>, signing_secret: Option<String>) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .user_agent(concat!("approval-relay-webhook/", env!("CARGO_PKG_VERSION")))
                .build()?,
            urls,
            signing_secret,
        })
    }

    /// Send a single event to one URL.
    pub async fn send(&self, url: &str, event: &WebhookEvent) -> Result<()> {
        let payload = serde_json::to_vec(event)?;
        let delivery_id = uuid::Uuid::new_v4().to_string();

        let mut req = self
            .client
            .post(url)
            .header("content-type", "application/json")
            .header("x-relay-delivery-id", &delivery_id)
            .header("x-relay-event", &event.event_type);

        if let Some(secret) = &self.signing_secret {
            req = req.header("x-relay-signature", hmac_sha256_hex(secret, &payload)?);
        }

        let resp = req.body(payload).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("webhook returned error: status={}, body={}", status, body);
        }

        info!(
            url,
            event_type = %event.event_type,
            delivery_id = %delivery_id,
            status = %status,
            "webhook delivered"
        );
        Ok(())
    }

    /// Deliver to every URL in a background task. Returns immediately.
    pub fn dispatch(&self, event: WebhookEvent) {
        if self.urls.is_empty() {
            debug!("dispatch: no webhook targets, skipping");
            return;
        }

        let hook = self.clone();
        tokio::spawn(async move {
            for url in &hook.urls {
                if let Err(e) = hook.send(url, &event).await {
                    warn!(url, error = %e, "webhook delivery failed");
                }
            }
        });
    }
}

#[async_trait]
impl ApprovalHook for WebhookHook {
    async fn on_reply(&self, approval: Approval, reply: &str) -> Result<()> {
        self.dispatch(WebhookEvent::approval_received(approval, reply));
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────
