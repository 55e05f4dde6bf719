use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::MessageChannel;
use crate::config::Config;
use crate::errors::DeliveryError;
use crate::models::message::{DeliveryReceipt, OutboundMessage};

const API_VERSION: &str = "2010-04-01";

/// Client for the Twilio Messages API.
/// Built once at startup and shared behind an `Arc`.
pub struct TwilioChannel {
    client: reqwest::Client,
    messages_url: String,
    account_sid: String,
    auth_token: String,
    timeout: Duration,
}

impl TwilioChannel {
    pub fn new(
        api_base: &str,
        account_sid: &str,
        auth_token: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("approval-relay/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            messages_url: format!(
                "{}/{}/Accounts/{}/Messages.json",
                api_base.trim_end_matches('/'),
                API_VERSION,
                account_sid
            ),
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
            timeout,
        })
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        Self::new(&cfg.api_base, &cfg.account_sid, &cfg.auth_token, cfg.send_timeout)
    }

    fn map_transport_error(&self, e: reqwest::Error) -> DeliveryError {
        if e.is_timeout() {
            DeliveryError::Timeout(self.timeout.as_secs())
        } else {
            DeliveryError::Transport(e.to_string())
        }
    }
}

/// Subset of the message resource returned on success.
#[derive(Deserialize)]
struct MessageResource {
    sid: String,
    status: Option<String>,
}

/// Error body returned by the API on 4xx/5xx.
#[derive(Deserialize)]
struct ApiError {
    code: Option<i64>,
    message: String,
}

#[async_trait]
impl MessageChannel for TwilioChannel {
    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryReceipt, DeliveryError> {
        let form = [
            ("To", message.to.as_str()),
            ("From", message.from.as_str()),
            ("Body", message.body.as_str()),
        ];

        let resp = self
            .client
            .post(&self.messages_url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.map_transport_error(e))?;

        if !status.is_success() {
            let (code, message) = match serde_json::from_str::<ApiError>(&body) {
                Ok(err) => (err.code, err.message),
                Err(_) if body.is_empty() => (None, status.to_string()),
                Err(_) => (None, body),
            };
            tracing::warn!(
                status = status.as_u16(),
                code = ?code,
                error = %message,
                "provider rejected message"
            );
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                code,
                message,
            });
        }

        let resource: MessageResource = serde_json::from_str(&body)
            .map_err(|e| DeliveryError::MalformedResponse(e.to_string()))?;
        if resource.sid.is_empty() {
            return Err(DeliveryError::MalformedResponse("empty message sid".into()));
        }

        tracing::debug!(sid = %resource.sid, status = ?resource.status, "provider accepted message");
        Ok(DeliveryReceipt {
            sid: resource.sid,
            status: resource.status,
        })
    }
}
