//! The approval relay: outbound approval requests and inbound reply classification.

use std::sync::Arc;
use std::time::Duration;

use crate::channel::MessageChannel;
use crate::errors::{AppError, DeliveryError};
use crate::models::approval::Approval;
use crate::models::message::{ContactForm, DeliveryReceipt, InboundReply, OutboundMessage};
use crate::notification::{ApprovalHook, LogHook};

pub const APPROVAL_REQUEST_BODY: &str =
    "⚠️ New inference request received. Reply with 'yes' to approve.";

/// Upper bound on a hook call, so the webhook can still answer promptly.
pub const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(5);

pub struct ApprovalRelay {
    channel: Arc<dyn MessageChannel>,
    hook: Arc<dyn ApprovalHook>,
    hook_timeout: Duration,
    sender: String,
    recipient: String,
}

impl ApprovalRelay {
    /// `sender` and `recipient` must already be full channel addresses.
    pub fn new(channel: Arc<dyn MessageChannel>, sender: String, recipient: String) -> Self {
        Self {
            channel,
            hook: Arc::new(LogHook),
            hook_timeout: DEFAULT_HOOK_TIMEOUT,
            sender,
            recipient,
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn ApprovalHook>) -> Self {
        self.hook = hook;
        self
    }

    pub fn with_hook_timeout(mut self, timeout: Duration) -> Self {
        self.hook_timeout = timeout;
        self
    }

    /// Send one approval request to the configured approver.
    pub async fn request_approval(&self) -> Result<DeliveryReceipt, DeliveryError> {
        let receipt = self.deliver(APPROVAL_REQUEST_BODY.to_string()).await?;
        tracing::info!(sid = %receipt.sid, to = %self.recipient, "approval request sent");
        Ok(receipt)
    }

    /// Classify an inbound reply and hand the result to the hook.
    ///
    /// Never fails: hook errors are logged and dropped, and a hook that
    /// outlives `hook_timeout` is abandoned.
    pub async fn receive_reply(&self, raw: &str) -> Approval {
        let reply = InboundReply::new(raw);
        let approval = reply.classify();

        tracing::info!(reply = %reply.body(), %approval, "received reply");
        if approval.is_approved() {
            tracing::info!("approved");
        } else {
            tracing::info!("not approved or unrecognized message");
        }

        match tokio::time::timeout(self.hook_timeout, self.hook.on_reply(approval, reply.body())).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, %approval, "approval hook failed"),
            Err(_) => tracing::warn!(
                timeout_ms = self.hook_timeout.as_millis() as u64,
                %approval,
                "approval hook timed out"
            ),
        }
        approval
    }

    /// Validate a contact form and relay it to the approver as one message.
    pub async fn relay_contact(&self, form: ContactForm) -> Result<DeliveryReceipt, AppError> {
        let (name, email, message) = match (
            non_blank(form.name),
            non_blank(form.email),
            non_blank(form.message),
        ) {
            (Some(n), Some(e), Some(m)) => (n, e, m),
            _ => return Err(AppError::Validation("missing fields".into())),
        };

        let body = format!(
            "New contact form submission:\nName: {}\nEmail: {}\nMessage: {}",
            name, email, message
        );
        let receipt = self.deliver(body).await?;
        tracing::info!(sid = %receipt.sid, "contact message relayed");
        Ok(receipt)
    }

    async fn deliver(&self, body: String) -> Result<DeliveryReceipt, DeliveryError> {
        let message = OutboundMessage {
            to: self.recipient.clone(),
            from: self.sender.clone(),
            body,
        };
        self.channel.send(&message).await
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
