use serde::{Deserialize, Serialize};

use super::approval::Approval;

/// A single message submitted to the channel. Not retained after sending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub to: String,
    pub from: String,
    pub body: String,
}

/// Acknowledgment returned by the channel when it accepts a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    /// Opaque provider message identifier.
    pub sid: String,
    /// Provider-reported delivery status, e.g. "queued".
    pub status: Option<String>,
}

/// Reply text delivered by the channel's webhook, normalized on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundReply {
    body: String,
}

impl InboundReply {
    /// Trims surrounding whitespace and folds to lowercase.
    pub fn new(raw: &str) -> Self {
        Self {
            body: raw.trim().to_lowercase(),
        }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn classify(&self) -> Approval {
        Approval::from_normalized(&self.body)
    }
}

/// Contact form payload. Fields are optional on the wire and validated by the relay.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
}
