pub mod twilio;

use async_trait::async_trait;

use crate::errors::DeliveryError;
use crate::models::message::{DeliveryReceipt, OutboundMessage};

/// Abstraction over the external messaging channel.
/// Implementations: TwilioChannel (Twilio Messages REST API).
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Submit one message for delivery. Never retries.
    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryReceipt, DeliveryError>;
}
