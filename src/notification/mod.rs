//! Hooks invoked after an inbound reply has been classified.
//!
//! The relay itself takes no action on approval. Anything that should happen
//! next (starting a VM, unblocking a job) belongs in an [`ApprovalHook`].

pub mod webhook;

use async_trait::async_trait;

use crate::models::approval::Approval;

#[async_trait]
pub trait ApprovalHook: Send + Sync {
    /// Called once per inbound reply. Errors are logged by the caller and
    /// never reach the channel.
    async fn on_reply(&self, approval: Approval, reply: &str) -> anyhow::Result<()>;
}

/// Default hook: records the decision and nothing else.
#[derive(Clone, Default)]
pub struct LogHook;

#[async_trait]
impl ApprovalHook for LogHook {
    async fn on_reply(&self, approval: Approval, _reply: &str) -> anyhow::Result<()> {
        if approval.is_approved() {
            tracing::info!("approval received, no actuation configured");
        }
        Ok(())
    }
}
