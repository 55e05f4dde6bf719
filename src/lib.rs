//! Approval relay — sends approval requests over WhatsApp and classifies replies.
//!
//! The library crate holds everything the binary wires together, so integration
//! tests in `tests/` can drive the router with a fake channel.

pub mod api;
pub mod channel;
pub mod cli;
pub mod config;
pub mod errors;
pub mod models;
pub mod notification;
pub mod relay;

/// Shared application state passed to handlers.
pub struct AppState {
    pub relay: relay::ApprovalRelay,
}
