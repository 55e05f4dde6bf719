use clap::{Parser, Subcommand};

/// Approval relay — WhatsApp approval requests and reply webhook
#[derive(Parser)]
#[command(name = "approval-relay", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve {
        /// Port to bind; overrides PORT
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Send one approval request and print the message SID
    Request,
}
