use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use approval_relay::channel::twilio::TwilioChannel;
use approval_relay::notification::{webhook::WebhookHook, ApprovalHook, LogHook};
use approval_relay::relay::ApprovalRelay;
use approval_relay::{api, cli, config, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env must be merged before the logging variables are read.
    config::load_dotenv();
    let log = config::log_settings();

    let registry = tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(&log.filter));
    if log.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let args = cli::Cli::parse();
    let cfg = config::load()?;
    let relay = build_relay(&cfg)?;

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => {
            let port = port.unwrap_or(cfg.port);
            run_server(cfg, relay, port).await
        }
        Some(cli::Commands::Request) => {
            let receipt = relay.request_approval().await?;
            println!("Message sent successfully. SID: {}", receipt.sid);
            Ok(())
        }
        None => {
            let port = cfg.port;
            run_server(cfg, relay, port).await
        }
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

/// Construct the channel client and hook once and inject them into the relay.
fn build_relay(cfg: &config::Config) -> anyhow::Result<ApprovalRelay> {
    let channel = Arc::new(TwilioChannel::from_config(cfg)?);

    let hook: Arc<dyn ApprovalHook> = if cfg.webhook_urls.is_empty() {
        Arc::new(LogHook)
    } else {
        tracing::info!(targets = cfg.webhook_urls.len(), "forwarding approvals to webhooks");
        Arc::new(WebhookHook::new(
            cfg.webhook_urls.clone(),
            cfg.webhook_secret.clone(),
        )?)
    };

    Ok(ApprovalRelay::new(channel, cfg.sender.clone(), cfg.recipient.clone()).with_hook(hook))
}

async fn run_server(cfg: config::Config, relay: ApprovalRelay, port: u16) -> anyhow::Result<()> {
    let state = Arc::new(AppState { relay });
    let app = api::router(state, &cfg.cors_origins);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        recipient = %cfg.recipient,
        origins = ?cfg.cors_origins,
        "approval relay listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("approval relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
