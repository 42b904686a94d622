//! Wager relay server.
//!
//! Run with: cargo run -p wager-relay-server
//!
//! Then register a bot with:
//! `curl -X POST localhost:3000/start_bot -H 'content-type: application/json' -d '{"bot_token":"..."}'`

mod config;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wager_relay_client::HttpActionClient;
use wager_relay_session::{RunnerContext, SessionController, SessionRegistry, storage::FileResultLog};
use wager_relay_transport::{TelegramConnector, control_router};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::load().context("loading configuration")?;

    let profile = config.action_profile()?;
    let client = HttpActionClient::new(&profile).context("building action client")?;
    let log = FileResultLog::open(&config.logs.raw_path, &config.logs.summary_path)
        .await
        .context("opening result logs")?;

    let ctx = RunnerContext {
        profile: Arc::new(profile),
        client: Arc::new(client),
        log: Arc::new(log),
        registry: Arc::new(SessionRegistry::new()),
        settings: config.runner_settings(),
    };
    let controller = SessionController::new(ctx, Arc::new(TelegramConnector::new()));
    let app = control_router(Arc::clone(&controller));

    let listener = tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| format!("binding {}:{}", config.server.host, config.server.port))?;
    tracing::info!("Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down sessions");
    controller.shutdown_all().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
