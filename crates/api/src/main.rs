use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lpa_api::cli::Cli;
use lpa_api::config::ServerConfig;
use lpa_api::router::build_app_router;
use lpa_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lpa_api=debug,lpa_core=info,lpa_labelstudio=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let (args, deprecated) = cli.command.into_run_args();
    if deprecated {
        tracing::warn!("`lpa serve` is deprecated and will be removed; use `lpa run` instead");
    }

    // --- Configuration ---
    let config = ServerConfig::from_env()?.with_overrides(args.host, args.port, args.data_dir);
    tracing::info!(
        host = %config.host,
        port = config.port,
        data_dir = %config.data_dir.display(),
        "Loaded server configuration"
    );

    tokio::fs::create_dir_all(&config.data_dir)
        .await
        .with_context(|| format!("creating data directory {}", config.data_dir.display()))?;

    // --- App state ---
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    let addr = SocketAddr::new(
        config
            .host
            .parse()
            .with_context(|| format!("invalid HOST address '{}'", config.host))?,
        config.port,
    );
    let state = AppState::new(config);
    match &state.label_studio {
        Some(api) => tracing::info!(url = api.base_url(), "Label Studio integration enabled"),
        None => tracing::info!("LABEL_STUDIO_API_KEY not set, Label Studio integration disabled"),
    }
    let shutdown = state.shutdown.clone();
    let jobs = state.jobs.clone();

    // --- Router ---
    let app = build_app_router(state);

    // --- Start server ---
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;
    tracing::info!(%addr, "App is running, open port {} in a browser", addr.port());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("server error")?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, waiting for jobs");
    let remaining = jobs.drain(shutdown_timeout).await;
    if remaining > 0 {
        tracing::warn!(remaining, "Abandoning unfinished jobs");
    }

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal or the shutdown endpoint.
///
/// Handles SIGINT (Ctrl-C), SIGTERM on Unix, and cancellation of `token`
/// by `POST /api/v1/system/shutdown`.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
        () = token.cancelled() => {
            tracing::info!("Shutdown requested, starting graceful shutdown");
        }
    }
    token.cancel();
}
