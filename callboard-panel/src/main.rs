//! Callboard Panel - Main entry point
//!
//! Wires the playback status store, authority arbiter, engine factory and
//! panel supervisor together, then serves the HTTP/SSE control surface.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use callboard_common::events::EventBus;
use callboard_panel::api::{self, AppContext};
use callboard_panel::authority::AuthorityArbiter;
use callboard_panel::calls::CallFeed;
use callboard_panel::config::Config;
use callboard_panel::media::{ClockEngineFactory, EngineFactory};
use callboard_panel::panel::{self, Panel};
use callboard_panel::state::PlaybackStore;

/// Command-line arguments for callboard-panel
#[derive(Parser, Debug)]
#[command(name = "callboard-panel")]
#[command(about = "Call-queue display panel service")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "CALLBOARD_PORT")]
    port: Option<u16>,

    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "callboard_panel=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command-line arguments
    let args = Args::parse();

    let mut config =
        Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    info!("Starting Callboard panel on port {}", config.server.port);

    // Shared state: store and arbiter are built once and passed by Arc.
    let events = EventBus::new(256);
    let arbiter = Arc::new(AuthorityArbiter::new(events.clone()));
    let store = Arc::new(PlaybackStore::new(Arc::clone(&arbiter), events.clone()));
    let factory: Arc<dyn EngineFactory> =
        Arc::new(ClockEngineFactory::new(config.engine.clock_tuning()));
    let calls = Arc::new(CallFeed::new(events.clone()));

    let panel = Panel::new(
        Arc::clone(&store),
        Arc::clone(&arbiter),
        factory,
        events.clone(),
        config.timing,
        config.media.clone(),
        config.panel.followers,
    );
    panel::start_supervisor(Arc::clone(&panel), calls.subscribe());
    info!("Panel supervisor started");

    // Build the application router
    let ctx = AppContext {
        store,
        arbiter,
        panel: Arc::clone(&panel),
        calls,
        events,
    };
    let app = api::create_router(ctx);

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port)
        .parse()
        .context("Invalid bind address")?;

    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Tear the board down so the last telemetry is flushed.
    panel.shutdown().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
