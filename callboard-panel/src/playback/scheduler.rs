//! Telemetry polling for the authoritative surface
//!
//! Fixed-period loop reading engine telemetry and publishing it through
//! the gated store write path. Runs only on the main surface, started at
//! readiness and aborted with the rest of the surface's tasks on destroy;
//! no partial tick survives cancellation.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time;
use tracing::info;

use super::surface::PlayerSurface;

/// Start the telemetry loop for a surface.
pub(crate) fn start(surface: Arc<PlayerSurface>) -> JoinHandle<()> {
    tokio::spawn(telemetry_loop(surface))
}

async fn telemetry_loop(surface: Arc<PlayerSurface>) {
    let period = surface.timing().poll_interval();
    let mut interval = time::interval(period);

    info!(
        surface = %surface.id(),
        "telemetry loop started ({}ms interval)",
        period.as_millis()
    );

    loop {
        interval.tick().await;
        surface.telemetry_tick();
    }
}
