//! Playback engine capability interface
//!
//! The external engine is modeled as a narrow trait so the synchronization
//! core can run against the built-in clock engine, a real embedded player,
//! or a test fake. All calls are fire-and-forget from the caller's point of
//! view: an `Err` is a degradation signal to log or fall back on, never
//! something to propagate to the board's users.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{broadcast, watch};

use callboard_common::events::EngineState;

use super::source::EngineConfig;

/// Engine operation failure.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    /// The engine resource could not be constructed or has gone away
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    /// Playback start was rejected (permission or policy denial)
    #[error("playback rejected: {0}")]
    PlaybackRejected(String),

    /// Any other engine call failure
    #[error("engine call failed: {0}")]
    Call(String),
}

/// Narrow capability interface over the external playback engine.
///
/// Telemetry reads (`position_secs`, `state`) are synchronous snapshots of
/// whatever the engine last reported; they may lag reality, which the
/// polling loop tolerates by design.
pub trait MediaEngine: Send + Sync {
    /// Load the effective media configuration. Readiness is signaled later
    /// through the `ready` watch, not by this call returning.
    fn load(&self, config: &EngineConfig) -> Result<(), EngineError>;

    fn play(&self) -> Result<(), EngineError>;

    fn pause(&self) -> Result<(), EngineError>;

    fn seek_to(&self, position_secs: f64) -> Result<(), EngineError>;

    /// Last reported transport position in seconds.
    fn position_secs(&self) -> f64;

    /// Last reported transport state.
    fn state(&self) -> EngineState;

    /// Silence local audio output (follower surfaces mirror video only).
    fn mute(&self);

    /// Readiness signal: flips to `true` once the engine can accept
    /// seek/play reliably. Never flips back.
    fn ready(&self) -> watch::Receiver<bool>;

    /// Transport state transitions as the engine reports them.
    fn state_changes(&self) -> broadcast::Receiver<EngineState>;
}

/// Constructs engine instances for surfaces.
pub trait EngineFactory: Send + Sync {
    /// Engine for a surface. `label` identifies the owner in logs.
    fn create(&self, label: &str) -> Result<Arc<dyn MediaEngine>, EngineError>;

    /// Independent engine at default volume for the one-shot play-rejection
    /// fallback path.
    fn fallback(&self, label: &str) -> Result<Arc<dyn MediaEngine>, EngineError> {
        self.create(label)
    }
}
