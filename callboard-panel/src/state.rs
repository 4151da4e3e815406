//! Shared playback status store
//!
//! Thread-safe holder of the current `PlaybackStatus`, replaced wholesale
//! on every write and fanned out to subscribers with latest-value
//! semantics. Writes come in two flavors: `update` is gated by the
//! authority arbiter (a superseded producer's write leaves the store
//! untouched), `force_update` bypasses the gate for final-flush and
//! external correction paths.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use callboard_common::events::{BoardEvent, EngineState, EventBus};

use crate::authority::AuthorityArbiter;

/// Snapshot of the board's playback state.
///
/// `revision` strictly increases on every successful write, gated or
/// forced. `playing` is expected to track `engine_state == Playing` but the
/// pair is not cross-validated on merge: a partial write may leave them
/// inconsistent, and readers that care should trust `engine_state`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PlaybackStatus {
    /// Transport position in seconds, never negative
    pub position_secs: f64,
    pub engine_state: EngineState,
    pub playing: bool,
    /// Monotonic write counter
    pub revision: u64,
    pub updated_at: DateTime<Utc>,
}

impl PlaybackStatus {
    /// Status before any surface has reported: unstarted at position zero.
    pub fn initial() -> Self {
        Self {
            position_secs: 0.0,
            engine_state: EngineState::Unstarted,
            playing: false,
            revision: 0,
            updated_at: Utc::now(),
        }
    }
}

/// Field-wise partial update merged over the current status.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusPatch {
    pub position_secs: Option<f64>,
    pub engine_state: Option<EngineState>,
    pub playing: Option<bool>,
}

impl StatusPatch {
    /// Full telemetry sample: position plus state, with `playing` derived.
    pub fn telemetry(position_secs: f64, engine_state: EngineState) -> Self {
        Self {
            position_secs: Some(position_secs),
            engine_state: Some(engine_state),
            playing: Some(engine_state.is_playing()),
        }
    }

    /// Restart-from-zero patch used by loop continuity and cold starts.
    pub fn playing_from_start() -> Self {
        Self {
            position_secs: Some(0.0),
            engine_state: Some(EngineState::Playing),
            playing: Some(true),
        }
    }

    /// Play/pause flag only.
    pub fn playing(playing: bool) -> Self {
        Self {
            playing: Some(playing),
            ..Self::default()
        }
    }
}

/// Outcome of a gated write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Patch merged and published; `revision` is the new store revision
    Applied { revision: u64 },
    /// Caller's grant is stale; the store was not touched
    Superseded { current_epoch: u64 },
}

/// Process-wide playback status holder.
///
/// Constructed once and passed by `Arc` to every surface and handler.
pub struct PlaybackStore {
    current: watch::Sender<PlaybackStatus>,
    arbiter: Arc<AuthorityArbiter>,
    events: EventBus,
}

impl PlaybackStore {
    pub fn new(arbiter: Arc<AuthorityArbiter>, events: EventBus) -> Self {
        let (current, _) = watch::channel(PlaybackStatus::initial());
        Self {
            current,
            arbiter,
            events,
        }
    }

    /// Current status snapshot; no side effects.
    pub fn snapshot(&self) -> PlaybackStatus {
        *self.current.borrow()
    }

    /// Observe status replacements.
    ///
    /// The receiver sees the current value immediately and the latest value
    /// after each replacement; intermediate values may be skipped by a slow
    /// reader, there is no buffering beyond "latest".
    pub fn subscribe(&self) -> watch::Receiver<PlaybackStatus> {
        self.current.subscribe()
    }

    /// Gated write: merge `patch` and publish only while the arbiter still
    /// honors `producer`/`epoch` (or the authority slot is vacant).
    ///
    /// A rejected write is not an error: the caller has been superseded and
    /// simply stops contributing. The rejection is logged and broadcast so
    /// stale producers can observe their own displacement.
    pub fn update(&self, patch: StatusPatch, producer: &str, epoch: u64) -> WriteOutcome {
        if !self.arbiter.permits(producer, epoch) {
            let (_, current_epoch) = self.arbiter.current();
            debug!(
                producer,
                grant_epoch = epoch,
                current_epoch,
                "status write superseded"
            );
            self.events.emit_lossy(BoardEvent::WriteRejected {
                producer: producer.to_string(),
                grant_epoch: epoch,
                current_epoch,
                timestamp: Utc::now(),
            });
            return WriteOutcome::Superseded { current_epoch };
        }
        WriteOutcome::Applied {
            revision: self.publish(patch),
        }
    }

    /// Unconditional write, ignoring authority. Used for the final flush of
    /// a destroyed surface and for external bootstrap corrections.
    pub fn force_update(&self, patch: StatusPatch) -> PlaybackStatus {
        self.publish(patch);
        self.snapshot()
    }

    fn publish(&self, patch: StatusPatch) -> u64 {
        let mut published = PlaybackStatus::initial();
        self.current.send_modify(|status| {
            if let Some(position) = patch.position_secs {
                status.position_secs = position.max(0.0);
            }
            if let Some(state) = patch.engine_state {
                status.engine_state = state;
            }
            if let Some(playing) = patch.playing {
                status.playing = playing;
            }
            status.revision += 1;
            status.updated_at = Utc::now();
            published = *status;
        });
        self.events.emit_lossy(BoardEvent::PlaybackChanged {
            position_secs: published.position_secs,
            engine_state: published.engine_state,
            playing: published.playing,
            revision: published.revision,
            timestamp: published.updated_at,
        });
        published.revision
    }
}
