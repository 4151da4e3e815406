//! Event types for the callboard event system
//!
//! Provides the shared `EngineState` codes, the `BoardEvent` enum broadcast
//! to SSE clients and diagnostics, and the `EventBus` wrapper around
//! `tokio::sync::broadcast`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Transport state reported by a playback engine.
///
/// The numeric codes mirror the wire contract of the external engine and
/// are preserved for telemetry and API compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
}

impl EngineState {
    /// Numeric state code used by the engine contract.
    pub fn code(self) -> i8 {
        match self {
            EngineState::Unstarted => -1,
            EngineState::Ended => 0,
            EngineState::Playing => 1,
            EngineState::Paused => 2,
            EngineState::Buffering => 3,
            EngineState::Cued => 5,
        }
    }

    /// Decode a numeric state code. Unknown codes return `None`.
    pub fn from_code(code: i8) -> Option<Self> {
        match code {
            -1 => Some(EngineState::Unstarted),
            0 => Some(EngineState::Ended),
            1 => Some(EngineState::Playing),
            2 => Some(EngineState::Paused),
            3 => Some(EngineState::Buffering),
            5 => Some(EngineState::Cued),
            _ => None,
        }
    }

    /// True only for the `Playing` state.
    pub fn is_playing(self) -> bool {
        matches!(self, EngineState::Playing)
    }
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Unstarted => write!(f, "unstarted"),
            EngineState::Ended => write!(f, "ended"),
            EngineState::Playing => write!(f, "playing"),
            EngineState::Paused => write!(f, "paused"),
            EngineState::Buffering => write!(f, "buffering"),
            EngineState::Cued => write!(f, "cued"),
        }
    }
}

/// Callboard event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BoardEvent {
    /// Shared playback status was replaced
    PlaybackChanged {
        position_secs: f64,
        engine_state: EngineState,
        playing: bool,
        revision: u64,
        timestamp: DateTime<Utc>,
    },

    /// A gated write was rejected because its grant is superseded
    WriteRejected {
        producer: String,
        grant_epoch: u64,
        current_epoch: u64,
        timestamp: DateTime<Utc>,
    },

    /// Write authority moved to a new producer
    AuthorityChanged {
        producer: String,
        epoch: u64,
        /// Previous holder, if one was displaced
        superseded: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// The current holder released write authority
    AuthorityReleased {
        producer: String,
        epoch: u64,
        timestamp: DateTime<Utc>,
    },

    /// A player surface finished bootstrapping
    SurfaceReady {
        surface: String,
        role: String,
        /// Position the surface resumed from (0 for a cold start)
        resumed_from_secs: f64,
        timestamp: DateTime<Utc>,
    },

    /// A player surface was torn down
    SurfaceDestroyed {
        surface: String,
        /// Final engine position flushed to the store, when one existed
        final_position_secs: Option<f64>,
        timestamp: DateTime<Utc>,
    },

    /// Loop continuity kicked in: content restarted from zero
    LoopRestarted {
        surface: String,
        timestamp: DateTime<Utc>,
    },

    /// An engine operation failed and was degraded, not propagated
    EngineFault {
        surface: String,
        operation: String,
        detail: String,
        timestamp: DateTime<Utc>,
    },

    /// Call feed flipped between idle and announcing
    CallPhaseChanged {
        phase: String,
        ticket: Option<String>,
        station: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

impl BoardEvent {
    /// Event type string used as the SSE event name.
    pub fn kind(&self) -> &'static str {
        match self {
            BoardEvent::PlaybackChanged { .. } => "PlaybackChanged",
            BoardEvent::WriteRejected { .. } => "WriteRejected",
            BoardEvent::AuthorityChanged { .. } => "AuthorityChanged",
            BoardEvent::AuthorityReleased { .. } => "AuthorityReleased",
            BoardEvent::SurfaceReady { .. } => "SurfaceReady",
            BoardEvent::SurfaceDestroyed { .. } => "SurfaceDestroyed",
            BoardEvent::LoopRestarted { .. } => "LoopRestarted",
            BoardEvent::EngineFault { .. } => "EngineFault",
            BoardEvent::CallPhaseChanged { .. } => "CallPhaseChanged",
        }
    }
}

/// One-to-many event broadcaster shared across the panel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BoardEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity.
    ///
    /// Old events are dropped once the buffer is full; slow subscribers
    /// observe a lag error rather than blocking emitters.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Channel capacity the bus was created with.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Subscribe to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Emit an event to all subscribers.
    ///
    /// Returns `Ok(subscriber_count)` when at least one subscriber exists,
    /// `Err` when nobody is listening.
    pub fn emit(
        &self,
        event: BoardEvent,
    ) -> Result<usize, broadcast::error::SendError<BoardEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the no-subscribers case.
    pub fn emit_lossy(&self, event: BoardEvent) {
        let _ = self.tx.send(event);
    }
}
