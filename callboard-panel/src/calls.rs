//! Call feed boundary
//!
//! The call-queue generator lives outside this service; what the panel
//! consumes is a single latest-value stream of its phase, used to toggle
//! surface visibility. Announcements arrive over the HTTP boundary and are
//! re-broadcast on the event bus for display clients.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;

use callboard_common::events::{BoardEvent, EventBus};

/// One call being announced on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallAnnouncement {
    pub ticket: String,
    pub station: String,
}

/// Queue collaborator phase: idle board or an active announcement.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CallPhase {
    #[default]
    Idle,
    Announcing(CallAnnouncement),
}

impl CallPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallPhase::Idle => "idle",
            CallPhase::Announcing(_) => "announcing",
        }
    }
}

/// Latest-value feed of the call phase.
pub struct CallFeed {
    tx: watch::Sender<CallPhase>,
    events: EventBus,
}

impl CallFeed {
    pub fn new(events: EventBus) -> Self {
        let (tx, _) = watch::channel(CallPhase::Idle);
        Self { tx, events }
    }

    pub fn subscribe(&self) -> watch::Receiver<CallPhase> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> CallPhase {
        self.tx.borrow().clone()
    }

    /// Flip the board into announcing; surfaces are hidden while active.
    pub fn announce(&self, call: CallAnnouncement) {
        info!(ticket = %call.ticket, station = %call.station, "call announced");
        self.events.emit_lossy(BoardEvent::CallPhaseChanged {
            phase: "announcing".to_string(),
            ticket: Some(call.ticket.clone()),
            station: Some(call.station.clone()),
            timestamp: chrono::Utc::now(),
        });
        self.tx.send_replace(CallPhase::Announcing(call));
    }

    /// Return the board to idle; surfaces are rebuilt.
    pub fn clear(&self) {
        info!("call cleared");
        self.events.emit_lossy(BoardEvent::CallPhaseChanged {
            phase: "idle".to_string(),
            ticket: None,
            station: None,
            timestamp: chrono::Utc::now(),
        });
        self.tx.send_replace(CallPhase::Idle);
    }
}
