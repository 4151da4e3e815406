//! Write-authority arbitration
//!
//! Exactly one producer may feed the shared playback status at a time.
//! The slot carries a monotonic epoch: every transfer increments it, and a
//! grant is honored only while its epoch is current. Transfers are either
//! compare-and-swap (`claim`, fails on a stale observation) or explicit
//! takeover (`assume`, the surface-construction path); in both cases a
//! displaced holder is named in the log and on the event bus rather than
//! losing its writes silently.

use std::sync::Mutex;

use thiserror::Error;
use tracing::{debug, info};

use callboard_common::events::{BoardEvent, EventBus};

/// Proof of a successful authority transfer.
///
/// Valid only while `epoch` matches the arbiter slot; a later transfer
/// invalidates it and gated writes made with it report `Superseded`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityGrant {
    pub producer: String,
    pub epoch: u64,
}

/// Rejected compare-and-swap claim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClaimError {
    #[error("stale authority epoch: observed {observed}, current {current}")]
    Stale { observed: u64, current: u64 },
}

#[derive(Debug)]
struct Slot {
    holder: Option<String>,
    epoch: u64,
}

/// Tracks which producer currently owns the shared-status write path.
pub struct AuthorityArbiter {
    slot: Mutex<Slot>,
    events: EventBus,
}

impl AuthorityArbiter {
    /// Create a vacant arbiter at epoch 0.
    pub fn new(events: EventBus) -> Self {
        Self {
            slot: Mutex::new(Slot {
                holder: None,
                epoch: 0,
            }),
            events,
        }
    }

    /// Current holder and epoch.
    pub fn current(&self) -> (Option<String>, u64) {
        let slot = self.slot.lock().unwrap();
        (slot.holder.clone(), slot.epoch)
    }

    /// Compare-and-swap claim: succeeds only if `observed_epoch` is still
    /// the slot epoch.
    pub fn claim(&self, producer: &str, observed_epoch: u64) -> Result<AuthorityGrant, ClaimError> {
        let mut slot = self.slot.lock().unwrap();
        if observed_epoch != slot.epoch {
            debug!(
                producer,
                observed_epoch,
                current = slot.epoch,
                "authority claim rejected"
            );
            return Err(ClaimError::Stale {
                observed: observed_epoch,
                current: slot.epoch,
            });
        }
        Ok(self.transfer(&mut slot, producer))
    }

    /// Unconditional takeover used when a new main surface is constructed.
    ///
    /// The read-and-increment happens under the slot lock, so the displaced
    /// holder is always identified and announced.
    pub fn assume(&self, producer: &str) -> AuthorityGrant {
        let mut slot = self.slot.lock().unwrap();
        self.transfer(&mut slot, producer)
    }

    fn transfer(&self, slot: &mut Slot, producer: &str) -> AuthorityGrant {
        slot.epoch += 1;
        let superseded = slot.holder.replace(producer.to_string());
        info!(
            producer,
            epoch = slot.epoch,
            superseded = superseded.as_deref(),
            "write authority transferred"
        );
        self.events.emit_lossy(BoardEvent::AuthorityChanged {
            producer: producer.to_string(),
            epoch: slot.epoch,
            superseded,
            timestamp: chrono::Utc::now(),
        });
        AuthorityGrant {
            producer: producer.to_string(),
            epoch: slot.epoch,
        }
    }

    /// Whether a write under `producer`/`epoch` is honored right now.
    ///
    /// A vacant slot honors any writer; otherwise the producer must match
    /// the holder and the epoch must be current.
    pub fn permits(&self, producer: &str, epoch: u64) -> bool {
        let slot = self.slot.lock().unwrap();
        match &slot.holder {
            None => true,
            Some(holder) => holder == producer && epoch == slot.epoch,
        }
    }

    /// Vacate the slot if the grant is still current. Returns whether the
    /// slot was actually released.
    pub fn release(&self, grant: &AuthorityGrant) -> bool {
        let mut slot = self.slot.lock().unwrap();
        if slot.epoch != grant.epoch {
            return false;
        }
        slot.holder = None;
        info!(producer = %grant.producer, epoch = slot.epoch, "write authority released");
        self.events.emit_lossy(BoardEvent::AuthorityReleased {
            producer: grant.producer.clone(),
            epoch: slot.epoch,
            timestamp: chrono::Utc::now(),
        });
        true
    }
}
