//! Panel supervision
//!
//! Owns the visible media surfaces and ties their lifetime to the call
//! feed: an active announcement hides the board (surfaces are destroyed,
//! their final telemetry flushed to the store), returning to idle rebuilds
//! them and playback resumes from the stored position.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use callboard_common::events::EventBus;

use crate::authority::AuthorityArbiter;
use crate::calls::CallPhase;
use crate::config::TimingConfig;
use crate::media::{EngineFactory, MediaSource};
use crate::playback::{PlayerSurface, SurfaceRole};
use crate::state::PlaybackStore;

/// Supervisor for the board's media surfaces.
pub struct Panel {
    store: Arc<PlaybackStore>,
    arbiter: Arc<AuthorityArbiter>,
    factory: Arc<dyn EngineFactory>,
    events: EventBus,
    timing: TimingConfig,
    source: MediaSource,
    followers: usize,
    /// Main surface first, then followers
    surfaces: tokio::sync::Mutex<Vec<Arc<PlayerSurface>>>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl Panel {
    pub fn new(
        store: Arc<PlaybackStore>,
        arbiter: Arc<AuthorityArbiter>,
        factory: Arc<dyn EngineFactory>,
        events: EventBus,
        timing: TimingConfig,
        source: MediaSource,
        followers: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            arbiter,
            factory,
            events,
            timing,
            source,
            followers,
            surfaces: tokio::sync::Mutex::new(Vec::new()),
            supervisor: Mutex::new(None),
        })
    }

    /// Media source the surfaces play.
    pub fn source(&self) -> &MediaSource {
        &self.source
    }

    /// Build the main surface and its followers. No-op while visible.
    pub async fn show(&self) {
        let mut surfaces = self.surfaces.lock().await;
        if !surfaces.is_empty() {
            return;
        }
        info!(followers = self.followers, "showing media surfaces");

        surfaces.push(PlayerSurface::new(
            SurfaceRole::Main,
            &self.source,
            Arc::clone(&self.store),
            Arc::clone(&self.arbiter),
            Arc::clone(&self.factory),
            self.events.clone(),
            self.timing,
        ));
        for _ in 0..self.followers {
            surfaces.push(PlayerSurface::new(
                SurfaceRole::Follower,
                &self.source,
                Arc::clone(&self.store),
                Arc::clone(&self.arbiter),
                Arc::clone(&self.factory),
                self.events.clone(),
                self.timing,
            ));
        }
    }

    /// Destroy all surfaces. Followers go first so the main surface's
    /// final flush is the position that survives in the store.
    pub async fn hide(&self) {
        let mut surfaces = self.surfaces.lock().await;
        if surfaces.is_empty() {
            return;
        }
        info!("hiding media surfaces");
        for surface in surfaces.drain(..).rev() {
            surface.destroy();
        }
    }

    /// Current main surface, when the board is visible.
    pub async fn main_surface(&self) -> Option<Arc<PlayerSurface>> {
        self.surfaces.lock().await.first().cloned()
    }

    /// Whether any surfaces are currently up.
    pub async fn is_visible(&self) -> bool {
        !self.surfaces.lock().await.is_empty()
    }

    /// Stop supervising and tear the board down.
    pub async fn shutdown(&self) {
        if let Some(task) = self.supervisor.lock().unwrap().take() {
            task.abort();
        }
        self.hide().await;
    }
}

/// Start the visibility supervisor: applies the current call phase, then
/// follows every phase change.
pub fn start_supervisor(panel: Arc<Panel>, calls: watch::Receiver<CallPhase>) {
    let task = tokio::spawn(supervise(Arc::clone(&panel), calls));
    *panel.supervisor.lock().unwrap() = Some(task);
}

async fn supervise(panel: Arc<Panel>, mut calls: watch::Receiver<CallPhase>) {
    let initial = calls.borrow_and_update().clone();
    apply_phase(&panel, &initial).await;

    loop {
        if calls.changed().await.is_err() {
            return;
        }
        let phase = calls.borrow_and_update().clone();
        apply_phase(&panel, &phase).await;
    }
}

async fn apply_phase(panel: &Panel, phase: &CallPhase) {
    match phase {
        CallPhase::Idle => panel.show().await,
        CallPhase::Announcing(call) => {
            info!(ticket = %call.ticket, station = %call.station, "call active; board yields to announcement");
            panel.hide().await;
        }
    }
}
