//! Player surfaces
//!
//! One `PlayerSurface` per visible media slot. The main surface owns write
//! authority and feeds the shared status store from engine telemetry;
//! follower surfaces mirror the store into their own engine handle. Every
//! surface runs the same bootstrap on engine readiness (resume-seek or
//! cold start, behind bounded settle delays) and the same loop-continuity
//! recovery when its engine reports ended.
//!
//! All delayed work runs in tasks owned by the surface; destroying the
//! surface aborts them, so no settle callback ever fires into a torn-down
//! surface.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::time;
use tracing::{debug, info, warn};
use uuid::Uuid;

use callboard_common::events::{BoardEvent, EngineState, EventBus};

use crate::authority::{AuthorityArbiter, AuthorityGrant};
use crate::config::TimingConfig;
use crate::media::{self, EngineConfig, EngineFactory, MediaEngine, MediaSource};
use crate::state::{PlaybackStatus, PlaybackStore, StatusPatch};

use super::scheduler;

/// Whether a surface produces the shared status or only mirrors it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceRole {
    Main,
    Follower,
}

impl SurfaceRole {
    pub fn as_str(self) -> &'static str {
        match self {
            SurfaceRole::Main => "main",
            SurfaceRole::Follower => "follower",
        }
    }
}

/// Surface lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfacePhase {
    Constructed,
    Configured,
    Ready,
    EndedRecovery,
    Destroyed,
}

struct FallbackSlot {
    attempted: bool,
    /// Kept alive so a deferred fallback start can still land
    engine: Option<Arc<dyn MediaEngine>>,
}

/// One visible media slot of the board.
pub struct PlayerSurface {
    id: String,
    role: SurfaceRole,
    store: Arc<PlaybackStore>,
    arbiter: Arc<AuthorityArbiter>,
    factory: Arc<dyn EngineFactory>,
    events: EventBus,
    timing: TimingConfig,
    config: EngineConfig,
    engine: Option<Arc<dyn MediaEngine>>,
    fallback: Mutex<FallbackSlot>,
    grant: Mutex<Option<AuthorityGrant>>,
    phase: Mutex<SurfacePhase>,
    tasks: Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

impl PlayerSurface {
    /// Construct a surface and start watching its engine.
    ///
    /// Must run inside a tokio runtime. A main surface takes write
    /// authority immediately, displacing any prior holder.
    pub fn new(
        role: SurfaceRole,
        source: &MediaSource,
        store: Arc<PlaybackStore>,
        arbiter: Arc<AuthorityArbiter>,
        factory: Arc<dyn EngineFactory>,
        events: EventBus,
        timing: TimingConfig,
    ) -> Arc<Self> {
        let id = format!("{}-{}", role.as_str(), Uuid::new_v4());
        let config = media::resolve(source);

        let engine = match factory.create(&id) {
            Ok(engine) => Some(engine),
            Err(err) => {
                warn!(
                    surface = %id,
                    error = %err,
                    "engine construction failed; surface continues without an engine"
                );
                events.emit_lossy(BoardEvent::EngineFault {
                    surface: id.clone(),
                    operation: "create".to_string(),
                    detail: err.to_string(),
                    timestamp: chrono::Utc::now(),
                });
                None
            }
        };

        let seed = store.snapshot();
        debug!(
            surface = %id,
            position_secs = seed.position_secs,
            state = %seed.engine_state,
            "seeding surface from store snapshot"
        );

        let surface = Arc::new(Self {
            id,
            role,
            store,
            arbiter,
            factory,
            events,
            timing,
            config,
            engine,
            fallback: Mutex::new(FallbackSlot {
                attempted: false,
                engine: None,
            }),
            grant: Mutex::new(None),
            phase: Mutex::new(SurfacePhase::Constructed),
            tasks: Mutex::new(Vec::new()),
        });

        if surface.role == SurfaceRole::Main {
            let grant = surface.arbiter.assume(&surface.id);
            *surface.grant.lock().unwrap() = Some(grant);
        }

        if let Some(engine) = &surface.engine {
            if let Err(err) = engine.load(&surface.config) {
                warn!(surface = %surface.id, error = %err, "engine load failed");
                surface.fault("load", &err);
            }
        }
        surface.set_phase(SurfacePhase::Configured);

        if let Some(engine) = surface.engine.clone() {
            let ready = engine.ready();
            surface.track(tokio::spawn(watch_ready(Arc::clone(&surface), ready)));

            let changes = engine.state_changes();
            surface.track(tokio::spawn(watch_state_changes(
                Arc::clone(&surface),
                changes,
            )));
        }

        surface
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn role(&self) -> SurfaceRole {
        self.role
    }

    pub fn is_main(&self) -> bool {
        self.role == SurfaceRole::Main
    }

    pub fn phase(&self) -> SurfacePhase {
        *self.phase.lock().unwrap()
    }

    pub(crate) fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// Resolved engine configuration this surface plays.
    pub fn engine_config(&self) -> &EngineConfig {
        &self.config
    }

    /// Explicit drift correction: seek, then play (main surface only) or
    /// pause, depending on the desired state.
    pub fn sync_to(&self, position_secs: f64, desired: EngineState) {
        let Some(engine) = &self.engine else {
            return;
        };
        info!(
            surface = %self.id,
            position_secs,
            desired = %desired,
            "explicit sync requested"
        );
        if let Err(err) = engine.seek_to(position_secs) {
            self.fault("seek", &err);
        }
        match desired {
            EngineState::Playing if self.is_main() => self.force_play(),
            EngineState::Paused => {
                if let Err(err) = engine.pause() {
                    self.fault("pause", &err);
                }
            }
            _ => {}
        }
    }

    /// Tear the surface down: cancel all owned tasks, flush the engine's
    /// last telemetry past the authority gate, release the grant.
    pub fn destroy(&self) {
        {
            let mut phase = self.phase.lock().unwrap();
            if *phase == SurfacePhase::Destroyed {
                return;
            }
            *phase = SurfacePhase::Destroyed;
        }

        for task in self.tasks.lock().unwrap().drain(..) {
            task.abort();
        }

        // Forced flush: a destroyed main still holds the token, but its
        // final position must survive the teardown regardless.
        let final_position = self.engine.as_ref().map(|engine| {
            let position = engine.position_secs();
            let state = engine.state();
            self.store.force_update(StatusPatch::telemetry(position, state));
            position
        });

        if let Some(grant) = self.grant.lock().unwrap().take() {
            self.arbiter.release(&grant);
        }

        info!(surface = %self.id, ?final_position, "surface destroyed");
        self.events.emit_lossy(BoardEvent::SurfaceDestroyed {
            surface: self.id.clone(),
            final_position_secs: final_position,
            timestamp: chrono::Utc::now(),
        });
    }

    /// One telemetry poll: read the engine, fight any state that is not
    /// "progressing or about to loop", publish through the gate.
    pub(crate) fn telemetry_tick(&self) {
        if self.phase() == SurfacePhase::Destroyed {
            return;
        }
        let Some(engine) = &self.engine else {
            return;
        };

        let position = engine.position_secs();
        let state = engine.state();

        if state != EngineState::Playing && state != EngineState::Ended {
            // The board must never visibly stall: paused, buffering and
            // cued all get pushed back toward playing.
            self.force_play();
        }

        let (producer, epoch) = self.write_credentials();
        self.store
            .update(StatusPatch::telemetry(position, state), &producer, epoch);
    }

    /// Start playback, falling back once to a fresh independent engine at
    /// default volume if the primary engine rejects the play call.
    fn force_play(&self) {
        let Some(engine) = &self.engine else {
            return;
        };
        let Err(err) = engine.play() else {
            return;
        };
        warn!(surface = %self.id, error = %err, "play rejected");
        self.fault("play", &err);

        let mut fallback = self.fallback.lock().unwrap();
        if fallback.attempted {
            return;
        }
        fallback.attempted = true;

        match self.factory.fallback(&format!("{}-fallback", self.id)) {
            Ok(spare) => {
                if let Err(err) = spare.load(&self.config).and_then(|_| spare.play()) {
                    warn!(surface = %self.id, error = %err, "fallback play failed");
                    self.fault("fallback-play", &err);
                }
                fallback.engine = Some(spare);
            }
            Err(err) => {
                warn!(surface = %self.id, error = %err, "fallback engine construction failed");
                self.fault("fallback-create", &err);
            }
        }
    }

    fn engine_seek(&self, position_secs: f64) {
        let Some(engine) = &self.engine else {
            return;
        };
        if let Err(err) = engine.seek_to(position_secs) {
            warn!(surface = %self.id, position_secs, error = %err, "seek failed");
            self.fault("seek", &err);
        }
    }

    /// Follower correction applied on every observed status replacement.
    fn apply_mirror(&self, status: &PlaybackStatus) {
        if self.phase() == SurfacePhase::Destroyed {
            return;
        }
        let Some(engine) = &self.engine else {
            return;
        };

        let drift = (engine.position_secs() - status.position_secs).abs();
        if drift > self.timing.drift_threshold_secs {
            debug!(surface = %self.id, drift, "correcting follower drift");
            self.engine_seek(status.position_secs);
        }

        let engine_state = engine.state();
        if status.playing && engine_state != EngineState::Playing {
            // An ended engine is owned by the loop-recovery path.
            if engine_state != EngineState::Ended {
                if let Err(err) = engine.play() {
                    debug!(surface = %self.id, error = %err, "mirror play failed");
                }
            }
        } else if !status.playing && engine_state == EngineState::Playing {
            if let Err(err) = engine.pause() {
                debug!(surface = %self.id, error = %err, "mirror pause failed");
            }
        }
    }

    fn write_credentials(&self) -> (String, u64) {
        match &*self.grant.lock().unwrap() {
            Some(grant) => (grant.producer.clone(), grant.epoch),
            // Followers write under their own id; the gate drops these
            // while a main surface holds authority.
            None => (self.id.clone(), 0),
        }
    }

    fn set_phase(&self, phase: SurfacePhase) {
        let mut current = self.phase.lock().unwrap();
        if *current == SurfacePhase::Destroyed {
            return;
        }
        *current = phase;
    }

    fn fault(&self, operation: &str, err: &crate::media::EngineError) {
        self.events.emit_lossy(BoardEvent::EngineFault {
            surface: self.id.clone(),
            operation: operation.to_string(),
            detail: err.to_string(),
            timestamp: chrono::Utc::now(),
        });
    }

    fn track(&self, task: tokio::task::JoinHandle<()>) {
        let mut tasks = self.tasks.lock().unwrap();
        // destroy() flips the phase before draining, so a task registered
        // during teardown is aborted here instead of leaking.
        if *self.phase.lock().unwrap() == SurfacePhase::Destroyed {
            task.abort();
            return;
        }
        tasks.push(task);
    }
}

impl Drop for PlayerSurface {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Wait for engine readiness, then run the bootstrap sequence.
async fn watch_ready(surface: Arc<PlayerSurface>, mut ready: watch::Receiver<bool>) {
    while !*ready.borrow_and_update() {
        if ready.changed().await.is_err() {
            return;
        }
    }
    run_bootstrap(surface).await;
}

/// Bootstrap on readiness: resume-seek or cold start.
///
/// The settle delays are bounded waits, not confirmations; the engine's
/// ready callback fires before it is safe to seek or play reliably.
async fn run_bootstrap(surface: Arc<PlayerSurface>) {
    surface.set_phase(SurfacePhase::Ready);

    // Snapshot taken at this instant decides the resume branch.
    let resume = surface.store.snapshot();
    info!(
        surface = %surface.id,
        role = surface.role.as_str(),
        resume_position = resume.position_secs,
        "surface ready"
    );
    surface.events.emit_lossy(BoardEvent::SurfaceReady {
        surface: surface.id.clone(),
        role: surface.role.as_str().to_string(),
        resumed_from_secs: resume.position_secs,
        timestamp: chrono::Utc::now(),
    });

    if surface.is_main() {
        // Re-assert authority at readiness, then start feeding telemetry.
        let grant = surface.arbiter.assume(&surface.id);
        *surface.grant.lock().unwrap() = Some(grant);
        let scheduler_task = scheduler::start(Arc::clone(&surface));
        surface.track(scheduler_task);
    }

    if resume.position_secs > 0.0 {
        time::sleep(surface.timing.seek_settle()).await;
        surface.engine_seek(resume.position_secs);

        time::sleep(surface.timing.resume_play_delay()).await;
        surface.force_play();
        let (producer, epoch) = surface.write_credentials();
        surface
            .store
            .update(StatusPatch::playing(true), &producer, epoch);

        if !surface.is_main() {
            if let Some(engine) = &surface.engine {
                engine.mute();
            }
        }
    } else {
        time::sleep(surface.timing.cold_start_delay()).await;
        surface.force_play();
        let (producer, epoch) = surface.write_credentials();
        surface
            .store
            .update(StatusPatch::playing_from_start(), &producer, epoch);
    }

    if !surface.is_main() {
        let mirror_task = tokio::spawn(mirror_store(Arc::clone(&surface)));
        surface.track(mirror_task);
    }
}

/// React to engine state transitions; ended triggers loop recovery.
async fn watch_state_changes(
    surface: Arc<PlayerSurface>,
    mut changes: tokio::sync::broadcast::Receiver<EngineState>,
) {
    loop {
        match changes.recv().await {
            Ok(EngineState::Ended) => {
                let recovery = tokio::spawn(run_loop_recovery(Arc::clone(&surface)));
                surface.track(recovery);
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                debug!(surface = %surface.id, skipped, "state change stream lagged");
            }
            Err(RecvError::Closed) => return,
        }
    }
}

/// Loop continuity: the engine does not loop natively across source
/// modes, so ended content is re-seeked to zero and restarted.
async fn run_loop_recovery(surface: Arc<PlayerSurface>) {
    if surface.phase() == SurfacePhase::Destroyed {
        return;
    }
    surface.set_phase(SurfacePhase::EndedRecovery);
    debug!(surface = %surface.id, "engine reported ended; restarting loop");

    time::sleep(surface.timing.loop_restart_delay()).await;
    if surface.phase() == SurfacePhase::Destroyed {
        return;
    }

    surface.engine_seek(0.0);
    surface.force_play();
    let (producer, epoch) = surface.write_credentials();
    surface
        .store
        .update(StatusPatch::playing_from_start(), &producer, epoch);

    info!(surface = %surface.id, "loop restarted from zero");
    surface.events.emit_lossy(BoardEvent::LoopRestarted {
        surface: surface.id.clone(),
        timestamp: chrono::Utc::now(),
    });
    surface.set_phase(SurfacePhase::Ready);
}

/// Follower mirror: track every status replacement into the local engine.
async fn mirror_store(surface: Arc<PlayerSurface>) {
    let mut rx = surface.store.subscribe();
    loop {
        if rx.changed().await.is_err() {
            return;
        }
        let status = *rx.borrow_and_update();
        surface.apply_mirror(&status);
    }
}
