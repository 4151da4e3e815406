//! Test harness for surface/panel integration tests
//!
//! Provides a manually driven FakeEngine (ready and state transitions are
//! flipped by the test), a factory that records every engine it hands out,
//! and a Rig bundling the shared store/arbiter/bus with fast timing.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, watch};

use callboard_common::events::{EngineState, EventBus};
use callboard_panel::authority::AuthorityArbiter;
use callboard_panel::config::TimingConfig;
use callboard_panel::media::{EngineConfig, EngineError, EngineFactory, MediaEngine, MediaSource};
use callboard_panel::playback::{PlayerSurface, SurfaceRole};
use callboard_panel::state::PlaybackStore;

struct FakeState {
    position_secs: f64,
    state: EngineState,
    muted: bool,
    loaded: Option<EngineConfig>,
    ops: Vec<String>,
}

/// Manually driven engine: nothing happens until the test flips it.
pub struct FakeEngine {
    pub label: String,
    inner: Mutex<FakeState>,
    ready_tx: watch::Sender<bool>,
    state_tx: broadcast::Sender<EngineState>,
    play_rejected: AtomicBool,
}

impl FakeEngine {
    pub fn new(label: &str) -> Arc<Self> {
        let (ready_tx, _) = watch::channel(false);
        let (state_tx, _) = broadcast::channel(64);
        Arc::new(Self {
            label: label.to_string(),
            inner: Mutex::new(FakeState {
                position_secs: 0.0,
                state: EngineState::Unstarted,
                muted: false,
                loaded: None,
                ops: Vec::new(),
            }),
            ready_tx,
            state_tx,
            play_rejected: AtomicBool::new(false),
        })
    }

    /// Fire the ready signal, as the engine's load sequence would.
    pub fn make_ready(&self) {
        let _ = self.ready_tx.send(true);
    }

    /// Report a transport state transition from the engine side.
    pub fn report_state(&self, state: EngineState) {
        self.inner.lock().unwrap().state = state;
        let _ = self.state_tx.send(state);
    }

    pub fn set_position(&self, position_secs: f64) {
        self.inner.lock().unwrap().position_secs = position_secs;
    }

    /// Make play() fail with a policy denial until cleared.
    pub fn set_play_rejected(&self, rejected: bool) {
        self.play_rejected.store(rejected, Ordering::SeqCst);
    }

    pub fn muted(&self) -> bool {
        self.inner.lock().unwrap().muted
    }

    pub fn loaded_config(&self) -> Option<EngineConfig> {
        self.inner.lock().unwrap().loaded.clone()
    }

    /// Recorded operations, in call order.
    pub fn ops(&self) -> Vec<String> {
        self.inner.lock().unwrap().ops.clone()
    }

    pub fn op_count(&self, prefix: &str) -> usize {
        self.ops().iter().filter(|op| op.starts_with(prefix)).count()
    }

    fn record(&self, op: String) {
        self.inner.lock().unwrap().ops.push(op);
    }
}

impl MediaEngine for FakeEngine {
    fn load(&self, config: &EngineConfig) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().unwrap();
        inner.ops.push(format!("load:{}", config.primary_item));
        inner.loaded = Some(config.clone());
        Ok(())
    }

    fn play(&self) -> Result<(), EngineError> {
        self.record("play".to_string());
        if self.play_rejected.load(Ordering::SeqCst) {
            return Err(EngineError::PlaybackRejected("policy denial".to_string()));
        }
        self.inner.lock().unwrap().state = EngineState::Playing;
        let _ = self.state_tx.send(EngineState::Playing);
        Ok(())
    }

    fn pause(&self) -> Result<(), EngineError> {
        self.record("pause".to_string());
        self.inner.lock().unwrap().state = EngineState::Paused;
        let _ = self.state_tx.send(EngineState::Paused);
        Ok(())
    }

    fn seek_to(&self, position_secs: f64) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().unwrap();
        inner.ops.push(format!("seek:{position_secs}"));
        inner.position_secs = position_secs;
        Ok(())
    }

    fn position_secs(&self) -> f64 {
        self.inner.lock().unwrap().position_secs
    }

    fn state(&self) -> EngineState {
        self.inner.lock().unwrap().state
    }

    fn mute(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.ops.push("mute".to_string());
        inner.muted = true;
    }

    fn ready(&self) -> watch::Receiver<bool> {
        self.ready_tx.subscribe()
    }

    fn state_changes(&self) -> broadcast::Receiver<EngineState> {
        self.state_tx.subscribe()
    }
}

/// Factory that records every engine it hands out, so tests can drive them.
#[derive(Default)]
pub struct FakeFactory {
    pub engines: Mutex<Vec<Arc<FakeEngine>>>,
    pub fallbacks: Mutex<Vec<Arc<FakeEngine>>>,
    pub fail_create: AtomicBool,
}

impl FakeFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn engine(&self, index: usize) -> Arc<FakeEngine> {
        self.engines.lock().unwrap()[index].clone()
    }

    pub fn engine_count(&self) -> usize {
        self.engines.lock().unwrap().len()
    }

    pub fn fallback_count(&self) -> usize {
        self.fallbacks.lock().unwrap().len()
    }

    pub fn fallback_engine(&self, index: usize) -> Arc<FakeEngine> {
        self.fallbacks.lock().unwrap()[index].clone()
    }
}

impl EngineFactory for FakeFactory {
    fn create(&self, label: &str) -> Result<Arc<dyn MediaEngine>, EngineError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(EngineError::Unavailable("no media element".to_string()));
        }
        let engine = FakeEngine::new(label);
        self.engines.lock().unwrap().push(engine.clone());
        Ok(engine)
    }

    fn fallback(&self, label: &str) -> Result<Arc<dyn MediaEngine>, EngineError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(EngineError::Unavailable("no media element".to_string()));
        }
        let engine = FakeEngine::new(label);
        self.fallbacks.lock().unwrap().push(engine.clone());
        Ok(engine)
    }
}

/// Shared fixture: store, arbiter, bus and a fast timing profile.
pub struct Rig {
    pub bus: EventBus,
    pub arbiter: Arc<AuthorityArbiter>,
    pub store: Arc<PlaybackStore>,
    pub factory: Arc<FakeFactory>,
    pub timing: TimingConfig,
}

pub fn rig() -> Rig {
    let bus = EventBus::new(256);
    let arbiter = Arc::new(AuthorityArbiter::new(bus.clone()));
    let store = Arc::new(PlaybackStore::new(Arc::clone(&arbiter), bus.clone()));
    Rig {
        bus,
        arbiter,
        store,
        factory: FakeFactory::new(),
        timing: fast_timing(),
    }
}

/// Short delays so integration tests settle quickly on real time.
pub fn fast_timing() -> TimingConfig {
    TimingConfig {
        poll_interval_ms: 20,
        seek_settle_ms: 30,
        resume_play_delay_ms: 15,
        cold_start_delay_ms: 40,
        loop_restart_delay_ms: 15,
        drift_threshold_secs: 1.0,
    }
}

impl Rig {
    pub fn surface(&self, role: SurfaceRole) -> Arc<PlayerSurface> {
        self.surface_with_source(role, &MediaSource::default())
    }

    pub fn surface_with_source(
        &self,
        role: SurfaceRole,
        source: &MediaSource,
    ) -> Arc<PlayerSurface> {
        PlayerSurface::new(
            role,
            source,
            Arc::clone(&self.store),
            Arc::clone(&self.arbiter),
            self.factory.clone(),
            self.bus.clone(),
            self.timing,
        )
    }
}

/// Poll a condition with a 2 s cap; panics with `what` on timeout.
pub async fn wait_for<F>(what: &str, condition: F)
where
    F: Fn() -> bool,
{
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}
