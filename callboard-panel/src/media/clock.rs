//! Built-in clock-driven playback engine
//!
//! Stands in for the kiosk's embedded media engine: it reports ready after
//! a configurable load latency, advances its transport position on a fixed
//! tick while playing, and reports `Ended` when the item runs out. It does
//! not loop on its own; loop continuity is the surface's correction to
//! apply. The binary runs against this engine by default and soak tests
//! use it as a deterministic target.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::debug;

use callboard_common::events::EngineState;

use super::engine::{EngineError, EngineFactory, MediaEngine};
use super::source::EngineConfig;

/// Clock engine timing knobs, from the `[engine]` config section.
#[derive(Debug, Clone, Copy)]
pub struct ClockTuning {
    /// Delay between construction and the ready signal
    pub load_latency: Duration,
    /// Reported item duration; the transport ends here
    pub item_duration: Duration,
    /// Position advance granularity
    pub tick: Duration,
}

impl Default for ClockTuning {
    fn default() -> Self {
        Self {
            load_latency: Duration::from_millis(750),
            item_duration: Duration::from_secs(90),
            tick: Duration::from_millis(100),
        }
    }
}

#[derive(Debug)]
struct ClockState {
    position_secs: f64,
    state: EngineState,
    muted: bool,
    loaded: bool,
    /// play() arrived before readiness; start as soon as the load settles
    autoplay: bool,
}

/// In-process engine driven by the tokio clock.
pub struct ClockEngine {
    label: String,
    tuning: ClockTuning,
    inner: Arc<Mutex<ClockState>>,
    ready_rx: watch::Receiver<bool>,
    state_tx: broadcast::Sender<EngineState>,
    driver: JoinHandle<()>,
}

impl ClockEngine {
    /// Spawn an engine and its driver task. Must run inside a tokio runtime.
    pub fn spawn(label: &str, tuning: ClockTuning) -> Self {
        let inner = Arc::new(Mutex::new(ClockState {
            position_secs: 0.0,
            state: EngineState::Unstarted,
            muted: false,
            loaded: false,
            autoplay: false,
        }));
        let (ready_tx, ready_rx) = watch::channel(false);
        let (state_tx, _) = broadcast::channel(32);

        let driver = tokio::spawn(drive(
            label.to_string(),
            tuning,
            Arc::clone(&inner),
            ready_tx,
            state_tx.clone(),
        ));

        Self {
            label: label.to_string(),
            tuning,
            inner,
            ready_rx,
            state_tx,
            driver,
        }
    }

    /// Whether local audio output is silenced.
    pub fn muted(&self) -> bool {
        self.inner.lock().unwrap().muted
    }

    fn set_state(&self, state: EngineState) {
        let changed = {
            let mut inner = self.inner.lock().unwrap();
            if inner.state == state {
                false
            } else {
                inner.state = state;
                true
            }
        };
        if changed {
            let _ = self.state_tx.send(state);
        }
    }
}

impl Drop for ClockEngine {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

async fn drive(
    label: String,
    tuning: ClockTuning,
    inner: Arc<Mutex<ClockState>>,
    ready_tx: watch::Sender<bool>,
    state_tx: broadcast::Sender<EngineState>,
) {
    time::sleep(tuning.load_latency).await;

    // Ready flips first so a play() racing this settle takes the direct
    // path instead of parking another deferred start.
    let _ = ready_tx.send(true);
    let settled = {
        let mut state = inner.lock().unwrap();
        if state.autoplay {
            state.state = EngineState::Playing;
        } else if state.state == EngineState::Unstarted {
            state.state = EngineState::Cued;
        }
        state.state
    };
    let _ = state_tx.send(settled);
    debug!(engine = %label, state = %settled, "clock engine ready");

    let duration_secs = tuning.item_duration.as_secs_f64();
    let step_secs = tuning.tick.as_secs_f64();
    let mut interval = time::interval(tuning.tick);
    loop {
        interval.tick().await;

        let ended = {
            let mut state = inner.lock().unwrap();
            if state.state == EngineState::Playing {
                state.position_secs += step_secs;
                if state.position_secs >= duration_secs {
                    state.position_secs = duration_secs;
                    state.state = EngineState::Ended;
                    true
                } else {
                    false
                }
            } else {
                false
            }
        };
        if ended {
            debug!(engine = %label, "clock engine reached end of item");
            let _ = state_tx.send(EngineState::Ended);
        }
    }
}

impl MediaEngine for ClockEngine {
    fn load(&self, config: &EngineConfig) -> Result<(), EngineError> {
        debug!(
            engine = %self.label,
            item = %config.primary_item,
            collection = config.collection.as_deref(),
            "clock engine loading"
        );
        let mut inner = self.inner.lock().unwrap();
        inner.loaded = true;
        inner.position_secs = 0.0;
        Ok(())
    }

    fn play(&self) -> Result<(), EngineError> {
        {
            let mut inner = self.inner.lock().unwrap();
            if !inner.loaded {
                return Err(EngineError::Call("no media loaded".to_string()));
            }
            if !*self.ready_rx.borrow() {
                // Load still settling; start as soon as the engine comes up.
                inner.autoplay = true;
                return Ok(());
            }
        }
        self.set_state(EngineState::Playing);
        Ok(())
    }

    fn pause(&self) -> Result<(), EngineError> {
        self.set_state(EngineState::Paused);
        Ok(())
    }

    fn seek_to(&self, position_secs: f64) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().unwrap();
        inner.position_secs = position_secs
            .max(0.0)
            .min(self.tuning.item_duration.as_secs_f64());
        Ok(())
    }

    fn position_secs(&self) -> f64 {
        self.inner.lock().unwrap().position_secs
    }

    fn state(&self) -> EngineState {
        self.inner.lock().unwrap().state
    }

    fn mute(&self) {
        self.inner.lock().unwrap().muted = true;
    }

    fn ready(&self) -> watch::Receiver<bool> {
        self.ready_rx.clone()
    }

    fn state_changes(&self) -> broadcast::Receiver<EngineState> {
        self.state_tx.subscribe()
    }
}

/// Factory producing clock engines with shared tuning.
pub struct ClockEngineFactory {
    tuning: ClockTuning,
}

impl ClockEngineFactory {
    pub fn new(tuning: ClockTuning) -> Self {
        Self { tuning }
    }
}

impl EngineFactory for ClockEngineFactory {
    fn create(&self, label: &str) -> Result<Arc<dyn MediaEngine>, EngineError> {
        Ok(Arc::new(ClockEngine::spawn(label, self.tuning)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::source::{resolve, MediaSource};

    fn fast_tuning() -> ClockTuning {
        ClockTuning {
            load_latency: Duration::from_millis(10),
            item_duration: Duration::from_millis(200),
            tick: Duration::from_millis(10),
        }
    }

    fn loaded(engine: &ClockEngine) {
        engine.load(&resolve(&MediaSource::default())).unwrap();
    }

    #[tokio::test]
    async fn becomes_ready_after_load_latency() {
        let engine = ClockEngine::spawn("test", fast_tuning());
        let mut ready = engine.ready();
        assert!(!*ready.borrow());

        ready.changed().await.unwrap();
        assert!(*ready.borrow());
        assert_eq!(engine.state(), EngineState::Cued);
    }

    #[tokio::test]
    async fn advances_while_playing_and_reports_ended() {
        let engine = ClockEngine::spawn("test", fast_tuning());
        loaded(&engine);
        let mut changes = engine.state_changes();
        let mut ready = engine.ready();
        ready.changed().await.unwrap();

        engine.play().unwrap();
        // Drain transitions until the item runs out.
        loop {
            match changes.recv().await.unwrap() {
                EngineState::Ended => break,
                _ => continue,
            }
        }
        assert_eq!(engine.state(), EngineState::Ended);
        assert!(engine.position_secs() > 0.0);
    }

    #[tokio::test]
    async fn play_before_ready_is_deferred_not_refused() {
        let engine = ClockEngine::spawn("test", fast_tuning());
        loaded(&engine);
        let mut changes = engine.state_changes();
        engine.play().unwrap();
        assert_eq!(engine.state(), EngineState::Unstarted);

        // The deferred start lands once the load settles.
        loop {
            if changes.recv().await.unwrap() == EngineState::Playing {
                break;
            }
        }
        assert_eq!(engine.state(), EngineState::Playing);
    }

    #[tokio::test]
    async fn play_without_load_is_refused() {
        let engine = ClockEngine::spawn("test", fast_tuning());
        assert!(engine.play().is_err());
    }

    #[tokio::test]
    async fn mute_is_sticky() {
        let engine = ClockEngine::spawn("test", fast_tuning());
        assert!(!engine.muted());
        engine.mute();
        assert!(engine.muted());
    }

    #[tokio::test]
    async fn seek_clamps_into_item_bounds() {
        let engine = ClockEngine::spawn("test", fast_tuning());
        engine.seek_to(-5.0).unwrap();
        assert_eq!(engine.position_secs(), 0.0);

        engine.seek_to(600.0).unwrap();
        assert_eq!(engine.position_secs(), 0.2);
    }
}
