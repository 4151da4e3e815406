//! Panel configuration
//!
//! TOML configuration with compiled defaults. Resolution priority follows
//! the usual order: explicit path from the command line, then the
//! `CALLBOARD_CONFIG` environment variable, then the platform config
//! directory (`~/.config/callboard/config.toml` on Linux), then defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::media::{ClockTuning, MediaSource};

/// Top-level panel configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub media: MediaSource,
    pub timing: TimingConfig,
    pub panel: PanelConfig,
    pub engine: EngineTuningConfig,
}

/// HTTP bind configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 5780,
        }
    }
}

/// Synchronization timing knobs.
///
/// The settle delays are bounded waits around engine readiness, not
/// event-driven confirmations; the defaults match observed engine load
/// behavior and are deliberately conservative.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Telemetry poll period for the authoritative surface
    pub poll_interval_ms: u64,
    /// Wait before seeking a freshly ready engine to a resume position
    pub seek_settle_ms: u64,
    /// Wait between the resume seek and force-play
    pub resume_play_delay_ms: u64,
    /// Wait before force-playing a cold-started engine
    pub cold_start_delay_ms: u64,
    /// Wait before restarting a looped item after the engine reports ended
    pub loop_restart_delay_ms: u64,
    /// Follower drift beyond which a corrective seek is issued
    pub drift_threshold_secs: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 250,
            seek_settle_ms: 500,
            resume_play_delay_ms: 250,
            cold_start_delay_ms: 1000,
            loop_restart_delay_ms: 250,
            drift_threshold_secs: 1.0,
        }
    }
}

impl TimingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn seek_settle(&self) -> Duration {
        Duration::from_millis(self.seek_settle_ms)
    }

    pub fn resume_play_delay(&self) -> Duration {
        Duration::from_millis(self.resume_play_delay_ms)
    }

    pub fn cold_start_delay(&self) -> Duration {
        Duration::from_millis(self.cold_start_delay_ms)
    }

    pub fn loop_restart_delay(&self) -> Duration {
        Duration::from_millis(self.loop_restart_delay_ms)
    }
}

/// Surface layout.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Mirror surfaces constructed alongside the main surface
    pub followers: usize,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self { followers: 1 }
    }
}

/// Built-in clock engine tuning.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct EngineTuningConfig {
    pub load_latency_ms: u64,
    pub item_duration_secs: f64,
    pub tick_ms: u64,
}

impl Default for EngineTuningConfig {
    fn default() -> Self {
        Self {
            load_latency_ms: 750,
            item_duration_secs: 90.0,
            tick_ms: 100,
        }
    }
}

impl EngineTuningConfig {
    pub fn clock_tuning(&self) -> ClockTuning {
        ClockTuning {
            load_latency: Duration::from_millis(self.load_latency_ms),
            item_duration: Duration::from_secs_f64(self.item_duration_secs),
            tick: Duration::from_millis(self.tick_ms),
        }
    }
}

impl Config {
    /// Resolve and load configuration.
    ///
    /// An explicitly supplied path must exist; the env/platform fallbacks
    /// silently degrade to compiled defaults when absent.
    pub fn load(explicit: Option<&Path>) -> Result<Config> {
        let resolved = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => std::env::var("CALLBOARD_CONFIG")
                .ok()
                .map(PathBuf::from)
                .or_else(default_config_path),
        };

        match resolved {
            Some(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                Self::from_file(&path)
            }
            Some(path) if explicit.is_some() => Err(Error::Config(format!(
                "config file not found: {}",
                path.display()
            ))),
            _ => Ok(Config::default()),
        }
    }

    /// Parse a TOML configuration file.
    pub fn from_file(path: &Path) -> Result<Config> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("callboard").join("config.toml"))
}
