//! Media source resolution and the playback engine seam

pub mod clock;
pub mod engine;
pub mod source;

pub use clock::{ClockEngine, ClockEngineFactory, ClockTuning};
pub use engine::{EngineError, EngineFactory, MediaEngine};
pub use source::{resolve, EngineConfig, MediaSource, FALLBACK_ITEM_ID};
