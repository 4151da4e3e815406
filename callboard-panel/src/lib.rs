//! # Callboard Panel Library (callboard-panel)
//!
//! Kiosk call-queue display board wrapping a looping media player.
//!
//! **Purpose:** Keep one authoritative media surface feeding a shared
//! playback status store, mirror that status onto follower surfaces, and
//! hide/rebuild the surfaces around call announcements without losing
//! playback continuity.
//!
//! **Architecture:** One tokio runtime; a watch-channel status store gated
//! by an epoch-based authority arbiter, per-surface bootstrap and loop
//! recovery, a fixed-period telemetry poll, and an HTTP/SSE control
//! surface.

pub mod api;
pub mod authority;
pub mod calls;
pub mod config;
pub mod error;
pub mod media;
pub mod panel;
pub mod playback;
pub mod state;

pub use error::{Error, Result};
pub use state::{PlaybackStatus, PlaybackStore, StatusPatch, WriteOutcome};
