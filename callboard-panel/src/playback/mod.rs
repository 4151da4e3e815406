//! Player surfaces and playback-state synchronization

pub mod scheduler;
pub mod surface;

pub use surface::{PlayerSurface, SurfacePhase, SurfaceRole};
