//! Haptic channel for HapticPlayer
//!
//! A haptic track is an optional second output kept in step with video
//! playback. The device that renders it is opaque to the player: it is
//! reached through [`HapticDevice`], constructed by whoever owns the
//! playback session and handed in explicitly.

mod device;
mod effect;
mod media_engine;

pub use device::LoggingHapticDevice;
pub use effect::HapticEffect;
pub use media_engine::HapticMediaEngine;

use crate::utils::error::Result;
use std::path::Path;

/// Capability surface of a haptic playback device
///
/// Positions are in milliseconds of the video timeline.
pub trait HapticDevice {
    /// Open a haptic effect track
    fn open(&mut self, path: &Path) -> Result<()>;

    /// Play the opened track from its beginning
    fn play(&mut self) -> Result<()>;

    /// Resume after a pause
    fn resume(&mut self) -> Result<()>;

    /// Pause the track
    fn pause(&mut self) -> Result<()>;

    /// Stop the track
    fn stop(&mut self) -> Result<()>;

    /// Jump to a position
    fn seek(&mut self, position_ms: u64) -> Result<()>;

    /// Report the current video position so the track can correct drift
    fn update(&mut self, position_ms: u64) -> Result<()>;

    /// Render a one-shot effect on top of the track
    fn play_effect(&mut self, effect: HapticEffect) -> Result<()>;
}
