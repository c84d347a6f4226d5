//! Haptic device that only records and logs what it is asked to do.
//!
//! Used by the driver binary in place of a vendor vibration SDK.

use crate::haptics::{HapticDevice, HapticEffect};
use crate::utils::error::{HapticPlayerError, IntoPlayerError, Result};
use log::debug;
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct LoggingHapticDevice {
    track: Option<PathBuf>,
    track_len: u64,
    playing: bool,
    last_position_ms: u64,
    last_effect: Option<HapticEffect>,
}

impl LoggingHapticDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opened track, if any
    pub fn track(&self) -> Option<&Path> {
        self.track.as_deref()
    }

    /// Whether the track is currently rendering
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Last position received through `seek` or `update`
    pub fn last_position_ms(&self) -> u64 {
        self.last_position_ms
    }

    pub fn last_effect(&self) -> Option<HapticEffect> {
        self.last_effect
    }

    fn require_track(&self, op: &str) -> Result<()> {
        if self.track.is_none() {
            return Err(HapticPlayerError::Haptics(format!("{} with no track open", op)));
        }
        Ok(())
    }
}

impl HapticDevice for LoggingHapticDevice {
    fn open(&mut self, path: &Path) -> Result<()> {
        let metadata = std::fs::metadata(path).haptics_err("Opening haptic track")?;
        self.track = Some(path.to_path_buf());
        self.track_len = metadata.len();
        self.playing = false;
        self.last_position_ms = 0;
        debug!("Haptic track opened: {:?} ({} bytes)", path, self.track_len);
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        self.require_track("play")?;
        self.playing = true;
        self.last_position_ms = 0;
        debug!("Haptic track playing from start");
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        self.require_track("resume")?;
        self.playing = true;
        debug!("Haptic track resumed at {}ms", self.last_position_ms);
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.require_track("pause")?;
        self.playing = false;
        debug!("Haptic track paused");
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.require_track("stop")?;
        self.playing = false;
        self.last_position_ms = 0;
        debug!("Haptic track stopped");
        Ok(())
    }

    fn seek(&mut self, position_ms: u64) -> Result<()> {
        self.require_track("seek")?;
        self.last_position_ms = position_ms;
        debug!("Haptic track seek to {}ms", position_ms);
        Ok(())
    }

    fn update(&mut self, position_ms: u64) -> Result<()> {
        self.require_track("update")?;
        self.last_position_ms = position_ms;
        Ok(())
    }

    fn play_effect(&mut self, effect: HapticEffect) -> Result<()> {
        debug!("Haptic effect: {}", effect);
        self.last_effect = Some(effect);
        Ok(())
    }
}
