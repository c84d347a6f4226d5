//! Description of the video handed to a player screen.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Projection of the video content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoType {
    #[default]
    Standard,
    Spherical,
}

/// A playable video, its haptic companion track and the resume position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoDescriptor {
    pub title: String,

    /// Media file to play
    pub location: PathBuf,

    #[serde(default)]
    pub thumbnail: Option<PathBuf>,

    /// Haptic track rendered alongside the video
    #[serde(default)]
    pub haptic_path: Option<PathBuf>,

    #[serde(default)]
    pub haptics_enabled: bool,

    #[serde(default)]
    pub video_type: VideoType,

    /// Position to resume from; written back when the screen finishes
    #[serde(default)]
    pub elapsed_ms: u64,
}

impl VideoDescriptor {
    pub fn new(title: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        Self {
            title: title.into(),
            location: location.into(),
            thumbnail: None,
            haptic_path: None,
            haptics_enabled: false,
            video_type: VideoType::Standard,
            elapsed_ms: 0,
        }
    }

    /// Attach a haptic track and enable haptics
    pub fn with_haptics(mut self, path: impl Into<PathBuf>) -> Self {
        self.haptic_path = Some(path.into());
        self.haptics_enabled = true;
        self
    }

    pub fn with_elapsed(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }
}
