//! Playback module for HapticPlayer
//!
//! This module ties the media engine to the screen: the playback manager
//! drives the engine through the surface lifecycle, the transport controller
//! is the on-screen overlay, and the state holder records whether playback
//! is running, paused by the system, paused by the user, or finished.

mod controller;
mod layout;
mod manager;
mod state;
mod tasks;
mod video;

pub use controller::{
    position_for, progress_for, ControlButton, ControllerView, KeyAction, KeyCode, KeyEvent,
    PlayPauseIcon, SeekBarListener, TransportController,
};
pub use layout::{fit_to_screen, DisplayMetrics, VideoLayout};
pub use manager::{AudioFocusChange, CallState, CompletionListener, ErrorListener, PlaybackManager};
pub use state::{PlaybackState, StateHolder};
pub use tasks::{ScheduledTask, TaskCallback, TaskRegistry};
pub use video::{VideoDescriptor, VideoType};

/// Navigation callbacks a screen exposes to the playback layer
pub trait ScreenEventHandler {
    /// The user asked to leave the screen
    fn back_pressed(&self);

    /// Record the position to resume from next time
    fn update_elapsed_time(&self, elapsed_ms: u64);
}
