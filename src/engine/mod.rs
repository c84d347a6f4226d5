//! Media engine abstractions for HapticPlayer
//!
//! The player never decodes anything itself. It drives an external engine
//! through two narrow surfaces:
//!
//! - [`MediaEngine`]: the full engine lifecycle owned by the playback
//!   manager (source binding, display binding, asynchronous preparation,
//!   transport, release).
//! - [`MediaPlayerControl`]: the command surface the transport controller
//!   is allowed to see.

mod simulated;

pub use simulated::{EngineState, SimulatedEngine, SimulatedEngineFactory};

use crate::haptics::HapticDevice;
use crate::utils::error::Result;
use std::path::Path;
use std::rc::Rc;

/// Command surface used by the transport controller
///
/// All positions and durations are in milliseconds.
pub trait MediaPlayerControl {
    /// Start or resume playback
    fn start(&self);

    /// Pause playback
    fn pause(&self);

    /// Total media duration, 0 while unknown
    fn duration(&self) -> u64;

    /// Current playback position
    fn current_position(&self) -> u64;

    /// Seek to an absolute position
    fn seek_to(&self, position_ms: u64);

    /// Buffered share of the media, 0 to 100
    fn buffer_percentage(&self) -> u32;

    /// Whether playback is considered running
    fn is_playing(&self) -> bool;

    /// Whether the media can be paused at all
    fn can_pause(&self) -> bool;
}

/// Native dimensions of a video stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VideoSize {
    pub width: u32,
    pub height: u32,
}

/// Rendering target the engine draws into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    /// Identity of the platform surface
    pub id: u64,

    /// Current width in pixels
    pub width: u32,

    /// Current height in pixels
    pub height: u32,
}

impl Surface {
    pub fn new(id: u64, width: u32, height: u32) -> Self {
        Self { id, width, height }
    }
}

/// Asynchronous notifications delivered by an engine on the looper
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Preparation finished; playback operations are now valid
    Prepared,

    /// Playback reached the end of the media
    Completed,

    /// The engine hit an unrecoverable error
    Error(String),
}

/// Receiver for engine events
pub type EngineListener = Rc<dyn Fn(EngineEvent)>;

/// Full lifecycle surface of a platform media engine
pub trait MediaEngine {
    /// Register the receiver for asynchronous events
    fn set_event_listener(&mut self, listener: EngineListener);

    /// Bind the media file to play
    fn set_data_source(&mut self, path: &Path) -> Result<()>;

    /// Bind (or unbind) the rendering surface
    fn set_display(&mut self, surface: Option<&Surface>);

    /// Keep the screen awake while playing
    fn set_screen_on_while_playing(&mut self, screen_on: bool);

    /// Begin preparation; completion is reported as [`EngineEvent::Prepared`]
    fn prepare_async(&mut self) -> Result<()>;

    /// Start or resume playback
    fn start(&mut self) -> Result<()>;

    /// Pause playback
    fn pause(&mut self) -> Result<()>;

    /// Stop playback; the engine must be prepared again before restarting
    fn stop(&mut self) -> Result<()>;

    /// Seek to an absolute position in milliseconds
    fn seek_to(&mut self, position_ms: u64) -> Result<()>;

    /// Whether the engine is rendering, failing once it has been released
    fn is_playing(&self) -> Result<bool>;

    /// Current position in milliseconds
    fn current_position(&self) -> u64;

    /// Media duration in milliseconds, 0 while unknown
    fn duration(&self) -> u64;

    /// Native video dimensions, zero while unknown
    fn video_size(&self) -> VideoSize;

    /// Release every engine resource; no operation is valid afterwards
    fn release(&mut self);
}

/// Source of engines and haptic devices for a playback manager
///
/// The manager asks for a fresh engine every time a surface is created, and
/// for a fresh haptic device alongside it.
pub trait EngineFactory {
    /// Construct a new, idle engine
    fn create_engine(&self) -> Box<dyn MediaEngine>;

    /// Construct the haptic device paired with the next engine, if any
    fn create_haptic_device(&self) -> Option<Box<dyn HapticDevice>> {
        None
    }
}
