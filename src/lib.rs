//! HapticPlayer - playback synchronization core for a haptics-augmented video player
//!
//! Everything runs on a single [`looper::Looper`]: engine notifications,
//! controller timers, haptic sync ticks and scheduled callbacks are tasks on
//! one serialized queue driven by the host.

pub mod engine;
pub mod haptics;
pub mod looper;
pub mod player;
pub mod screen;
pub mod utils;

pub use utils::error::{HapticPlayerError, Result};
