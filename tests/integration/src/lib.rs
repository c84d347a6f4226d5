//! Integration test utilities for HapticPlayer
//!
//! This module provides common utilities for integration testing including:
//! - Test media and haptic track files
//! - A mock haptic device
//! - An engine factory that counts the engines it creates

use anyhow::Result;
use hapticplayer::engine::{EngineFactory, MediaEngine, SimulatedEngineFactory};
use hapticplayer::haptics::{HapticDevice, HapticEffect};
use hapticplayer::looper::Looper;
use hapticplayer::player::VideoDescriptor;
use hapticplayer::screen::{ControllerMode, PlayerScreen};
use hapticplayer::utils::{Config, EngineConfig};
use mockall::mock;
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;

mock! {
    pub Haptics {}

    impl HapticDevice for Haptics {
        fn open(&mut self, path: &Path) -> hapticplayer::Result<()>;
        fn play(&mut self) -> hapticplayer::Result<()>;
        fn resume(&mut self) -> hapticplayer::Result<()>;
        fn pause(&mut self) -> hapticplayer::Result<()>;
        fn stop(&mut self) -> hapticplayer::Result<()>;
        fn seek(&mut self, position_ms: u64) -> hapticplayer::Result<()>;
        fn update(&mut self, position_ms: u64) -> hapticplayer::Result<()>;
        fn play_effect(&mut self, effect: HapticEffect) -> hapticplayer::Result<()>;
    }
}

/// Test fixture holding a video file and its haptic track
pub struct TestFixture {
    pub temp_dir: TempDir,
    pub video: PathBuf,
    pub haptic_track: PathBuf,
}

impl TestFixture {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let video = temp_dir.path().join("clip.mp4");
        let haptic_track = temp_dir.path().join("clip.hapt");
        std::fs::write(&video, b"not really an mp4")?;
        std::fs::write(&haptic_track, b"not really a haptic track")?;

        Ok(Self {
            temp_dir,
            video,
            haptic_track,
        })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn descriptor(&self) -> VideoDescriptor {
        VideoDescriptor::new("Clip", &self.video)
    }
}

/// Factory wrapping the simulated engine that counts engine creations and
/// hands out a preset haptic device once
pub struct CountingFactory {
    base: SimulatedEngineFactory,
    created: Rc<Cell<u32>>,
    device: RefCell<Option<Box<dyn HapticDevice>>>,
}

impl CountingFactory {
    pub fn new(looper: &Looper, media: EngineConfig) -> (Self, Rc<Cell<u32>>) {
        let created = Rc::new(Cell::new(0));
        let factory = Self {
            base: SimulatedEngineFactory::new(looper.handler(), media, false),
            created: Rc::clone(&created),
            device: RefCell::new(None),
        };
        (factory, created)
    }

    pub fn with_device(self, device: Box<dyn HapticDevice>) -> Self {
        *self.device.borrow_mut() = Some(device);
        self
    }
}

impl EngineFactory for CountingFactory {
    fn create_engine(&self) -> Box<dyn MediaEngine> {
        self.created.set(self.created.get() + 1);
        self.base.create_engine()
    }

    fn create_haptic_device(&self) -> Option<Box<dyn HapticDevice>> {
        self.device.borrow_mut().take()
    }
}

/// Launch a screen with default settings on `looper`
pub fn launch(
    looper: &Looper,
    video: VideoDescriptor,
    mode: ControllerMode,
    factory: Box<dyn EngineFactory>,
) -> Result<PlayerScreen> {
    Ok(PlayerScreen::launch(video, mode, &Config::default(), looper.handler(), factory)?)
}
