//! Clock-driven media engine
//!
//! Behaves like a platform engine without decoding anything: it validates
//! calls against the usual engine state machine, advances its position on
//! the looper clock while started, and reports preparation and completion
//! asynchronously through the looper.

use crate::engine::{EngineFactory, EngineEvent, EngineListener, MediaEngine, Surface, VideoSize};
use crate::haptics::{HapticDevice, LoggingHapticDevice};
use crate::looper::{Handler, TaskId};
use crate::utils::config::EngineConfig;
use crate::utils::error::{HapticPlayerError, Result};
use log::{debug, info};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Engine lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Initialized,
    Preparing,
    Prepared,
    Started,
    Paused,
    Stopped,
    PlaybackCompleted,
    Released,
}

/// State shared with the engine's own posted tasks
struct Core {
    state: EngineState,

    /// Position at the last transport change
    anchor_ms: u64,

    /// Clock time playback last (re)started, while started
    started_at: Option<u64>,

    listener: Option<EngineListener>,
    prepare_task: Option<TaskId>,
    completion_task: Option<TaskId>,
}

/// Simulated platform media engine
pub struct SimulatedEngine {
    handler: Handler,
    media: EngineConfig,
    core: Rc<RefCell<Core>>,
    source: Option<PathBuf>,
    display: Option<Surface>,
    screen_on: bool,
}

impl SimulatedEngine {
    /// Create an idle engine describing the given media
    pub fn new(handler: Handler, media: EngineConfig) -> Self {
        Self {
            handler,
            media,
            core: Rc::new(RefCell::new(Core {
                state: EngineState::Idle,
                anchor_ms: 0,
                started_at: None,
                listener: None,
                prepare_task: None,
                completion_task: None,
            })),
            source: None,
            display: None,
            screen_on: false,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> EngineState {
        self.core.borrow().state
    }

    /// Bound media file
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Bound display surface
    pub fn display(&self) -> Option<&Surface> {
        self.display.as_ref()
    }

    /// Whether the screen is kept on while playing
    pub fn screen_on_while_playing(&self) -> bool {
        self.screen_on
    }

    fn require(&self, op: &str, allowed: &[EngineState]) -> Result<()> {
        let state = self.state();
        if allowed.contains(&state) {
            Ok(())
        } else {
            Err(HapticPlayerError::invalid_state(format!("{}() called in state {:?}", op, state)))
        }
    }

    fn position_at(&self, core: &Core, now_ms: u64) -> u64 {
        match core.started_at {
            Some(started) => (core.anchor_ms + now_ms.saturating_sub(started)).min(self.media.duration_ms),
            None => core.anchor_ms,
        }
    }

    fn cancel_completion(&self) {
        if let Some(task) = self.core.borrow_mut().completion_task.take() {
            self.handler.remove(task);
        }
    }

    fn schedule_completion(&self) {
        self.cancel_completion();

        let remaining = {
            let core = self.core.borrow();
            self.media.duration_ms.saturating_sub(core.anchor_ms)
        };

        let weak = Rc::downgrade(&self.core);
        let duration = self.media.duration_ms;
        let task = self.handler.post_delayed(
            move || {
                let Some(core) = weak.upgrade() else {
                    return;
                };

                let listener = {
                    let mut core = core.borrow_mut();
                    if core.state != EngineState::Started {
                        return;
                    }
                    core.state = EngineState::PlaybackCompleted;
                    core.anchor_ms = duration;
                    core.started_at = None;
                    core.completion_task = None;
                    core.listener.clone()
                };

                info!("Playback completed at {}ms", duration);
                if let Some(listener) = listener {
                    listener(EngineEvent::Completed);
                }
            },
            remaining,
        );

        self.core.borrow_mut().completion_task = Some(task);
    }

    /// Freeze the position at "now" and leave the started state
    fn freeze(&self, next: EngineState) {
        let now = self.handler.now_ms();
        let mut core = self.core.borrow_mut();
        core.anchor_ms = self.position_at(&core, now);
        core.started_at = None;
        core.state = next;
    }
}

impl MediaEngine for SimulatedEngine {
    fn set_event_listener(&mut self, listener: EngineListener) {
        self.core.borrow_mut().listener = Some(listener);
    }

    fn set_data_source(&mut self, path: &Path) -> Result<()> {
        self.require("setDataSource", &[EngineState::Idle])?;

        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(HapticPlayerError::NotFound(path.display().to_string()));
        }

        debug!("Data source bound: {:?}", path);
        self.source = Some(path.to_path_buf());
        self.core.borrow_mut().state = EngineState::Initialized;
        Ok(())
    }

    fn set_display(&mut self, surface: Option<&Surface>) {
        self.display = surface.cloned();
    }

    fn set_screen_on_while_playing(&mut self, screen_on: bool) {
        self.screen_on = screen_on;
    }

    fn prepare_async(&mut self) -> Result<()> {
        self.require("prepareAsync", &[EngineState::Initialized, EngineState::Stopped])?;
        self.core.borrow_mut().state = EngineState::Preparing;

        let weak = Rc::downgrade(&self.core);
        let task = self.handler.post_delayed(
            move || {
                let Some(core) = weak.upgrade() else {
                    return;
                };

                let listener = {
                    let mut core = core.borrow_mut();
                    if core.state != EngineState::Preparing {
                        return;
                    }
                    core.state = EngineState::Prepared;
                    core.prepare_task = None;
                    core.listener.clone()
                };

                if let Some(listener) = listener {
                    listener(EngineEvent::Prepared);
                }
            },
            self.media.prepare_delay_ms,
        );

        self.core.borrow_mut().prepare_task = Some(task);
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        self.require(
            "start",
            &[
                EngineState::Prepared,
                EngineState::Started,
                EngineState::Paused,
                EngineState::PlaybackCompleted,
            ],
        )?;

        if self.state() == EngineState::Started {
            return Ok(());
        }

        {
            let now = self.handler.now_ms();
            let mut core = self.core.borrow_mut();
            if core.state == EngineState::PlaybackCompleted {
                core.anchor_ms = 0;
            }
            core.state = EngineState::Started;
            core.started_at = Some(now);
        }

        self.schedule_completion();
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.require(
            "pause",
            &[EngineState::Started, EngineState::Paused, EngineState::PlaybackCompleted],
        )?;

        if self.state() == EngineState::Started {
            self.cancel_completion();
            self.freeze(EngineState::Paused);
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.require(
            "stop",
            &[
                EngineState::Prepared,
                EngineState::Started,
                EngineState::Paused,
                EngineState::Stopped,
                EngineState::PlaybackCompleted,
            ],
        )?;

        self.cancel_completion();
        self.freeze(EngineState::Stopped);
        Ok(())
    }

    fn seek_to(&mut self, position_ms: u64) -> Result<()> {
        self.require(
            "seekTo",
            &[
                EngineState::Prepared,
                EngineState::Started,
                EngineState::Paused,
                EngineState::PlaybackCompleted,
            ],
        )?;

        let started = {
            let now = self.handler.now_ms();
            let mut core = self.core.borrow_mut();
            core.anchor_ms = position_ms.min(self.media.duration_ms);
            if core.started_at.is_some() {
                core.started_at = Some(now);
            }
            core.state == EngineState::Started
        };

        if started {
            self.schedule_completion();
        }
        Ok(())
    }

    fn is_playing(&self) -> Result<bool> {
        match self.state() {
            EngineState::Released => Err(HapticPlayerError::invalid_state("isPlaying() after release")),
            state => Ok(state == EngineState::Started),
        }
    }

    fn current_position(&self) -> u64 {
        let core = self.core.borrow();
        self.position_at(&core, self.handler.now_ms())
    }

    fn duration(&self) -> u64 {
        match self.state() {
            EngineState::Idle | EngineState::Initialized | EngineState::Preparing | EngineState::Released => 0,
            _ => self.media.duration_ms,
        }
    }

    fn video_size(&self) -> VideoSize {
        match self.state() {
            EngineState::Idle | EngineState::Initialized | EngineState::Preparing | EngineState::Released => {
                VideoSize::default()
            }
            _ => VideoSize {
                width: self.media.video_width,
                height: self.media.video_height,
            },
        }
    }

    fn release(&mut self) {
        let tasks = {
            let mut core = self.core.borrow_mut();
            core.listener = None;
            [core.prepare_task.take(), core.completion_task.take()]
        };
        for task in tasks.into_iter().flatten() {
            self.handler.remove(task);
        }

        self.freeze(EngineState::Released);
        self.display = None;
        debug!("Engine released");
    }
}

/// Factory producing simulated engines and logging haptic devices
pub struct SimulatedEngineFactory {
    handler: Handler,
    media: EngineConfig,
    with_haptics: bool,
}

impl SimulatedEngineFactory {
    pub fn new(handler: Handler, media: EngineConfig, with_haptics: bool) -> Self {
        Self {
            handler,
            media,
            with_haptics,
        }
    }
}

impl EngineFactory for SimulatedEngineFactory {
    fn create_engine(&self) -> Box<dyn MediaEngine> {
        Box::new(SimulatedEngine::new(self.handler.clone(), self.media.clone()))
    }

    fn create_haptic_device(&self) -> Option<Box<dyn HapticDevice>> {
        if self.with_haptics {
            Some(Box::new(LoggingHapticDevice::new()))
        } else {
            None
        }
    }
}
