//! Media engine decorator that drives a haptic track alongside the video.
//!
//! Transport calls go to the wrapped engine first and are then mirrored onto
//! the haptic device. While the engine plays, a sync task on the looper
//! pushes the video position into the device once per interval; it re-arms
//! itself from inside each tick and stops as soon as the engine stops
//! playing or refuses the query.
//!
//! A missing or unopenable haptic track never affects video playback: the
//! channel is marked unavailable and every haptic call becomes a no-op.

use crate::engine::{EngineListener, MediaEngine, Surface, VideoSize};
use crate::haptics::{HapticDevice, HapticEffect};
use crate::looper::{Handler, TaskId};
use crate::utils::error::{HapticPlayerError, Result};
use log::{debug, warn};
use std::cell::RefCell;
use std::io;
use std::path::Path;
use std::rc::{Rc, Weak};

struct Inner {
    base: Box<dyn MediaEngine>,
    device: Option<Box<dyn HapticDevice>>,
    haptics_available: bool,

    /// The next start resumes the track instead of restarting it
    was_paused: bool,

    sync_task: Option<TaskId>,
}

impl Inner {
    /// Run a device operation if the channel is usable, logging failures
    fn haptic<F>(&mut self, op: &str, f: F)
    where
        F: FnOnce(&mut dyn HapticDevice) -> Result<()>,
    {
        if !self.haptics_available {
            return;
        }

        if let Some(device) = self.device.as_deref_mut() {
            if let Err(e) = f(device) {
                warn!("Haptic {} failed, skipping: {}", op, e);
            }
        }
    }
}

/// Media engine with an optional synchronized haptic channel
pub struct HapticMediaEngine {
    inner: Rc<RefCell<Inner>>,
    handler: Handler,
    sync_interval_ms: u64,
}

impl HapticMediaEngine {
    /// Wrap `base`, pairing it with `device` when one is available
    ///
    /// # Arguments
    ///
    /// * `base` - Engine rendering the video
    /// * `device` - Haptic device, or `None` for video-only playback
    /// * `handler` - Looper the sync task runs on
    /// * `sync_interval_ms` - Interval between position pushes
    pub fn new(
        base: Box<dyn MediaEngine>,
        device: Option<Box<dyn HapticDevice>>,
        handler: Handler,
        sync_interval_ms: u64,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                base,
                device,
                haptics_available: false,
                was_paused: false,
                sync_task: None,
            })),
            handler,
            sync_interval_ms,
        }
    }

    /// Bind the haptic track
    ///
    /// Fails with an I/O error when the track is absent; the engine keeps
    /// working without haptics in that case.
    pub fn set_haptic_data_source(&mut self, path: Option<&Path>) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        inner.haptics_available = false;

        let path = match path {
            Some(p) if !p.as_os_str().is_empty() && p.exists() => p,
            _ => {
                debug!("Haptic track unavailable: {:?}", path);
                return Err(HapticPlayerError::FileIO(io::Error::new(
                    io::ErrorKind::NotFound,
                    "setHapticDataSource failed",
                )));
            }
        };

        let device = inner
            .device
            .as_deref_mut()
            .ok_or_else(|| HapticPlayerError::Haptics("no haptic device attached".to_string()))?;
        device.open(path)?;

        inner.haptics_available = true;
        debug!("Haptic track bound: {:?}", path);
        Ok(())
    }

    /// Whether haptic calls reach the device
    pub fn has_haptics(&self) -> bool {
        self.inner.borrow().haptics_available
    }

    /// Whether a sync tick is waiting on the looper
    pub fn is_syncing(&self) -> bool {
        self.inner
            .borrow()
            .sync_task
            .is_some_and(|task| self.handler.is_pending(task))
    }

    /// Render a one-shot effect by name
    ///
    /// Unknown names fall back to the default effect. Returns the effect
    /// played, or `None` when the channel is unavailable.
    pub fn play_effect(&mut self, name: &str) -> Option<HapticEffect> {
        let mut inner = self.inner.borrow_mut();
        if !inner.haptics_available {
            return None;
        }
        let effect = HapticEffect::resolve(name);
        inner.haptic("effect", |device| device.play_effect(effect));
        Some(effect)
    }

    /// Release the engine and drop the haptic channel
    pub fn release_all(&mut self) {
        let mut inner = self.inner.borrow_mut();
        if let Some(task) = inner.sync_task.take() {
            self.handler.remove(task);
        }

        inner.base.release();
        inner.device = None;
        inner.haptics_available = false;
    }

    fn start_sync(&self) {
        let mut inner = self.inner.borrow_mut();
        if let Some(task) = inner.sync_task.take() {
            self.handler.remove(task);
        }

        inner.sync_task = Some(post_sync(
            Rc::downgrade(&self.inner),
            self.handler.clone(),
            0,
            self.sync_interval_ms,
        ));
    }
}

fn post_sync(inner: Weak<RefCell<Inner>>, handler: Handler, delay_ms: u64, interval_ms: u64) -> TaskId {
    let next = handler.clone();
    handler.post_delayed(move || sync_tick(inner, next, interval_ms), delay_ms)
}

fn sync_tick(weak: Weak<RefCell<Inner>>, handler: Handler, interval_ms: u64) {
    let Some(inner) = weak.upgrade() else {
        return;
    };
    let mut inner = inner.borrow_mut();
    inner.sync_task = None;

    match inner.base.is_playing() {
        Ok(true) => {
            let position = inner.base.current_position();
            inner.haptic("update", |device| device.update(position));
            inner.sync_task = Some(post_sync(weak, handler, interval_ms, interval_ms));
        }
        Ok(false) => {}
        Err(e) => debug!("Haptic sync stopped: {}", e),
    }
}

impl MediaEngine for HapticMediaEngine {
    fn set_event_listener(&mut self, listener: EngineListener) {
        self.inner.borrow_mut().base.set_event_listener(listener);
    }

    fn set_data_source(&mut self, path: &Path) -> Result<()> {
        self.inner.borrow_mut().base.set_data_source(path)
    }

    fn set_display(&mut self, surface: Option<&Surface>) {
        self.inner.borrow_mut().base.set_display(surface);
    }

    fn set_screen_on_while_playing(&mut self, screen_on: bool) {
        self.inner.borrow_mut().base.set_screen_on_while_playing(screen_on);
    }

    fn prepare_async(&mut self) -> Result<()> {
        self.inner.borrow_mut().base.prepare_async()
    }

    fn start(&mut self) -> Result<()> {
        {
            let mut inner = self.inner.borrow_mut();
            inner.base.start()?;
            if !inner.haptics_available {
                return Ok(());
            }

            if inner.was_paused {
                inner.haptic("resume", |device| device.resume());
            } else {
                inner.haptic("play", |device| device.play());
            }
            inner.was_paused = false;
        }

        self.start_sync();
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        inner.base.pause()?;
        if inner.haptics_available {
            inner.was_paused = true;
            inner.haptic("pause", |device| device.pause());
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        inner.base.stop()?;
        inner.haptic("stop", |device| device.stop());
        Ok(())
    }

    fn seek_to(&mut self, position_ms: u64) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        inner.base.seek_to(position_ms)?;
        inner.haptic("seek", |device| device.seek(position_ms));
        Ok(())
    }

    fn is_playing(&self) -> Result<bool> {
        self.inner.borrow().base.is_playing()
    }

    fn current_position(&self) -> u64 {
        self.inner.borrow().base.current_position()
    }

    fn duration(&self) -> u64 {
        self.inner.borrow().base.duration()
    }

    fn video_size(&self) -> VideoSize {
        self.inner.borrow().base.video_size()
    }

    fn release(&mut self) {
        self.release_all();
    }
}
