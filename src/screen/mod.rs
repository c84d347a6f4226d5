//! Player screen for HapticPlayer
//!
//! The screen is the top of the stack: it validates the video it is launched
//! with, owns the playback manager and the shared state holder, forwards host
//! lifecycle events (surface, touch, background, back) and records the
//! position to resume from when it finishes.

use crate::engine::{EngineFactory, MediaPlayerControl, Surface};
use crate::looper::Handler;
use crate::player::{
    PlaybackManager, PlaybackState, ScreenEventHandler, SeekBarListener, StateHolder, VideoDescriptor,
};
use crate::utils::config::Config;
use crate::utils::error::{HapticPlayerError, Result};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Whether touches bring up the transport controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControllerMode {
    #[default]
    WithController,
    WithoutController,
}

struct ScreenInner {
    video: RefCell<VideoDescriptor>,
    state: Rc<StateHolder>,
    mode: ControllerMode,
    manager: PlaybackManager,
    finished: Cell<bool>,
}

impl ScreenInner {
    fn finish(&self) {
        if !self.finished.replace(true) {
            info!("Player screen finished at {}ms", self.video.borrow().elapsed_ms);
        }
    }

    fn on_completion(&self) {
        if self.state.is(PlaybackState::Paused) {
            return;
        }
        self.state.set(PlaybackState::PostPlayback);
        self.update_elapsed_time(0);
        self.finish();
    }
}

impl ScreenEventHandler for ScreenInner {
    fn back_pressed(&self) {
        self.update_elapsed_time(self.manager.current_position());
        self.finish();
    }

    fn update_elapsed_time(&self, elapsed_ms: u64) {
        self.video.borrow_mut().elapsed_ms = elapsed_ms;
    }
}

/// Full-screen video player
pub struct PlayerScreen {
    inner: Rc<ScreenInner>,
}

impl PlayerScreen {
    /// Open a screen for `video`
    ///
    /// Fails with [`HapticPlayerError::NotFound`] when the video file does not
    /// exist. Playback begins once the host supplies a surface.
    pub fn launch(
        video: VideoDescriptor,
        mode: ControllerMode,
        config: &Config,
        handler: Handler,
        factory: Box<dyn EngineFactory>,
    ) -> Result<Self> {
        if video.location.as_os_str().is_empty() || !video.location.is_file() {
            warn!("Invalid Video File: {:?}", video.location);
            return Err(HapticPlayerError::NotFound(format!(
                "Invalid Video File: {}",
                video.location.display()
            )));
        }

        let state = Rc::new(StateHolder::new());
        state.set(PlaybackState::Playing);

        let manager = PlaybackManager::new(handler, config, video.clone(), Rc::clone(&state), factory);
        let inner = Rc::new(ScreenInner {
            video: RefCell::new(video),
            state,
            mode,
            manager,
            finished: Cell::new(false),
        });

        let handler_rc: Rc<dyn ScreenEventHandler> = inner.clone();
        let events = Rc::downgrade(&handler_rc);
        inner.manager.set_event_handler(Some(events));

        let weak = Rc::downgrade(&inner);
        inner.manager.register_callback(
            Rc::new(move || {
                if let Some(screen) = weak.upgrade() {
                    screen.manager.show_controller(false);
                }
            }),
            false,
            config.playback.first_show_delay_ms,
        );

        let weak = Rc::downgrade(&inner);
        inner.manager.set_on_completion_listener(Some(Rc::new(move || {
            if let Some(screen) = weak.upgrade() {
                screen.on_completion();
            }
        })));
        inner
            .manager
            .set_on_error_listener(Some(Rc::new(|e: &HapticPlayerError| error!("Playback error: {}", e))));

        let seek_log: Rc<dyn SeekBarListener> = Rc::new(|position_ms: u64| debug!("Position {}ms", position_ms));
        inner.manager.set_seek_bar_listener(Some(seek_log));

        info!("Player screen launched: {:?} ({:?})", inner.video.borrow().title, mode);
        Ok(Self { inner })
    }

    pub fn surface_created(&self, surface: Surface) {
        self.inner.manager.surface_created(surface);
    }

    pub fn surface_changed(&self, surface: Surface, format: i32, width: u32, height: u32) {
        self.inner.manager.surface_changed(surface, format, width, height);
    }

    pub fn surface_destroyed(&self) {
        self.inner.manager.surface_destroyed();
    }

    /// The host moved the screen to the background
    pub fn on_pause(&self) {
        self.inner.manager.perform_pause();
    }

    /// A touch ended on the video area
    pub fn on_touch_up(&self) {
        if self.inner.mode == ControllerMode::WithController {
            self.inner.manager.show_controller(false);
        }
    }

    /// System back navigation
    pub fn on_back_pressed(&self) {
        self.inner.back_pressed();
    }

    /// Tear down playback; the screen is finished afterwards
    pub fn destroy(&self) {
        self.inner.manager.release();
        self.inner.finish();
    }

    pub fn is_finished(&self) -> bool {
        self.inner.finished.get()
    }

    /// The video with its elapsed time as last recorded
    pub fn video(&self) -> VideoDescriptor {
        self.inner.video.borrow().clone()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.inner.video.borrow().elapsed_ms
    }

    pub fn state(&self) -> Option<PlaybackState> {
        self.inner.state.get()
    }

    pub fn mode(&self) -> ControllerMode {
        self.inner.mode
    }

    pub fn manager(&self) -> &PlaybackManager {
        &self.inner.manager
    }
}
