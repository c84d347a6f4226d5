//! Transport controller overlay for HapticPlayer
//!
//! This module provides the on-screen transport controls: play/pause, a back
//! arrow, a title bar and a seek bar with elapsed/total time labels. The
//! overlay is modelled as plain view state ([`ControllerView`]) that a host
//! renders; all timing (auto-hide, fades, progress polling) runs as tasks on
//! the looper.

use crate::engine::MediaPlayerControl;
use crate::looper::{Handler, TaskId};
use crate::player::ScreenEventHandler;
use crate::utils::{clamp, format_time, ControllerConfig};
use log::{debug, trace};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Receives the playback position on every progress poll while playing
pub trait SeekBarListener {
    fn on_seek(&self, position_ms: u64);
}

impl<F: Fn(u64)> SeekBarListener for F {
    fn on_seek(&self, position_ms: u64) {
        self(position_ms)
    }
}

/// Glyph shown on the play/pause button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayPauseIcon {
    Play,
    Pause,
}

/// Clickable buttons on the overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlButton {
    PlayPause,
    BackArrow,
}

/// Keys the controller reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    HeadsetHook,
    MediaPlayPause,
    Space,
    MediaPlay,
    MediaPause,
    MediaStop,
    VolumeUp,
    VolumeDown,
    VolumeMute,
    Back,
    Menu,
    Other(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Down,
    Up,
}

/// A key press delivered to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub action: KeyAction,
    pub repeat_count: u32,
}

impl KeyEvent {
    /// First key-down of a press
    pub fn down(code: KeyCode) -> Self {
        Self {
            code,
            action: KeyAction::Down,
            repeat_count: 0,
        }
    }

    fn is_unique_down(&self) -> bool {
        self.action == KeyAction::Down && self.repeat_count == 0
    }
}

/// Renderable state of the overlay
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerView {
    /// Whether the overlay is attached to the anchor
    pub attached: bool,
    pub alpha: f32,
    pub title: String,
    pub title_bar_visible: bool,
    pub play_pause_icon: PlayPauseIcon,
    pub play_pause_visible: bool,
    pub play_pause_enabled: bool,
    pub seek_bar_enabled: bool,
    /// Seek bar position in `0..=progress_max`
    pub progress: u32,
    pub secondary_progress: u32,
    pub current_time: String,
    pub end_time: String,
}

impl Default for ControllerView {
    fn default() -> Self {
        Self {
            attached: false,
            alpha: 0.0,
            title: String::new(),
            title_bar_visible: true,
            play_pause_icon: PlayPauseIcon::Play,
            play_pause_visible: true,
            play_pause_enabled: true,
            seek_bar_enabled: true,
            progress: 0,
            secondary_progress: 0,
            current_time: format_time(0),
            end_time: format_time(0),
        }
    }
}

/// Seek bar value for a position, in `0..=max`
pub fn progress_for(position_ms: u64, duration_ms: u64, max: u32) -> u32 {
    if duration_ms == 0 {
        return 0;
    }
    let progress = max as u64 * position_ms.min(duration_ms) / duration_ms;
    progress as u32
}

/// Position a seek bar value maps to
pub fn position_for(progress: u32, duration_ms: u64, max: u32) -> u64 {
    if max == 0 {
        return 0;
    }
    duration_ms * progress.min(max) as u64 / max as u64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fade {
    Idle,
    Out(TaskId),
    In(TaskId),
}

#[derive(Debug)]
struct State {
    view: ControllerView,
    anchored: bool,
    showing: bool,
    dragging: bool,
    paused_for_seek: bool,
    fade: Fade,
    fade_out_timer: Option<TaskId>,
    progress_task: Option<TaskId>,
}

struct Inner {
    handler: Handler,
    config: ControllerConfig,
    player: RefCell<Option<Weak<dyn MediaPlayerControl>>>,
    event_handler: RefCell<Option<Weak<dyn ScreenEventHandler>>>,
    seek_bar_listener: RefCell<Option<Rc<dyn SeekBarListener>>>,
    state: RefCell<State>,
}

/// Transport controller overlay
///
/// Cloning yields another handle to the same overlay. No internal borrow is
/// held while the player is called, so the player may call straight back in.
#[derive(Clone)]
pub struct TransportController {
    inner: Rc<Inner>,
}

impl TransportController {
    pub fn new(handler: Handler, config: ControllerConfig) -> Self {
        Self {
            inner: Rc::new(Inner {
                handler,
                config,
                player: RefCell::new(None),
                event_handler: RefCell::new(None),
                seek_bar_listener: RefCell::new(None),
                state: RefCell::new(State {
                    view: ControllerView::default(),
                    anchored: false,
                    showing: false,
                    dragging: false,
                    paused_for_seek: false,
                    fade: Fade::Idle,
                    fade_out_timer: None,
                    progress_task: None,
                }),
            }),
        }
    }

    pub fn set_media_player(&self, player: Weak<dyn MediaPlayerControl>) {
        *self.inner.player.borrow_mut() = Some(player);
        self.update_pause_play();
    }

    pub fn set_event_handler(&self, handler: Option<Weak<dyn ScreenEventHandler>>) {
        *self.inner.event_handler.borrow_mut() = handler;
    }

    pub fn set_seek_bar_listener(&self, listener: Option<Rc<dyn SeekBarListener>>) {
        *self.inner.seek_bar_listener.borrow_mut() = listener;
    }

    pub fn set_title(&self, title: &str) {
        self.inner.state.borrow_mut().view.title = title.to_string();
    }

    /// Anchor the overlay to the video view; nothing shows before this
    pub fn attach(&self) {
        self.inner.state.borrow_mut().anchored = true;
        self.update_pause_play();
    }

    /// Snapshot of the overlay for rendering
    pub fn view(&self) -> ControllerView {
        self.inner.state.borrow().view.clone()
    }

    /// Whether the overlay is on screen, including while it fades
    pub fn is_showing(&self) -> bool {
        self.inner.state.borrow().showing
    }

    pub fn is_dragging(&self) -> bool {
        self.inner.state.borrow().dragging
    }

    /// Whether an auto-hide is pending
    pub fn is_fade_out_scheduled(&self) -> bool {
        self.inner
            .state
            .borrow()
            .fade_out_timer
            .is_some_and(|task| self.inner.handler.is_pending(task))
    }

    /// Show with the default auto-hide timeout
    pub fn show(&self) {
        self.show_for(self.inner.config.default_timeout_ms);
    }

    /// Show the overlay, hiding it after `timeout_ms`
    ///
    /// A timeout of 0 keeps it up until `hide`. No auto-hide is scheduled when
    /// the media is within the near-end threshold.
    pub fn show_for(&self, timeout_ms: u64) {
        let attach = {
            let mut state = self.inner.state.borrow_mut();
            if !state.anchored {
                return;
            }
            if state.showing {
                false
            } else {
                state.showing = true;
                state.view.attached = true;
                state.view.alpha = 1.0;
                true
            }
        };

        if attach {
            debug!("Controller attached");
            self.set_progress();
            self.disable_unsupported_buttons();
        }

        self.update_pause_play();
        self.schedule_progress(0);

        let interrupted = {
            let mut state = self.inner.state.borrow_mut();
            match state.fade {
                Fade::Out(task) => {
                    state.fade = Fade::Idle;
                    Some(task)
                }
                _ => None,
            }
        };
        if let Some(task) = interrupted {
            self.inner.handler.remove(task);
            self.fade_in();
        }

        self.cancel_fade_out_timer();
        if timeout_ms > 0 && self.has_remaining_time() {
            let weak = Rc::downgrade(&self.inner);
            let task = self.inner.handler.post_delayed(
                move || {
                    if let Some(inner) = weak.upgrade() {
                        let controller = TransportController { inner };
                        controller.inner.state.borrow_mut().fade_out_timer = None;
                        controller.hide();
                    }
                },
                timeout_ms,
            );
            self.inner.state.borrow_mut().fade_out_timer = Some(task);
        }
    }

    /// Fade the overlay out and detach it
    pub fn hide(&self) {
        let mut state = self.inner.state.borrow_mut();
        if !state.anchored || !state.showing || matches!(state.fade, Fade::Out(_)) {
            return;
        }
        if let Fade::In(task) = state.fade {
            self.inner.handler.remove(task);
        }

        let weak = Rc::downgrade(&self.inner);
        let task = self.inner.handler.post_delayed(
            move || {
                if let Some(inner) = weak.upgrade() {
                    TransportController { inner }.finish_fade_out();
                }
            },
            self.inner.config.fade_out_ms,
        );
        state.fade = Fade::Out(task);
        trace!("Controller fading out");
    }

    pub fn hide_play_pause(&self) {
        self.inner.state.borrow_mut().view.play_pause_visible = false;
    }

    pub fn show_play_pause(&self) {
        self.inner.state.borrow_mut().view.play_pause_visible = true;
    }

    pub fn set_enabled(&self, enabled: bool) {
        {
            let mut state = self.inner.state.borrow_mut();
            state.view.play_pause_enabled = enabled;
            state.view.seek_bar_enabled = enabled;
        }
        self.disable_unsupported_buttons();
    }

    pub fn on_click(&self, button: ControlButton) {
        match button {
            ControlButton::PlayPause => {
                self.do_pause_resume();
                self.show();
            }
            ControlButton::BackArrow => {
                let position = self.player().map(|p| p.current_position()).unwrap_or(0);
                let handler = self.inner.event_handler.borrow().as_ref().and_then(Weak::upgrade);
                if let Some(handler) = handler {
                    handler.update_elapsed_time(position);
                    handler.back_pressed();
                }
            }
        }
    }

    /// Handle a key press; returns whether the key was consumed
    pub fn dispatch_key(&self, event: KeyEvent) -> bool {
        let Some(player) = self.player() else {
            return true;
        };
        let unique_down = event.is_unique_down();

        match event.code {
            KeyCode::HeadsetHook | KeyCode::MediaPlayPause | KeyCode::Space => {
                if unique_down {
                    self.do_pause_resume();
                    self.show();
                }
                true
            }
            KeyCode::MediaPlay => {
                if unique_down && !player.is_playing() {
                    player.start();
                    self.update_pause_play();
                    self.show();
                }
                true
            }
            KeyCode::MediaStop | KeyCode::MediaPause => {
                if unique_down && player.is_playing() {
                    player.pause();
                    self.update_pause_play();
                    self.show();
                }
                true
            }
            KeyCode::VolumeUp | KeyCode::VolumeDown | KeyCode::VolumeMute => false,
            KeyCode::Back | KeyCode::Menu => {
                if unique_down {
                    self.hide();
                }
                true
            }
            KeyCode::Other(_) => {
                self.show();
                false
            }
        }
    }

    /// Trackball nudge
    pub fn on_trackball_event(&self) {
        self.show();
    }

    /// The user grabbed the seek bar
    pub fn on_start_tracking_touch(&self) {
        self.show_for(self.inner.config.scrub_hold_timeout_ms);

        if let Some(player) = self.player() {
            if player.is_playing() {
                player.pause();
                self.inner.state.borrow_mut().paused_for_seek = true;
            }
        }

        let progress_task = {
            let mut state = self.inner.state.borrow_mut();
            state.dragging = true;
            state.progress_task.take()
        };
        if let Some(task) = progress_task {
            self.inner.handler.remove(task);
        }
    }

    /// The seek bar moved to `progress`
    pub fn on_progress_changed(&self, progress: u32, from_user: bool) {
        if !from_user {
            return;
        }
        let Some(player) = self.player() else {
            return;
        };

        let max = self.inner.config.progress_max;
        let progress = clamp(progress, 0, max);
        let position = position_for(progress, player.duration(), max);
        player.seek_to(position);

        let mut state = self.inner.state.borrow_mut();
        state.view.progress = progress;
        state.view.current_time = format_time(position);
    }

    /// The user let go of the seek bar
    pub fn on_stop_tracking_touch(&self) {
        self.inner.state.borrow_mut().dragging = false;
        let Some(player) = self.player() else {
            return;
        };

        self.set_progress();
        self.update_pause_play();

        let resume = std::mem::take(&mut self.inner.state.borrow_mut().paused_for_seek);
        if resume {
            player.start();
        }
        if player.is_playing() && self.has_remaining_time() {
            self.show();
        }
        self.schedule_progress(0);
    }

    fn player(&self) -> Option<Rc<dyn MediaPlayerControl>> {
        self.inner.player.borrow().as_ref().and_then(Weak::upgrade)
    }

    fn has_remaining_time(&self) -> bool {
        self.player().is_some_and(|player| {
            player.duration().saturating_sub(player.current_position())
                > self.inner.config.near_end_threshold_ms
        })
    }

    fn do_pause_resume(&self) {
        let Some(player) = self.player() else {
            return;
        };
        if player.is_playing() {
            player.pause();
        } else {
            player.start();
        }
        self.update_pause_play();
    }

    fn update_pause_play(&self) {
        if !self.inner.state.borrow().anchored {
            return;
        }
        let Some(player) = self.player() else {
            return;
        };
        let playing = player.is_playing();

        let mut state = self.inner.state.borrow_mut();
        if playing {
            state.view.play_pause_icon = PlayPauseIcon::Pause;
            state.view.title_bar_visible = false;
        } else {
            state.view.play_pause_icon = PlayPauseIcon::Play;
            state.view.title_bar_visible = true;
        }
    }

    fn disable_unsupported_buttons(&self) {
        if let Some(player) = self.player() {
            if !player.can_pause() {
                self.inner.state.borrow_mut().view.play_pause_enabled = false;
            }
        }
    }

    /// Refresh the seek bar and time labels; returns the position read
    fn set_progress(&self) -> u64 {
        let Some(player) = self.player() else {
            return 0;
        };
        if self.inner.state.borrow().dragging {
            return 0;
        }

        let position = player.current_position();
        let duration = player.duration();
        let percent = player.buffer_percentage().min(100);
        let max = self.inner.config.progress_max;

        let mut state = self.inner.state.borrow_mut();
        if duration > 0 {
            state.view.progress = progress_for(position, duration, max);
        }
        state.view.secondary_progress = (u64::from(percent) * u64::from(max) / 100) as u32;
        state.view.end_time = format_time(duration);
        state.view.current_time = format_time(position);
        position
    }

    fn schedule_progress(&self, delay_ms: u64) {
        let previous = self.inner.state.borrow_mut().progress_task.take();
        if let Some(task) = previous {
            self.inner.handler.remove(task);
        }

        let weak = Rc::downgrade(&self.inner);
        let task = self.inner.handler.post_delayed(
            move || {
                if let Some(inner) = weak.upgrade() {
                    TransportController { inner }.on_progress_tick();
                }
            },
            delay_ms,
        );
        self.inner.state.borrow_mut().progress_task = Some(task);
    }

    fn on_progress_tick(&self) {
        {
            let mut state = self.inner.state.borrow_mut();
            state.progress_task = None;
            if !state.view.attached {
                return;
            }
        }
        let Some(player) = self.player() else {
            return;
        };

        let position = self.set_progress();
        let dragging = self.inner.state.borrow().dragging;
        if !dragging && player.is_playing() {
            self.schedule_progress(self.inner.config.progress_interval_ms);
            let listener = self.inner.seek_bar_listener.borrow().clone();
            if let Some(listener) = listener {
                listener.on_seek(position);
            }
        }
    }

    fn cancel_fade_out_timer(&self) {
        let timer = self.inner.state.borrow_mut().fade_out_timer.take();
        if let Some(task) = timer {
            self.inner.handler.remove(task);
        }
    }

    fn fade_in(&self) {
        let weak = Rc::downgrade(&self.inner);
        let task = self.inner.handler.post_delayed(
            move || {
                if let Some(inner) = weak.upgrade() {
                    let mut state = inner.state.borrow_mut();
                    state.fade = Fade::Idle;
                    state.showing = true;
                    state.view.alpha = 1.0;
                }
            },
            self.inner.config.fade_in_ms,
        );
        self.inner.state.borrow_mut().fade = Fade::In(task);
        trace!("Controller fading in");
    }

    fn finish_fade_out(&self) {
        let (progress_task, timer) = {
            let mut state = self.inner.state.borrow_mut();
            state.fade = Fade::Idle;
            state.showing = false;
            state.view.attached = false;
            state.view.alpha = 0.0;
            (state.progress_task.take(), state.fade_out_timer.take())
        };
        for task in progress_task.into_iter().chain(timer) {
            self.inner.handler.remove(task);
        }
        debug!("Controller detached");
    }
}
