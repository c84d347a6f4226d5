//! Playback manager for HapticPlayer
//!
//! The manager owns the media engine for one screen. It creates the engine
//! when a display surface appears, releases it when the surface goes away,
//! and restores position and play/pause state on the next surface. It is
//! also the [`MediaPlayerControl`] the transport controller drives, and the
//! receiver of audio-focus and call-state interrupts.

use crate::engine::{EngineEvent, EngineFactory, EngineListener, MediaEngine, MediaPlayerControl, Surface};
use crate::haptics::{HapticEffect, HapticMediaEngine};
use crate::looper::Handler;
use crate::player::layout::{fit_to_screen, DisplayMetrics, VideoLayout};
use crate::player::tasks::{ScheduledTask, TaskCallback, TaskRegistry};
use crate::player::{
    PlaybackState, ScreenEventHandler, SeekBarListener, StateHolder, TransportController, VideoDescriptor,
};
use crate::utils::config::{Config, ControllerConfig, HapticsConfig, PlaybackConfig};
use crate::utils::error::HapticPlayerError;
use log::{debug, error, info, warn};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Audio focus changes reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFocusChange {
    Gain,
    Loss,
    LossTransient,
    LossTransientCanDuck,
}

/// Telephony call state reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Idle,
    Ringing,
    OffHook,
}

/// Receiver for engine and data-source errors
pub type ErrorListener = Rc<dyn Fn(&HapticPlayerError)>;

/// Receiver for end-of-media
pub type CompletionListener = Rc<dyn Fn()>;

struct Inner {
    handler: Handler,
    controller_config: ControllerConfig,
    playback_config: PlaybackConfig,
    haptics_config: HapticsConfig,
    video: VideoDescriptor,
    state: Rc<StateHolder>,
    factory: Box<dyn EngineFactory>,

    engine: RefCell<Option<HapticMediaEngine>>,
    controller: RefCell<Option<TransportController>>,
    surface: RefCell<Option<Surface>>,
    layout: Cell<Option<VideoLayout>>,

    /// Position saved when the surface goes away, restored on the next one
    cached_position_ms: Cell<u64>,
    prepared: Cell<bool>,
    keep_play_pause_hidden: Cell<bool>,
    interrupts_registered: Cell<bool>,
    tasks: RefCell<TaskRegistry>,

    seek_bar_listener: RefCell<Option<Rc<dyn SeekBarListener>>>,
    error_listener: RefCell<Option<ErrorListener>>,
    completion_listener: RefCell<Option<CompletionListener>>,
    event_handler: RefCell<Option<Weak<dyn ScreenEventHandler>>>,
}

/// Drives one screen's media engine through the surface lifecycle
///
/// Cloning yields another handle to the same manager.
#[derive(Clone)]
pub struct PlaybackManager {
    inner: Rc<Inner>,
}

impl PlaybackManager {
    /// Create a manager for `video`
    ///
    /// # Arguments
    ///
    /// * `handler` - Looper every engine, controller and scheduled task runs on
    /// * `config` - Controller, display and haptics settings
    /// * `video` - Video to play; its elapsed time is the initial resume point
    /// * `state` - State holder shared with the owning screen
    /// * `factory` - Source of engines and haptic devices
    pub fn new(
        handler: Handler,
        config: &Config,
        video: VideoDescriptor,
        state: Rc<StateHolder>,
        factory: Box<dyn EngineFactory>,
    ) -> Self {
        let tasks = TaskRegistry::new(handler.clone());
        Self {
            inner: Rc::new(Inner {
                handler,
                controller_config: config.controller.clone(),
                playback_config: config.playback.clone(),
                haptics_config: config.haptics.clone(),
                cached_position_ms: Cell::new(video.elapsed_ms),
                video,
                state,
                factory,
                engine: RefCell::new(None),
                controller: RefCell::new(None),
                surface: RefCell::new(None),
                layout: Cell::new(None),
                prepared: Cell::new(false),
                keep_play_pause_hidden: Cell::new(false),
                interrupts_registered: Cell::new(false),
                tasks: RefCell::new(tasks),
                seek_bar_listener: RefCell::new(None),
                error_listener: RefCell::new(None),
                completion_listener: RefCell::new(None),
                event_handler: RefCell::new(None),
            }),
        }
    }

    /// A display surface became available
    pub fn surface_created(&self, surface: Surface) {
        self.inner.surface_created(surface);
    }

    /// The surface changed format or size
    pub fn surface_changed(&self, surface: Surface, format: i32, width: u32, height: u32) {
        debug!("Surface changed: format {} {}x{}", format, width, height);
        self.inner.surface_changed(surface);
    }

    /// The surface went away; the engine is released
    pub fn surface_destroyed(&self) {
        self.inner.surface_destroyed();
    }

    /// System-initiated pause, e.g. the screen went to the background
    ///
    /// The state becomes [`PlaybackState::Paused`], which the next prepared
    /// surface resumes from on its own.
    pub fn perform_pause(&self) {
        let inner = &self.inner;
        if !inner.prepared.get() {
            return;
        }
        if inner.state.is(PlaybackState::Playing) {
            inner.state.set(PlaybackState::Paused);
        }
        inner.pause_engine_only();
    }

    pub fn show_controller(&self, indefinitely: bool) {
        self.inner.show_controller(indefinitely);
    }

    pub fn is_controller_shown(&self) -> bool {
        self.inner.is_controller_shown()
    }

    /// Hide the play/pause button; with `keep_hidden` it stays hidden across
    /// starts until the next seek
    pub fn hide_play_pause(&self, keep_hidden: bool) {
        self.inner.hide_play_pause(keep_hidden);
    }

    pub fn on_audio_focus_change(&self, change: AudioFocusChange) {
        if !self.inner.interrupts_registered.get() {
            return;
        }
        match change {
            AudioFocusChange::Loss | AudioFocusChange::LossTransient => {
                info!("Audio focus lost ({:?}), pausing", change);
                self.inner.pause_engine_only();
            }
            AudioFocusChange::Gain | AudioFocusChange::LossTransientCanDuck => {}
        }
    }

    pub fn on_call_state_changed(&self, state: CallState) {
        if !self.inner.interrupts_registered.get() {
            return;
        }
        match state {
            CallState::Ringing | CallState::OffHook => {
                info!("Call state {:?}, pausing", state);
                self.inner.pause_engine_only();
            }
            CallState::Idle => {}
        }
    }

    /// Register a callback that fires once per session
    ///
    /// `at_ms` counts playing time from the start of the session, or media
    /// time back from the end when `before_end`. Callbacks only advance
    /// while the media plays.
    pub fn register_callback(&self, callback: TaskCallback, before_end: bool, at_ms: u64) {
        self.inner
            .tasks
            .borrow_mut()
            .register(ScheduledTask::new(callback, before_end, at_ms));
        self.inner.arm_tasks();
    }

    /// Cancel every armed callback and forget all registrations
    pub fn unregister_all_callbacks(&self) {
        self.inner.tasks.borrow_mut().unregister_all();
    }

    pub fn set_seek_bar_listener(&self, listener: Option<Rc<dyn SeekBarListener>>) {
        let controller = self.inner.controller();
        if let Some(controller) = controller {
            controller.set_seek_bar_listener(listener.clone());
        }
        *self.inner.seek_bar_listener.borrow_mut() = listener;
    }

    pub fn set_on_error_listener(&self, listener: Option<ErrorListener>) {
        *self.inner.error_listener.borrow_mut() = listener;
    }

    pub fn set_on_completion_listener(&self, listener: Option<CompletionListener>) {
        *self.inner.completion_listener.borrow_mut() = listener;
    }

    pub fn set_event_handler(&self, handler: Option<Weak<dyn ScreenEventHandler>>) {
        let controller = self.inner.controller();
        if let Some(controller) = controller {
            controller.set_event_handler(handler.clone());
        }
        *self.inner.event_handler.borrow_mut() = handler;
    }

    /// Transport controller, once the first preparation created it
    pub fn controller(&self) -> Option<TransportController> {
        self.inner.controller()
    }

    pub fn is_prepared(&self) -> bool {
        self.inner.prepared.get()
    }

    pub fn has_engine(&self) -> bool {
        self.inner.engine.borrow().is_some()
    }

    /// Whether the engine's haptic channel is live
    pub fn has_haptics(&self) -> bool {
        self.inner.engine.borrow().as_ref().is_some_and(|e| e.has_haptics())
    }

    /// Play a one-shot haptic effect by name; unknown names use the default
    pub fn play_haptic_effect(&self, name: &str) -> Option<HapticEffect> {
        self.inner.engine.borrow_mut().as_mut().and_then(|e| e.play_effect(name))
    }

    pub fn video_layout(&self) -> Option<VideoLayout> {
        self.inner.layout.get()
    }

    pub fn state(&self) -> Option<PlaybackState> {
        self.inner.state.get()
    }

    /// Tear down: cancel callbacks and release the engine
    pub fn release(&self) {
        self.unregister_all_callbacks();
        if self.has_engine() {
            self.inner.surface_destroyed();
        }
        let controller = self.inner.controller.borrow_mut().take();
        if let Some(controller) = controller {
            controller.hide();
        }
    }
}

impl MediaPlayerControl for PlaybackManager {
    fn start(&self) {
        self.inner.start();
    }

    fn pause(&self) {
        self.inner.pause();
    }

    fn duration(&self) -> u64 {
        self.inner.duration()
    }

    fn current_position(&self) -> u64 {
        self.inner.current_position()
    }

    fn seek_to(&self, position_ms: u64) {
        self.inner.seek_to(position_ms);
    }

    fn buffer_percentage(&self) -> u32 {
        self.inner.buffer_percentage()
    }

    fn is_playing(&self) -> bool {
        self.inner.is_playing()
    }

    fn can_pause(&self) -> bool {
        self.inner.can_pause()
    }
}

impl Inner {
    fn controller(&self) -> Option<TransportController> {
        self.controller.borrow().clone()
    }

    fn surface_created(self: &Rc<Self>, surface: Surface) {
        if self.engine.borrow().is_some() {
            debug!("Surface {} created while an engine exists, ignoring", surface.id);
            return;
        }

        let base = self.factory.create_engine();
        let device = if self.video.haptics_enabled && self.haptics_config.enabled {
            self.factory.create_haptic_device()
        } else {
            None
        };
        let mut engine =
            HapticMediaEngine::new(base, device, self.handler.clone(), self.haptics_config.sync_interval_ms);
        engine.set_event_listener(self.engine_listener());

        let bound = match engine.set_data_source(&self.video.location) {
            Ok(()) => true,
            Err(e) => {
                error!("Cannot open {:?}: {}", self.video.location, e);
                self.report_error(&e);
                false
            }
        };

        if let Err(e) = engine.set_haptic_data_source(self.video.haptic_path.as_deref()) {
            debug!("Playing without haptics: {}", e);
        }

        engine.set_display(Some(&surface));
        engine.set_screen_on_while_playing(true);

        if bound && !self.prepared.get() {
            if let Err(e) = engine.prepare_async() {
                error!("Preparation failed: {}", e);
                self.report_error(&e);
            }
        }

        info!("Surface {} created ({}x{})", surface.id, surface.width, surface.height);
        *self.surface.borrow_mut() = Some(surface);
        *self.engine.borrow_mut() = Some(engine);
    }

    fn engine_listener(self: &Rc<Self>) -> EngineListener {
        let weak = Rc::downgrade(self);
        Rc::new(move |event: EngineEvent| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            match event {
                EngineEvent::Prepared => inner.on_prepared(),
                EngineEvent::Completed => {
                    let listener = inner.completion_listener.borrow().clone();
                    if let Some(listener) = listener {
                        listener();
                    }
                }
                EngineEvent::Error(message) => {
                    error!("Engine error: {}", message);
                    inner.report_error(&HapticPlayerError::Engine(message));
                }
            }
        })
    }

    fn report_error(&self, err: &HapticPlayerError) {
        let listener = self.error_listener.borrow().clone();
        if let Some(listener) = listener {
            listener(err);
        }
    }

    fn on_prepared(self: &Rc<Self>) {
        self.prepared.set(true);

        let size = self.engine.borrow().as_ref().map(|e| e.video_size()).unwrap_or_default();
        let display = DisplayMetrics {
            width: self.playback_config.display_width,
            height: self.playback_config.display_height,
        };
        let layout = fit_to_screen(size, display);
        info!(
            "Prepared {}x{} video, laid out at {}x{}+{}+{}",
            size.width, size.height, layout.width, layout.height, layout.x, layout.y
        );
        self.layout.set(Some(layout));

        match self.controller() {
            Some(controller) => controller.show(),
            None => self.init_controller(),
        }

        let cached = self.cached_position_ms.get();
        if cached > 0 {
            debug!("Restoring position {}ms", cached);
            self.seek_to(cached);
        }

        if self.state.is(PlaybackState::Paused) || self.is_playing() {
            self.start();
        }
    }

    fn init_controller(self: &Rc<Self>) {
        let controller = TransportController::new(self.handler.clone(), self.controller_config.clone());
        let player_rc: Rc<dyn MediaPlayerControl> = self.clone();
        let player = Rc::downgrade(&player_rc);
        controller.set_media_player(player);
        controller.set_seek_bar_listener(self.seek_bar_listener.borrow().clone());
        controller.set_event_handler(self.event_handler.borrow().clone());
        controller.set_title(&self.video.title);
        controller.attach();

        *self.controller.borrow_mut() = Some(controller);
        self.interrupts_registered.set(true);
        debug!("Transport controller created, interrupts registered");
    }

    fn surface_changed(&self, surface: Surface) {
        if !self.prepared.get() {
            return;
        }
        if let Some(engine) = self.engine.borrow_mut().as_mut() {
            engine.set_display(Some(&surface));
        }
        *self.surface.borrow_mut() = Some(surface);

        if self.state.is(PlaybackState::Paused) {
            self.start();
        }
    }

    fn surface_destroyed(&self) {
        let position = self.current_position();
        self.cached_position_ms.set(position);
        self.tasks.borrow_mut().disarm();

        let engine = self.engine.borrow_mut().take();
        if let Some(mut engine) = engine {
            engine.release_all();
        }

        self.prepared.set(false);
        self.interrupts_registered.set(false);
        *self.surface.borrow_mut() = None;
        info!("Surface destroyed at {}ms, engine released", position);
    }

    fn pause_engine_only(&self) {
        if let Some(engine) = self.engine.borrow_mut().as_mut() {
            if matches!(engine.is_playing(), Ok(true)) {
                if let Err(e) = engine.pause() {
                    warn!("Pause failed: {}", e);
                }
            }
        }
        self.tasks.borrow_mut().disarm();
    }

    fn engine_playing(&self) -> bool {
        self.engine
            .borrow()
            .as_ref()
            .is_some_and(|engine| matches!(engine.is_playing(), Ok(true)))
    }

    /// Place scheduled callbacks against the position playback runs from
    fn arm_tasks(&self) {
        if !self.engine_playing() {
            return;
        }
        let (position, duration) = (self.current_position(), self.duration());
        self.tasks.borrow_mut().arm(position, duration);
    }

    fn show_controller(&self, indefinitely: bool) {
        let Some(controller) = self.controller() else {
            return;
        };
        if !indefinitely && self.is_playing() {
            controller.show();
        } else {
            controller.show_for(0);
        }
    }

    fn is_controller_shown(&self) -> bool {
        self.controller().is_some_and(|c| c.is_showing())
    }

    fn hide_play_pause(&self, keep_hidden: bool) {
        if let Some(controller) = self.controller() {
            controller.hide_play_pause();
        }
        self.keep_play_pause_hidden.set(keep_hidden);
    }
}

impl MediaPlayerControl for Inner {
    fn start(&self) {
        if self.engine.borrow().is_none() {
            return;
        }
        self.state.set(PlaybackState::Playing);

        if self.is_controller_shown() {
            self.show_controller(false);
        }
        if self.keep_play_pause_hidden.get() {
            self.hide_play_pause(true);
        }

        if let Some(engine) = self.engine.borrow_mut().as_mut() {
            if let Err(e) = engine.start() {
                warn!("Start failed: {}", e);
            }
        }
        self.arm_tasks();
    }

    fn pause(&self) {
        if self.engine.borrow().is_none() {
            return;
        }
        self.state.set(PlaybackState::ManuallyPaused);

        if let Some(engine) = self.engine.borrow_mut().as_mut() {
            if let Err(e) = engine.pause() {
                warn!("Pause failed: {}", e);
            }
        }
        self.tasks.borrow_mut().disarm();

        if let Some(controller) = self.controller() {
            controller.show_play_pause();
        }
        self.show_controller(true);
    }

    fn duration(&self) -> u64 {
        if self.controller.borrow().is_none() {
            return 0;
        }
        self.engine.borrow().as_ref().map_or(0, |e| e.duration())
    }

    fn current_position(&self) -> u64 {
        match self.engine.borrow().as_ref() {
            Some(engine) => engine.current_position(),
            None => self.cached_position_ms.get(),
        }
    }

    fn seek_to(&self, position_ms: u64) {
        self.keep_play_pause_hidden.set(false);
        if let Some(engine) = self.engine.borrow_mut().as_mut() {
            if let Err(e) = engine.seek_to(position_ms) {
                warn!("Seek to {}ms failed: {}", position_ms, e);
            }
        }
        self.arm_tasks();
    }

    fn buffer_percentage(&self) -> u32 {
        0
    }

    fn is_playing(&self) -> bool {
        self.state.is(PlaybackState::Playing)
    }

    fn can_pause(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SimulatedEngineFactory;
    use crate::looper::Looper;
    use crate::utils::config::EngineConfig;
    use tempfile::NamedTempFile;

    struct Fixture {
        looper: Looper,
        state: Rc<StateHolder>,
        manager: PlaybackManager,
        _media: NamedTempFile,
    }

    fn fixture(elapsed_ms: u64) -> Fixture {
        let looper = Looper::new();
        let media = NamedTempFile::new().unwrap();
        let video = VideoDescriptor::new("Clip", media.path()).with_elapsed(elapsed_ms);
        let state = Rc::new(StateHolder::new());
        state.set(PlaybackState::Playing);

        let factory = SimulatedEngineFactory::new(looper.handler(), EngineConfig::default(), false);
        let manager = PlaybackManager::new(
            looper.handler(),
            &Config::default(),
            video,
            Rc::clone(&state),
            Box::new(factory),
        );

        Fixture {
            looper,
            state,
            manager,
            _media: media,
        }
    }

    fn surface() -> Surface {
        Surface::new(1, 1920, 1080)
    }

    #[tokio::test(start_paused = true)]
    async fn test_prepare_starts_playback_and_shows_controller() {
        let f = fixture(0);
        f.manager.surface_created(surface());
        assert!(f.manager.has_engine());
        assert!(!f.manager.is_prepared());
        assert_eq!(f.manager.duration(), 0);

        f.looper.advance(150).await;
        assert!(f.manager.is_prepared());
        assert!(f.manager.is_playing());
        assert!(!f.manager.is_controller_shown());
        f.manager.show_controller(false);
        assert!(f.manager.is_controller_shown());
        assert_eq!(f.manager.duration(), 60_000);
        assert_eq!(
            f.manager.video_layout(),
            Some(VideoLayout {
                width: 1920,
                height: 1080,
                x: 0,
                y: 0
            })
        );

        f.looper.advance(5_000).await;
        assert_eq!(f.manager.current_position(), 5_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_time_is_restored_on_prepare() {
        let f = fixture(30_000);
        assert_eq!(f.manager.current_position(), 30_000);

        f.manager.surface_created(surface());
        f.looper.advance(150).await;
        assert_eq!(f.manager.current_position(), 30_000);
        f.looper.advance(1_000).await;
        assert_eq!(f.manager.current_position(), 31_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_surface_created_is_ignored() {
        let f = fixture(0);
        f.manager.surface_created(surface());
        f.looper.advance(1_150).await;
        let position = f.manager.current_position();

        f.manager.surface_created(Surface::new(2, 1920, 1080));
        f.looper.advance(500).await;
        assert!(f.manager.is_prepared());
        assert_eq!(f.manager.current_position(), position + 500);
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_pause_resumes_on_new_surface() {
        let f = fixture(0);
        f.manager.surface_created(surface());
        f.looper.advance(2_150).await;

        f.manager.perform_pause();
        assert_eq!(f.state.get(), Some(PlaybackState::Paused));
        f.manager.surface_destroyed();
        assert!(!f.manager.has_engine());
        assert_eq!(f.manager.current_position(), 2_000);

        f.looper.advance(10_000).await;
        f.manager.surface_created(surface());
        f.looper.advance(150).await;

        assert_eq!(f.state.get(), Some(PlaybackState::Playing));
        assert_eq!(f.manager.current_position(), 2_000);
        f.looper.advance(1_000).await;
        assert_eq!(f.manager.current_position(), 3_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_pause_survives_background() {
        let f = fixture(0);
        f.manager.surface_created(surface());
        f.looper.advance(1_150).await;

        f.manager.pause();
        assert_eq!(f.state.get(), Some(PlaybackState::ManuallyPaused));
        assert!(f.manager.is_controller_shown());
        assert!(!f.manager.controller().unwrap().is_fade_out_scheduled());

        f.manager.perform_pause();
        f.manager.surface_destroyed();
        f.manager.surface_created(surface());
        f.looper.advance(150).await;
        f.manager.surface_changed(surface(), 4, 1920, 1080);

        assert_eq!(f.state.get(), Some(PlaybackState::ManuallyPaused));
        f.looper.advance(5_000).await;
        assert_eq!(f.manager.current_position(), 1_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupts_pause_engine_only() {
        let f = fixture(0);
        f.manager.on_call_state_changed(CallState::Ringing);

        f.manager.surface_created(surface());
        f.looper.advance(1_150).await;

        f.manager.on_audio_focus_change(AudioFocusChange::LossTransientCanDuck);
        f.looper.advance(1_000).await;
        assert_eq!(f.manager.current_position(), 2_000);

        f.manager.on_audio_focus_change(AudioFocusChange::Loss);
        assert_eq!(f.state.get(), Some(PlaybackState::Playing));
        f.looper.advance(1_000).await;
        assert_eq!(f.manager.current_position(), 2_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupts_ignored_after_surface_destroyed() {
        let f = fixture(0);
        f.manager.surface_created(surface());
        f.looper.advance(150).await;
        f.manager.surface_destroyed();

        f.manager.on_call_state_changed(CallState::OffHook);
        assert_eq!(f.state.get(), Some(PlaybackState::Playing));
    }

    #[tokio::test(start_paused = true)]
    async fn test_registered_callbacks_fire_after_prepare() {
        let f = fixture(0);
        let fired = Rc::new(Cell::new(0));
        let sink = Rc::clone(&fired);
        f.manager
            .register_callback(Rc::new(move || sink.set(sink.get() + 1)), false, 1_000);

        f.looper.advance(1_000).await;
        assert_eq!(fired.get(), 0);

        f.manager.surface_created(surface());
        f.looper.advance(1_149).await;
        assert_eq!(fired.get(), 0);
        f.looper.advance(1).await;
        assert_eq!(fired.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_before_end_callback_survives_pause() {
        let f = fixture(0);
        let fired_at = Rc::new(Cell::new(None));
        let sink = Rc::clone(&fired_at);
        let manager = f.manager.clone();
        f.manager.register_callback(
            Rc::new(move || sink.set(Some(manager.current_position()))),
            true,
            5_000,
        );

        f.manager.surface_created(surface());
        f.looper.advance(150 + 10_000).await;
        f.manager.pause();
        f.looper.advance(30_000).await;
        assert_eq!(fired_at.get(), None);

        f.manager.start();
        f.looper.advance(50_000).await;
        assert_eq!(fired_at.get(), Some(55_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_before_end_callback_follows_seek() {
        let f = fixture(0);
        let fired_at = Rc::new(Cell::new(None));
        let sink = Rc::clone(&fired_at);
        let manager = f.manager.clone();
        f.manager.register_callback(
            Rc::new(move || sink.set(Some(manager.current_position()))),
            true,
            5_000,
        );

        f.manager.surface_created(surface());
        f.looper.advance(150 + 1_000).await;
        f.manager.seek_to(40_000);
        f.looper.advance(14_999).await;
        assert_eq!(fired_at.get(), None);
        f.looper.advance(1).await;
        assert_eq!(fired_at.get(), Some(55_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_fires_once_across_background_cycles() {
        let f = fixture(0);
        let fired = Rc::new(Cell::new(0));
        let sink = Rc::clone(&fired);
        f.manager
            .register_callback(Rc::new(move || sink.set(sink.get() + 1)), false, 1_000);

        for id in 1..=3 {
            f.manager.surface_created(Surface::new(id, 1920, 1080));
            f.looper.advance(150 + 2_000).await;
            f.manager.perform_pause();
            f.manager.surface_destroyed();
            f.looper.advance(500).await;
        }

        assert_eq!(fired.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_surface_changed_resumes_system_pause() {
        let f = fixture(0);
        f.manager.surface_created(surface());
        f.looper.advance(150 + 2_000).await;

        f.manager.perform_pause();
        assert_eq!(f.state.get(), Some(PlaybackState::Paused));
        f.looper.advance(1_000).await;
        assert_eq!(f.manager.current_position(), 2_000);

        f.manager.surface_changed(Surface::new(1, 1280, 720), 4, 1280, 720);
        assert_eq!(f.state.get(), Some(PlaybackState::Playing));
        f.looper.advance(1_000).await;
        assert_eq!(f.manager.current_position(), 3_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unregister_all_callbacks() {
        let f = fixture(0);
        let fired = Rc::new(Cell::new(0));
        for at in [500, 1_000, 5_000] {
            let sink = Rc::clone(&fired);
            f.manager
                .register_callback(Rc::new(move || sink.set(sink.get() + 1)), at == 5_000, at);
        }

        f.manager.surface_created(surface());
        f.looper.advance(150).await;
        f.manager.unregister_all_callbacks();
        f.looper.advance(60_000).await;

        assert_eq!(fired.get(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_media_reports_error() {
        let looper = Looper::new();
        let video = VideoDescriptor::new("Gone", "/no/such/video.mp4");
        let factory = SimulatedEngineFactory::new(looper.handler(), EngineConfig::default(), false);
        let manager = PlaybackManager::new(
            looper.handler(),
            &Config::default(),
            video,
            Rc::new(StateHolder::new()),
            Box::new(factory),
        );

        let errors = Rc::new(Cell::new(0));
        let sink = Rc::clone(&errors);
        manager.set_on_error_listener(Some(Rc::new(move |_: &HapticPlayerError| sink.set(sink.get() + 1))));

        manager.surface_created(surface());
        looper.advance(1_000).await;

        assert_eq!(errors.get(), 1);
        assert!(!manager.is_prepared());
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_listener() {
        let f = fixture(0);
        let completed = Rc::new(Cell::new(false));
        let sink = Rc::clone(&completed);
        f.manager
            .set_on_completion_listener(Some(Rc::new(move || sink.set(true))));

        f.manager.surface_created(surface());
        f.looper.advance(60_150).await;
        assert!(completed.get());
    }

    #[tokio::test(start_paused = true)]
    async fn test_keep_play_pause_hidden_until_seek() {
        let f = fixture(0);
        f.manager.surface_created(surface());
        f.looper.advance(150).await;
        let controller = f.manager.controller().unwrap();

        f.manager.hide_play_pause(true);
        f.manager.pause();
        assert!(controller.view().play_pause_visible);
        f.manager.start();
        assert!(!controller.view().play_pause_visible);

        f.manager.seek_to(10_000);
        f.manager.pause();
        f.manager.start();
        assert!(controller.view().play_pause_visible);
    }
}
