//! Integration tests for HapticPlayer playback sessions
//!
//! These tests drive a full screen over the simulated engine:
//! - Surface lifecycle and background/foreground resume
//! - Manual pause versus system pause
//! - Completion and back navigation
//! - Haptic track synchronization

use anyhow::Result;
use hapticplayer::engine::{MediaPlayerControl, Surface};
use hapticplayer::looper::Looper;
use hapticplayer::player::PlaybackState;
use hapticplayer::screen::ControllerMode;
use hapticplayer::utils::EngineConfig;
use hapticplayer::HapticPlayerError;
use hapticplayer_integration_tests::{launch, CountingFactory, MockHaptics, TestFixture};
use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;

const PREPARE_MS: u64 = 150;

fn surface() -> Surface {
    Surface::new(7, 1920, 1080)
}

#[tokio::test(start_paused = true)]
async fn test_background_pause_resumes_automatically() -> Result<()> {
    let fixture = TestFixture::new()?;
    let looper = Looper::new();
    let (factory, _) = CountingFactory::new(&looper, EngineConfig::default());
    let screen = launch(&looper, fixture.descriptor(), ControllerMode::WithController, Box::new(factory))?;

    screen.surface_created(surface());
    looper.advance(PREPARE_MS + 2_000).await;

    screen.on_pause();
    screen.surface_destroyed();
    assert_eq!(screen.state(), Some(PlaybackState::Paused));

    looper.advance(30_000).await;
    screen.surface_created(surface());
    looper.advance(PREPARE_MS).await;

    assert_eq!(screen.state(), Some(PlaybackState::Playing));
    assert_eq!(screen.manager().current_position(), 2_000);
    looper.advance(1_000).await;
    assert_eq!(screen.manager().current_position(), 3_000);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_manual_pause_is_not_resumed() -> Result<()> {
    let fixture = TestFixture::new()?;
    let looper = Looper::new();
    let (factory, _) = CountingFactory::new(&looper, EngineConfig::default());
    let screen = launch(&looper, fixture.descriptor(), ControllerMode::WithController, Box::new(factory))?;

    screen.surface_created(surface());
    looper.advance(PREPARE_MS + 2_000).await;
    screen.manager().pause();

    screen.on_pause();
    screen.surface_destroyed();
    screen.surface_created(surface());
    looper.advance(PREPARE_MS + 5_000).await;

    assert_eq!(screen.state(), Some(PlaybackState::ManuallyPaused));
    assert_eq!(screen.manager().current_position(), 2_000);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_surface_creates_one_engine() -> Result<()> {
    let fixture = TestFixture::new()?;
    let looper = Looper::new();
    let (factory, created) = CountingFactory::new(&looper, EngineConfig::default());
    let screen = launch(&looper, fixture.descriptor(), ControllerMode::WithController, Box::new(factory))?;

    screen.surface_created(surface());
    screen.surface_created(surface());
    looper.advance(PREPARE_MS).await;
    screen.surface_created(surface());
    assert_eq!(created.get(), 1);

    screen.surface_destroyed();
    screen.surface_created(surface());
    assert_eq!(created.get(), 2);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_session_runs_to_completion() -> Result<()> {
    let fixture = TestFixture::new()?;
    let looper = Looper::new();
    let media = EngineConfig {
        duration_ms: 10_000,
        ..EngineConfig::default()
    };
    let (factory, _) = CountingFactory::new(&looper, media);
    let video = fixture.descriptor().with_elapsed(4_000);
    let screen = launch(&looper, video, ControllerMode::WithoutController, Box::new(factory))?;

    screen.surface_created(surface());
    looper.advance(PREPARE_MS + 5_999).await;
    assert!(!screen.is_finished());

    looper.advance(1).await;
    assert!(screen.is_finished());
    assert_eq!(screen.state(), Some(PlaybackState::PostPlayback));
    assert_eq!(screen.video().elapsed_ms, 0);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_back_records_resume_position() -> Result<()> {
    let fixture = TestFixture::new()?;
    let looper = Looper::new();
    let (factory, _) = CountingFactory::new(&looper, EngineConfig::default());
    let screen = launch(&looper, fixture.descriptor(), ControllerMode::WithController, Box::new(factory))?;

    screen.surface_created(surface());
    looper.advance(PREPARE_MS + 12_500).await;
    screen.on_back_pressed();
    screen.destroy();

    assert!(screen.is_finished());
    assert_eq!(screen.elapsed_ms(), 12_500);
    assert!(!screen.manager().has_engine());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_scrub_through_controller() -> Result<()> {
    let fixture = TestFixture::new()?;
    let looper = Looper::new();
    let (factory, _) = CountingFactory::new(&looper, EngineConfig::default());
    let screen = launch(&looper, fixture.descriptor(), ControllerMode::WithController, Box::new(factory))?;

    screen.surface_created(surface());
    looper.advance(PREPARE_MS + 1_000).await;
    let controller = screen.manager().controller().expect("controller after prepare");

    controller.on_start_tracking_touch();
    assert_eq!(screen.state(), Some(PlaybackState::ManuallyPaused));
    controller.on_progress_changed(500, true);
    controller.on_stop_tracking_touch();

    assert_eq!(screen.state(), Some(PlaybackState::Playing));
    assert_eq!(screen.manager().current_position(), 30_000);
    looper.advance(1_000).await;
    assert_eq!(screen.manager().current_position(), 31_000);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_haptic_track_follows_transport() -> Result<()> {
    let fixture = TestFixture::new()?;
    let looper = Looper::new();

    let track = fixture.haptic_track.clone();
    let mut device = MockHaptics::new();
    device
        .expect_open()
        .withf(move |path: &Path| path == track.as_path())
        .times(1)
        .returning(|_| Ok(()));
    device.expect_play().times(1).returning(|| Ok(()));
    device.expect_pause().times(1).returning(|| Ok(()));
    device.expect_resume().times(1).returning(|| Ok(()));
    device.expect_update().times(3..).returning(|_| Ok(()));
    device.expect_seek().returning(|_| Ok(()));
    device.expect_stop().returning(|| Ok(()));

    let (factory, _) = CountingFactory::new(&looper, EngineConfig::default());
    let factory = factory.with_device(Box::new(device));
    let video = fixture.descriptor().with_haptics(&fixture.haptic_track);
    let screen = launch(&looper, video, ControllerMode::WithController, Box::new(factory))?;

    screen.surface_created(surface());
    looper.advance(PREPARE_MS + 2_000).await;
    assert!(screen.manager().has_haptics());

    screen.manager().pause();
    screen.manager().start();
    looper.advance(1_000).await;

    screen.destroy();
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_haptic_open_failure_keeps_video_playing() -> Result<()> {
    let fixture = TestFixture::new()?;
    let looper = Looper::new();

    let mut device = MockHaptics::new();
    device
        .expect_open()
        .times(1)
        .returning(|_| Err(HapticPlayerError::Haptics("unsupported track".to_string())));
    device.expect_play().never();
    device.expect_update().never();

    let (factory, _) = CountingFactory::new(&looper, EngineConfig::default());
    let factory = factory.with_device(Box::new(device));
    let video = fixture.descriptor().with_haptics(&fixture.haptic_track);
    let screen = launch(&looper, video, ControllerMode::WithController, Box::new(factory))?;

    screen.surface_created(surface());
    looper.advance(PREPARE_MS + 3_000).await;

    assert!(!screen.manager().has_haptics());
    assert_eq!(screen.manager().current_position(), 3_000);

    screen.destroy();
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_haptics_disabled_for_video_skips_device() -> Result<()> {
    let fixture = TestFixture::new()?;
    let looper = Looper::new();

    let mut device = MockHaptics::new();
    device.expect_open().never();

    let (factory, _) = CountingFactory::new(&looper, EngineConfig::default());
    let factory = factory.with_device(Box::new(device));
    let mut video = fixture.descriptor().with_haptics(&fixture.haptic_track);
    video.haptics_enabled = false;
    let screen = launch(&looper, video, ControllerMode::WithController, Box::new(factory))?;

    screen.surface_created(surface());
    looper.advance(PREPARE_MS).await;
    assert!(!screen.manager().has_haptics());
    assert!(screen.manager().is_playing());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_before_end_callback_fires_once_across_backgrounding() -> Result<()> {
    let fixture = TestFixture::new()?;
    let looper = Looper::new();
    let media = EngineConfig {
        duration_ms: 20_000,
        ..EngineConfig::default()
    };
    let (factory, _) = CountingFactory::new(&looper, media);
    let screen = launch(&looper, fixture.descriptor(), ControllerMode::WithController, Box::new(factory))?;

    let fired = Rc::new(Cell::new(0u32));
    let sink = Rc::clone(&fired);
    screen
        .manager()
        .register_callback(Rc::new(move || sink.set(sink.get() + 1)), true, 5_000);

    screen.surface_created(surface());
    looper.advance(PREPARE_MS + 10_000).await;
    screen.on_pause();
    screen.surface_destroyed();
    looper.advance(60_000).await;
    assert_eq!(fired.get(), 0);

    screen.surface_created(surface());
    looper.advance(PREPARE_MS + 4_999).await;
    assert_eq!(fired.get(), 0);
    looper.advance(1).await;
    assert_eq!(fired.get(), 1);

    screen.on_pause();
    screen.surface_destroyed();
    screen.surface_created(surface());
    looper.advance(PREPARE_MS + 4_000).await;
    assert_eq!(fired.get(), 1);

    Ok(())
}
