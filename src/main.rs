use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser};
use env_logger::Env;
use log::{error, info, warn};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use hapticplayer::engine::{MediaPlayerControl, SimulatedEngineFactory, Surface};
use hapticplayer::looper::Looper;
use hapticplayer::player::VideoDescriptor;
use hapticplayer::screen::{ControllerMode, PlayerScreen};
use hapticplayer::utils::{load_config, Config};

/// How often the driver checks whether the screen has finished
const FINISH_POLL_MS: u64 = 100;

/// HapticPlayer - play a video with a synchronized haptic track
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Video file to play
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Title shown in the controller (defaults to the file name)
    #[arg(short, long)]
    title: Option<String>,

    /// Haptic track rendered alongside the video
    #[arg(long, value_name = "FILE")]
    haptic_file: Option<PathBuf>,

    /// Position to resume from, in milliseconds
    #[arg(short, long, default_value = "0")]
    elapsed: u64,

    /// Simulated media duration in milliseconds
    #[arg(long)]
    duration_ms: Option<u64>,

    /// Simulated video width
    #[arg(long)]
    video_width: Option<u32>,

    /// Simulated video height
    #[arg(long)]
    video_height: Option<u32>,

    /// Do not show the controller on touch
    #[arg(long = "no-controller", action = ArgAction::SetFalse)]
    controller: bool,

    /// Configuration file to use instead of the system/user files
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

/// Commands read from stdin, one per line
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Play,
    Pause,
    Seek(u64),
    Scrub(u32),
    Touch,
    Back,
    Background,
    Foreground,
    Effect(String),
    Status,
    Quit,
}

fn parse_command(line: &str) -> Result<Command> {
    let mut parts = line.split_whitespace();
    let name = parts.next().ok_or_else(|| anyhow!("empty command"))?;
    let arg = parts.next();
    let number = |what: &str| -> Result<u64> {
        arg.ok_or_else(|| anyhow!("{} needs a {}", name, what))?
            .parse::<u64>()
            .with_context(|| format!("invalid {}", what))
    };

    let command = match name {
        "play" => Command::Play,
        "pause" => Command::Pause,
        "seek" => Command::Seek(number("position")?),
        "scrub" => Command::Scrub(u32::try_from(number("progress")?)?),
        "touch" => Command::Touch,
        "back" => Command::Back,
        "background" => Command::Background,
        "foreground" => Command::Foreground,
        "effect" => Command::Effect(arg.ok_or_else(|| anyhow!("effect needs a name"))?.to_string()),
        "status" => Command::Status,
        "quit" | "exit" => Command::Quit,
        other => return Err(anyhow!("unknown command '{}'", other)),
    };
    Ok(command)
}

async fn read_commands(tx: mpsc::UnboundedSender<Command>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => {}
            Ok(Some(line)) => match parse_command(&line) {
                Ok(command) => {
                    if tx.send(command).is_err() {
                        return;
                    }
                }
                Err(e) => warn!("{}", e),
            },
            Ok(None) => return,
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                return;
            }
        }
    }
}

/// Apply one command; returns false to stop the driver
fn apply(screen: &PlayerScreen, surface: &Surface, command: Command) -> bool {
    let manager = screen.manager();
    match command {
        Command::Play => manager.start(),
        Command::Pause => manager.pause(),
        Command::Seek(position) => manager.seek_to(position),
        Command::Scrub(progress) => match manager.controller() {
            Some(controller) => {
                controller.on_start_tracking_touch();
                controller.on_progress_changed(progress, true);
                controller.on_stop_tracking_touch();
            }
            None => warn!("Controller not ready yet"),
        },
        Command::Touch => screen.on_touch_up(),
        Command::Back => screen.on_back_pressed(),
        Command::Background => {
            screen.on_pause();
            screen.surface_destroyed();
        }
        Command::Foreground => screen.surface_created(surface.clone()),
        Command::Effect(name) => match manager.play_haptic_effect(&name) {
            Some(effect) => info!("Played haptic effect {}", effect),
            None => warn!("No haptic channel"),
        },
        Command::Status => {
            let status = serde_json::json!({
                "state": screen.state(),
                "position_ms": manager.current_position(),
                "duration_ms": manager.duration(),
                "controller_shown": manager.is_controller_shown(),
                "haptics": manager.has_haptics(),
            });
            println!("{}", status);
        }
        Command::Quit => return false,
    }
    true
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => load_config()?,
    };
    if let Some(duration) = args.duration_ms {
        config.engine.duration_ms = duration;
    }
    if let Some(width) = args.video_width {
        config.engine.video_width = width;
    }
    if let Some(height) = args.video_height {
        config.engine.video_height = height;
    }
    config.validate()?;

    // Initialize logging
    let log_level = if args.debug { "debug" } else { config.general.log_level.as_str() };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    info!("Starting HapticPlayer v{}", env!("CARGO_PKG_VERSION"));

    let title = args.title.clone().unwrap_or_else(|| {
        args.file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    let mut video = VideoDescriptor::new(title, &args.file).with_elapsed(args.elapsed);
    if let Some(haptic_file) = &args.haptic_file {
        video = video.with_haptics(haptic_file);
    }
    let mode = if args.controller {
        ControllerMode::WithController
    } else {
        ControllerMode::WithoutController
    };

    let looper = Looper::new();
    let factory = SimulatedEngineFactory::new(
        looper.handler(),
        config.engine.clone(),
        video.haptics_enabled && config.haptics.enabled,
    );
    let screen = PlayerScreen::launch(video, mode, &config, looper.handler(), Box::new(factory))?;

    let surface = Surface::new(1, config.playback.display_width, config.playback.display_height);
    screen.surface_created(surface.clone());
    screen.surface_changed(surface.clone(), 4, surface.width, surface.height);

    let (tx, mut rx) = mpsc::unbounded_channel();
    tokio::spawn(read_commands(tx));

    // Player tasks run on the looper's local set, interleaved with commands
    let mut finish_check = tokio::time::interval(Duration::from_millis(FINISH_POLL_MS));
    let mut stdin_open = true;
    looper
        .run_until(async {
            loop {
                tokio::select! {
                    _ = finish_check.tick() => {
                        if screen.is_finished() {
                            break;
                        }
                    }
                    command = rx.recv(), if stdin_open => match command {
                        Some(command) => {
                            if !apply(&screen, &surface, command) {
                                break;
                            }
                        }
                        None => stdin_open = false,
                    },
                }
            }
        })
        .await;

    screen.destroy();
    info!("Playback ended at {}ms", screen.elapsed_ms());
    println!("{}", serde_json::to_string_pretty(&screen.video())?);

    Ok(())
}
