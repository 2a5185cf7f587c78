// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use picam::app::AppModel;
use picam::backends::camera::{DriverKind, StillFormat, open_driver};
use picam::config::Config;
use picam::errors::AppError;
use std::path::PathBuf;
use std::sync::Mutex;

mod cli;

#[derive(Parser)]
#[command(name = "picam")]
#[command(about = "Camera module front-end with live preview, crop, magnifier and focus controls")]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// Use the simulated camera instead of real hardware
    #[arg(long, global = true)]
    simulated: bool,

    /// V4L2 device node (default: libcamera)
    #[arg(long, global = true)]
    device: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cameras
    List,

    /// Take a photo
    Photo {
        /// Output format: jpeg, png, tiff or dng (default: from config)
        #[arg(short, long)]
        format: Option<StillFormat>,

        /// Output file path (default: ~/Pictures/picam/photo_TIMESTAMP.ext)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Record a video
    Video {
        /// Recording duration in seconds
        #[arg(short, long, default_value = "10")]
        duration: u64,

        /// Output file path (default: ~/Videos/picam/video_TIMESTAMP.mp4)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn env_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
}

/// Log to stderr for the headless commands
fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .with_level(true)
        .init();
}

/// Log to `<cache dir>/picam/picam.log` so the terminal UI stays intact
fn init_file_logging() -> Option<PathBuf> {
    let dir = dirs::cache_dir()?.join("picam");
    std::fs::create_dir_all(&dir).ok()?;
    let path = dir.join("picam.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .ok()?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Some(path)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let choice = cli::DriverChoice {
        kind: if cli.simulated {
            DriverKind::Simulated
        } else {
            DriverKind::GStreamer
        },
        device: cli.device,
    };

    match cli.command {
        Some(Commands::List) => {
            init_stderr_logging();
            cli::list_cameras(&choice)
        }
        Some(Commands::Photo { format, output }) => {
            init_stderr_logging();
            cli::take_photo(&choice, format, output)
        }
        Some(Commands::Video { duration, output }) => {
            init_stderr_logging();
            cli::record_video(&choice, duration, output)
        }
        None => run_terminal(choice),
    }
}

fn run_terminal(choice: cli::DriverChoice) -> Result<(), Box<dyn std::error::Error>> {
    // Logging is optional here; without a cache dir the UI simply runs unlogged
    let _log_path = init_file_logging();

    let mut config = Config::load();
    if choice.kind == DriverKind::Simulated {
        config.driver = DriverKind::Simulated;
    }
    if choice.device.is_some() {
        config.device = choice.device;
    }

    let driver = open_driver(config.driver, config.device.as_deref()).map_err(AppError::from);
    let mut model = AppModel::new(config, driver);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(async {
        model.init();
        picam::terminal::run(&mut model).await
    });

    model.shutdown();
    if let Err(e) = model.config.save() {
        eprintln!("Failed to save config: {}", e);
    }
    result
}
