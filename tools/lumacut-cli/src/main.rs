//! LumaCut CLI: headless front end for the composition engine.
//!
//! Usage:
//!   lumacut check                     Check ffmpeg, ffprobe and font availability
//!   lumacut info <FILE>               Import a media file and show its properties
//!   lumacut frame <PRIMARY> -o <PNG>  Compose a single frame to PNG
//!   lumacut export <PRIMARY>          Record a real-time export of the composition
//!   lumacut subtitles <FILE> -o <OUT> Write placeholder captions as SRT or VTT

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

use commands::SceneArgs;

#[derive(Parser)]
#[command(
    name = "lumacut",
    about = "Single-track video editor with real-time compositing",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check system capabilities
    Check,

    /// Import a media file and show its properties
    Info {
        /// Path to an image or video file
        path: PathBuf,

        /// Print the asset record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compose one frame of the scene to a PNG file
    Frame {
        /// Primary image or video
        primary: PathBuf,

        /// Output PNG path
        #[arg(short, long)]
        output: PathBuf,

        /// Playback position in seconds
        #[arg(short, long, default_value = "0")]
        time: f64,

        #[command(flatten)]
        scene: SceneArgs,
    },

    /// Play the scene through once and record it as a WebM file
    Export {
        /// Primary image or video
        primary: PathBuf,

        /// Quality tag recorded in the file name and asset label
        #[arg(short, long, default_value = "1080p")]
        quality: String,

        /// Directory to write the export to (defaults to the configured one)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        #[command(flatten)]
        scene: SceneArgs,
    },

    /// Write placeholder subtitles covering a clip
    Subtitles {
        /// Image or video to caption
        path: PathBuf,

        /// Output path; `.vtt` writes WebVTT, anything else SRT
        #[arg(short, long)]
        output: PathBuf,

        /// Length of each cue in seconds
        #[arg(long, default_value = "3.0")]
        cue_secs: f64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = lumacut_common::config::AppConfig::load();
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    lumacut_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Check => commands::check::run(&config),
        Commands::Info { path, json } => commands::info::run(path, json),
        Commands::Frame {
            primary,
            output,
            time,
            scene,
        } => commands::frame::run(config, primary, output, time, scene).await,
        Commands::Export {
            primary,
            quality,
            out_dir,
            scene,
        } => commands::export::run(config, primary, quality, out_dir, scene).await,
        Commands::Subtitles {
            path,
            output,
            cue_secs,
        } => commands::subtitles::run(&config, path, output, cue_secs),
    }
}
