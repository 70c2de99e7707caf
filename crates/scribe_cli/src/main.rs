//! Scribe CLI
//!
//! Record text as a keystroke log, then inspect, replay and measure it.
//! Provides:
//! - `record` - type stdin into a new event dump at a steady pace
//! - `show` - print the document at any point of a dump
//! - `play` - replay a dump in the terminal at a chosen rate
//! - `wpm` - the typing-speed curve of a dump
//! - `stats` - event counts and text statistics
//! - `export` - encode a replay as MP4, MOV or GIF with ffmpeg

mod commands;
mod config;
mod ffmpeg;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::ScribeConfig;
use scribe_recorder::ExportFormat;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Keystroke recording and playback
#[derive(Parser, Debug)]
#[command(name = "scribe")]
#[command(about = "Record, replay and measure keystroke logs")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./scribe.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record text from stdin into an event dump
    Record {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Typing speed in characters per minute
        #[arg(long, default_value_t = 300)]
        cpm: u64,
    },

    /// Print the document at a point in the recording
    Show {
        /// Event dump to read
        file: PathBuf,

        /// Position in the recording, from 0 to 1
        #[arg(long, default_value_t = 1.0)]
        at: f64,
    },

    /// Replay a recording in the terminal
    Play {
        /// Event dump to read
        file: PathBuf,

        /// Playback rate (1, 1.25, 1.5, 2, 3, ...)
        #[arg(short, long)]
        rate: Option<f64>,

        /// Redraws per second
        #[arg(long)]
        fps: Option<u32>,
    },

    /// Show the typing-speed curve of a recording
    Wpm {
        /// Event dump to read
        file: PathBuf,
    },

    /// Show event and text statistics
    Stats {
        /// Event dump to read
        file: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Encode a replay as a video or animated image
    Export {
        /// Event dump to read
        file: PathBuf,

        /// Output format: mp4, mov or gif
        #[arg(short, long, default_value = "mp4")]
        format: ExportFormat,

        /// Output file (playback.<format> if omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Playback rate while capturing
        #[arg(short, long)]
        rate: Option<f64>,

        /// ffmpeg binary to run
        #[arg(long, default_value = "ffmpeg")]
        ffmpeg: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = ScribeConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Record { out, cpm } => commands::record(&config, out.as_deref(), cpm).await,
        Command::Show { file, at } => commands::show(&file, at),
        Command::Play { file, rate, fps } => commands::play(&config, &file, rate, fps).await,
        Command::Wpm { file } => commands::wpm(&config, &file),
        Command::Stats { file, json } => commands::stats(&config, &file, json),
        Command::Export {
            file,
            format,
            out,
            rate,
            ffmpeg,
        } => {
            let path =
                commands::export(&config, &file, format, out.as_deref(), rate, &ffmpeg).await?;
            println!("{}", path.display());
            Ok(())
        }
    }
}
