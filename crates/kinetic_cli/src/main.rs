//! Kinetic CLI
//!
//! Headless host driver: loads a TOML scene or timeline document, drives it
//! with a fixed frame clock and prints JSON lines to stdout.

mod scene;
mod timeline;

use anyhow::Result;
use clap::{Parser, Subcommand};
use kinetic_core::MotionPolicy;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kinetic")]
#[command(about = "Drive Kinetic physics scenes and animation timelines headlessly")]
#[command(version)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Step a physics scene and print body snapshots
    Simulate {
        /// Scene document (TOML)
        scene: PathBuf,

        /// Simulated seconds
        #[arg(short, long, default_value = "2.0")]
        seconds: f32,

        /// Frames per second of the driving clock
        #[arg(long, default_value = "60")]
        fps: u32,

        /// Reduced-motion policy: off, low, medium or high
        #[arg(short, long, default_value = "off")]
        policy: MotionPolicy,

        /// Print every Nth frame
        #[arg(long, default_value = "1")]
        every: u32,
    },

    /// Resolve a timeline and optionally play it
    Timeline {
        /// Timeline document (TOML)
        timeline: PathBuf,

        /// Reduced-motion policy: off, low, medium or high
        #[arg(short, long, default_value = "off")]
        policy: MotionPolicy,

        /// Play the timeline to completion and print lifecycle events
        #[arg(long)]
        play: bool,

        /// Frames per second of the driving clock
        #[arg(long, default_value = "60")]
        fps: u32,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Simulate {
            scene,
            seconds,
            fps,
            policy,
            every,
        } => {
            let doc = scene::SceneDoc::load(&scene)?;
            scene::simulate(&doc, seconds, fps, policy, every.max(1))
        }
        Commands::Timeline {
            timeline,
            policy,
            play,
            fps,
        } => {
            let doc = timeline::TimelineDoc::load(&timeline)?;
            timeline::run(&doc, policy, play, fps)
        }
    }
}
