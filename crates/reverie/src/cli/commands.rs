//! CLI command definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Reverie - visual novel orchestration with queued image generation and timed playback
#[derive(Parser, Debug)]
#[command(name = "reverie")]
#[command(about = "Visual novel orchestration with queued image generation and timed playback", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Configuration file to use instead of the layered lookup
    #[arg(long, global = true, env = "REVERIE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Play a story through scripted in-memory services and log the timeline
    Simulate(SimulateArgs),

    /// Print the effective configuration as TOML
    Config,
}

/// Options for a simulated run
#[derive(clap::Args, Debug, Clone)]
pub struct SimulateArgs {
    /// Story premise
    #[arg(long, default_value = "A lighthouse keeper finds a letter in a bottle")]
    pub premise: String,

    /// Scenes the story service produces per chapter
    #[arg(long, default_value = "3")]
    pub scenes_per_chapter: usize,

    /// Chapters before the story service ends the story
    #[arg(long, default_value = "2")]
    pub chapters: u32,

    /// Fail every n-th image call (0 disables failures)
    #[arg(long, default_value = "0")]
    pub fail_every: usize,

    /// Seconds each scene stays on screen
    #[arg(long, default_value = "0.5")]
    pub scene_duration: f64,

    /// Simulated latency of every image call, in milliseconds
    #[arg(long, default_value = "200")]
    pub image_latency_ms: u64,

    /// Simulated latency of every story call, in milliseconds
    #[arg(long, default_value = "50")]
    pub story_latency_ms: u64,

    /// Give up after this many seconds
    #[arg(long, default_value = "120")]
    pub timeout_secs: u64,
}
