//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// stereo-vo - stereo visual-odometry dataset playback driver
#[derive(Parser, Debug)]
#[command(
    name = "stereo-vo",
    author,
    version,
    about = "Stereo visual-odometry dataset playback driver",
    long_about = "Plays a stereo image dataset into a SLAM engine.\n\n\
                  Loads settings, opens the left/right image folders, paces frames \n\
                  against their timestamps, rebuilds the engine when initialization \n\
                  fails, and reports throughput when the sequence ends."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "STEREO_VO_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "STEREO_VO_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Play a dataset into the engine
    Run(RunArgs),

    /// Validate a settings file without running
    Validate(ValidateArgs),

    /// Display the resolved settings
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to settings file (YAML, TOML or JSON)
    #[arg(short, long, default_value = "config.yaml", env = "STEREO_VO_CONFIG")]
    pub config: PathBuf,

    /// Override the dataset root directory
    #[arg(long, env = "STEREO_VO_DATASET")]
    pub dataset: Option<PathBuf>,

    /// Override the first frame id
    #[arg(long, env = "STEREO_VO_START")]
    pub start: Option<i64>,

    /// Override the frame id bound (exclusive)
    #[arg(long, env = "STEREO_VO_END")]
    pub end: Option<i64>,

    /// Override the playback speed (0 = as fast as possible)
    #[arg(long, env = "STEREO_VO_PLAYBACK_SPEED")]
    pub playback_speed: Option<f64>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "STEREO_VO_METRICS_PORT")]
    pub metrics_port: u16,

    /// Load settings and dataset, print the schedule, and exit
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to settings file to validate
    #[arg(short, long, default_value = "config.yaml", env = "STEREO_VO_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to settings file
    #[arg(short, long, default_value = "config.yaml", env = "STEREO_VO_CONFIG")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Also open both image streams and show counts and timing
    #[arg(long)]
    pub dataset: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
