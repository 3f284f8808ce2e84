//! `info` command implementation.

use std::process::ExitCode;

use anyhow::Context;
use contracts::{PlaybackDirection, RunSettings};
use dataset::{StereoDataset, StreamSummary};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::commands::validate::enabled_sinks;
use crate::error::{CliError, Result};

/// Settings info for JSON output
#[derive(Serialize)]
struct SettingsInfo<'a> {
    settings: &'a RunSettings,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    streams: Vec<StreamInfo>,
}

#[derive(Serialize)]
struct StreamInfo {
    name: String,
    frames: usize,
    first_timestamp: f64,
    last_timestamp: f64,
    fps: f64,
}

impl From<StreamSummary> for StreamInfo {
    fn from(summary: StreamSummary) -> Self {
        Self {
            fps: summary.fps(),
            name: summary.name,
            frames: summary.frames,
            first_timestamp: summary.first_timestamp,
            last_timestamp: summary.last_timestamp,
        }
    }
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<ExitCode> {
    info!(config = %args.config.display(), "Loading configuration info");

    let settings =
        config_loader::ConfigLoader::load_from_path(&args.config).map_err(CliError::Config)?;

    let streams: Vec<StreamInfo> = if args.dataset {
        let dataset = StereoDataset::open(&settings.dataset, false)?;
        dataset.summary().into_iter().map(StreamInfo::from).collect()
    } else {
        Vec::new()
    };

    if args.json {
        let info = SettingsInfo {
            settings: &settings,
            streams,
        };
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize settings info")?;
        println!("{json}");
    } else {
        print_settings_info(&settings, &streams);
    }

    Ok(ExitCode::SUCCESS)
}

fn print_settings_info(settings: &RunSettings, streams: &[StreamInfo]) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Stereo VO Settings                             ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let dataset = &settings.dataset;
    println!("📁 Dataset");
    println!("   ├─ Root: {}", dataset.root.display());
    println!("   ├─ Calibration: {}", dataset.calib.display());
    println!("   ├─ Gamma: {}", optional_path(dataset.gamma_calib.as_deref()));
    println!("   ├─ Vignette: {}", optional_path(dataset.vignette.as_deref()));
    println!("   └─ Rescale: {}", dataset.rescale);

    let playback = &settings.playback;
    println!("\n▶️  Playback");
    println!("   ├─ Frames: [{}, {})", playback.start, playback.end);
    println!(
        "   ├─ Direction: {}",
        match playback.direction {
            PlaybackDirection::Forward => "forward",
            PlaybackDirection::Reverse => "reverse",
        }
    );
    if playback.speed == 0.0 {
        println!("   ├─ Speed: unpaced (linearized)");
    } else {
        println!("   ├─ Speed: {}x real time", playback.speed);
    }
    println!(
        "   └─ Fetch: preload={} prefetch={}",
        playback.preload, playback.prefetch
    );

    let engine = &settings.engine;
    let tuning = &engine.tuning;
    println!("\n⚙️  Engine");
    println!(
        "   ├─ Preset: {}",
        config_loader::describe_preset(settings.preset)
    );
    println!("   ├─ Mode: {}", engine.photometric_mode.describe());
    println!(
        "   ├─ Points: {} (immature {})",
        tuning.point_density, tuning.immature_density
    );
    println!(
        "   ├─ Active frames: {}-{}",
        tuning.min_frames, tuning.max_frames
    );
    match tuning.benchmark_size {
        Some((w, h)) => println!("   ├─ Benchmark size: {w}x{h}"),
        None => println!("   ├─ Benchmark size: native"),
    }
    println!("   └─ Multi-threading: {}", engine.multi_threading);

    let outputs = &settings.outputs;
    println!("\n📤 Outputs");
    println!("   ├─ Sinks: {:?}", enabled_sinks(settings));
    println!("   ├─ Result: {}", outputs.result_path().display());
    println!("   └─ Timing log: {}", outputs.timing_log);

    if !streams.is_empty() {
        println!("\n📷 Streams");
        for (i, stream) in streams.iter().enumerate() {
            let prefix = if i == streams.len() - 1 { "└─" } else { "├─" };
            println!(
                "   {} {}: {} frames, {:.3}s → {:.3}s ({:.1} fps)",
                prefix,
                stream.name,
                stream.frames,
                stream.first_timestamp,
                stream.last_timestamp,
                stream.fps
            );
        }
    }

    println!();
}

fn optional_path(path: Option<&std::path::Path>) -> String {
    path.map_or_else(|| "(none)".to_string(), |p| p.display().to_string())
}
