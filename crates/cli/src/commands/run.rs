//! `run` command implementation.

use std::process::ExitCode;

use contracts::{ContractError, GammaResponse, RunSettings};
use dataset::StereoDataset;
use driver::{scheduled_duration, RunOutcome};
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::{CliError, Result, EXIT_ABANDONED, EXIT_FAILURE};
use crate::pipeline::{build_schedule, print_summary, PlaybackSession, Shutdown};

/// Execute the `run` command
///
/// Signals are handled from the first line on: a stop before playback starts
/// exits with status 1, a stop during preload cuts it short.
pub async fn run_pipeline(args: &RunArgs) -> Result<ExitCode> {
    let shutdown = Shutdown::new();
    let _signals = shutdown.listen();

    info!(config = %args.config.display(), "Loading configuration");

    let mut settings =
        config_loader::ConfigLoader::load_from_path(&args.config).map_err(CliError::Config)?;
    apply_overrides(&mut settings, args)?;

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    info!(
        preset = %config_loader::describe_preset(settings.preset),
        mode = settings.engine.photometric_mode.describe(),
        root = %settings.dataset.root.display(),
        start = settings.playback.start,
        end = settings.playback.end,
        speed = settings.playback.speed,
        "Configuration loaded"
    );

    let dataset =
        StereoDataset::open(&settings.dataset, settings.engine.photometric.use_calibration)?;
    check_calibration(&settings, dataset.gamma.as_ref())?;

    if let Some(status) = interrupted_status(&shutdown) {
        return Ok(ExitCode::from(status));
    }

    if args.dry_run {
        info!("Dry run mode - settings and dataset are valid, exiting");
        print_dry_run(&settings, &dataset);
        return Ok(ExitCode::SUCCESS);
    }

    let report = PlaybackSession::new(settings, dataset)
        .with_shutdown(shutdown)
        .run()
        .await?;
    print_summary(&report);

    let status = outcome_exit_status(report.run.outcome);
    info!(outcome = %report.run.outcome, status, "stereo-vo finished");
    Ok(ExitCode::from(status))
}

/// Process status for a finished run
pub fn outcome_exit_status(outcome: RunOutcome) -> u8 {
    match outcome {
        RunOutcome::Completed | RunOutcome::TrackingLost => 0,
        RunOutcome::InitializationAbandoned => EXIT_ABANDONED,
        RunOutcome::Interrupted => EXIT_FAILURE,
    }
}

/// Exit status when a stop arrived before playback started
fn interrupted_status(shutdown: &Shutdown) -> Option<u8> {
    if shutdown.is_requested() {
        warn!("stop requested during startup, not starting playback");
        return Some(EXIT_FAILURE);
    }
    None
}

/// Apply command-line overrides on top of the loaded settings
fn apply_overrides(settings: &mut RunSettings, args: &RunArgs) -> Result<()> {
    if let Some(root) = &args.dataset {
        info!(root = %root.display(), "Overriding dataset root from CLI");
        settings.dataset.root = root.clone();
    }
    if let Some(start) = args.start {
        if start < 0 {
            return Err(invalid("start", "must be non-negative"));
        }
        settings.playback.start = start;
    }
    if let Some(end) = args.end {
        if end < 0 {
            return Err(invalid("end", "must be non-negative"));
        }
        settings.playback.end = end;
    }
    if let Some(speed) = args.playback_speed {
        if !speed.is_finite() || speed < 0.0 {
            return Err(invalid("playback_speed", "must be a finite value >= 0"));
        }
        info!(speed, "Overriding playback speed from CLI");
        settings.playback.speed = speed;
    }
    Ok(())
}

fn invalid(field: &str, message: &str) -> CliError {
    CliError::Config(ContractError::config_validation(field, message))
}

/// Calibrated mode needs a photometric response
fn check_calibration(settings: &RunSettings, gamma: Option<&GammaResponse>) -> Result<()> {
    if settings.engine.photometric.use_calibration && gamma.is_none() {
        return Err(CliError::CalibrationMissing(ContractError::CalibrationMissing {
            message: "no photometric calibration available; rerun with mode=1 (uncalibrated) \
                      or mode=2 (idealized images)"
                .to_string(),
        }));
    }
    Ok(())
}

/// Print what a run would do
fn print_dry_run(settings: &RunSettings, dataset: &StereoDataset) {
    let schedule = build_schedule(settings, dataset);

    println!("\n=== Dry Run ===\n");
    println!("Preset: {}", config_loader::describe_preset(settings.preset));
    println!("Mode: {}", settings.engine.photometric_mode.describe());
    println!("Calibration: {}", dataset.geometric.path.display());
    for stream in dataset.summary() {
        println!(
            "  {}: {} frames, {:.2}s, {:.1} fps",
            stream.name,
            stream.frames,
            stream.span_seconds(),
            stream.fps()
        );
    }
    println!(
        "\nSchedule: {} steps, speed {}, {:.2}s paced",
        schedule.len(),
        schedule.speed(),
        scheduled_duration(&schedule).as_secs_f64()
    );
    if let (Some(first), Some(last)) = (schedule.first(), schedule.last()) {
        println!("  frames {} → {}", first.left_id, last.left_id);
    }
    println!("Result file: {}", settings.outputs.result_path().display());
    println!();
}
