//! `validate` command implementation.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use contracts::{PhotometricMode, PlaybackDirection, RunSettings};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;
use crate::error::{Result, EXIT_CONFIG};

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    preset: u32,
    mode: PhotometricMode,
    dataset_root: String,
    start: i64,
    end: i64,
    reverse: bool,
    playback_speed: f64,
    sinks: Vec<&'static str>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<ExitCode> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(&args.config);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{json}");
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_CONFIG))
    }
}

fn validate_config(path: &Path) -> ValidationResult {
    let config_path = path.display().to_string();

    if !path.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", path.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(path) {
        Ok(settings) => {
            let warnings = collect_warnings(&settings);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(summarize(&settings)),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

fn summarize(settings: &RunSettings) -> ConfigSummary {
    ConfigSummary {
        preset: settings.preset.id(),
        mode: settings.engine.photometric_mode,
        dataset_root: settings.dataset.root.display().to_string(),
        start: settings.playback.start,
        end: settings.playback.end,
        reverse: settings.playback.direction == PlaybackDirection::Reverse,
        playback_speed: settings.playback.speed,
        sinks: enabled_sinks(settings),
    }
}

pub(crate) fn enabled_sinks(settings: &RunSettings) -> Vec<&'static str> {
    let outputs = &settings.outputs;
    [
        (outputs.viewer, "viewer"),
        (outputs.sample_output, "sample"),
        (outputs.save_images, "images"),
    ]
    .into_iter()
    .filter_map(|(enabled, name)| enabled.then_some(name))
    .collect()
}

/// Non-fatal issues that are likely to fail or surprise at run time
fn collect_warnings(settings: &RunSettings) -> Vec<String> {
    let mut warnings = Vec::new();
    let dataset = &settings.dataset;

    for dir in [dataset.left_dir(), dataset.right_dir()] {
        if !dir.is_dir() {
            warnings.push(format!("Image directory not found: {}", dir.display()));
        }
    }
    if !dataset.calib.is_file() {
        warnings.push(format!(
            "Calibration file not found: {}",
            dataset.calib.display()
        ));
    }

    if settings.engine.photometric.use_calibration && dataset.gamma_calib.is_none() {
        warnings.push(
            "mode=0 needs a gamma calibration file; the run will stop before playback".to_string(),
        );
    }

    if settings.playback.start >= settings.playback.end {
        warnings.push(format!(
            "Empty frame range: start {} >= end {}",
            settings.playback.start, settings.playback.end
        ));
    }

    if enabled_sinks(settings).is_empty() {
        warnings.push("No output sinks enabled - only the result file is written".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Preset: {}", summary.preset);
            println!("  Mode: {}", summary.mode.describe());
            println!("  Dataset: {}", summary.dataset_root);
            println!(
                "  Frames: [{}, {}){}",
                summary.start,
                summary.end,
                if summary.reverse { " reversed" } else { "" }
            );
            println!("  Speed: {}", summary.playback_speed);
            println!("  Sinks: {:?}", summary.sinks);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {warning}");
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_file_is_invalid() {
        let result = validate_config(Path::new("/nonexistent/config.yaml"));
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }

    #[test]
    fn invalid_preset_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "preset: 9\nDataSetRootDirectory: /d\ncalib: /d/c.txt\n").unwrap();

        let result = validate_config(&path);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("preset"));
    }

    #[test]
    fn valid_file_collects_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let root = dir.path().join("seq");
        fs::write(
            &path,
            format!(
                "DataSetRootDirectory: {}\ncalib: {}\nmode: 0\nnogui: 1\n",
                root.display(),
                root.join("camera.txt").display()
            ),
        )
        .unwrap();

        let result = validate_config(&path);
        assert!(result.valid);
        let summary = result.summary.unwrap();
        assert_eq!(summary.mode, PhotometricMode::Calibrated);
        assert!(summary.sinks.is_empty());

        let warnings = result.warnings.unwrap();
        assert!(warnings.iter().any(|w| w.contains("Image directory not found")));
        assert!(warnings.iter().any(|w| w.contains("gamma")));
        assert!(warnings.iter().any(|w| w.contains("No output sinks")));
    }
}
