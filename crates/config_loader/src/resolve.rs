//! SettingsDocument -> RunSettings
//!
//! Applies the preset, the explicit overrides, and the photometric-mode
//! mapping. Emits one status line per enabled switch.

use std::path::PathBuf;

use contracts::{
    ContractError, DatasetSettings, EngineSettings, IntegrationToggles, OutputSettings,
    PhotometricMode, PlaybackDirection, PlaybackSettings, Preset, RunSettings, SettingsDocument,
};
use tracing::{info, warn};

use crate::preset;

/// Build the immutable run settings from a validated document
pub fn resolve(doc: &SettingsDocument) -> Result<RunSettings, ContractError> {
    let preset = Preset::from_id(doc.preset).ok_or_else(|| {
        ContractError::config_validation("preset", format!("unknown preset {}", doc.preset))
    })?;
    let defaults = preset::defaults(preset);
    info!(preset = preset.id(), "{}", preset::describe(preset));

    let photometric_mode = PhotometricMode::from_selector(doc.mode).unwrap_or_else(|| {
        warn!(mode = doc.mode, "unknown photometric mode, using calibrated");
        PhotometricMode::Calibrated
    });
    info!("{}", photometric_mode.describe());

    let speed = doc.playback_speed.unwrap_or(defaults.playback_speed);
    let preload = doc.preload.unwrap_or(defaults.preload);
    let disable_ros = doc.noros;
    let disable_reconfigure = !doc.rec || doc.noros;

    if doc.use_sample_output {
        info!("using sample output sink");
    }
    if doc.quiet {
        info!("quiet mode");
    }
    if disable_reconfigure {
        info!(disable_ros, "reconfigure disabled");
    }
    if doc.nolog {
        info!("timing log disabled");
    }
    if doc.nogui {
        info!("viewer disabled");
    }
    if doc.nomt {
        info!("multi-threading disabled");
    }
    if doc.prefetch {
        info!("prefetch enabled");
    }
    if doc.save {
        info!("saving images to {}", OutputSettings::IMAGES_OUT_DIR);
    }
    info!(
        start = doc.start,
        end = doc.end,
        reverse = doc.reverse,
        speed,
        preload,
        rescale = doc.rescale,
        "playback range"
    );
    info!(
        root = %doc.dataset_root.display(),
        calib = %doc.calib.display(),
        "dataset"
    );

    Ok(RunSettings {
        preset,
        dataset: DatasetSettings {
            root: doc.dataset_root.clone(),
            calib: doc.calib.clone(),
            vignette: non_empty(&doc.vignette),
            gamma_calib: non_empty(&doc.gamma_calib),
            rescale: doc.rescale,
        },
        playback: PlaybackSettings {
            start: doc.start,
            end: doc.end,
            direction: if doc.reverse {
                PlaybackDirection::Reverse
            } else {
                PlaybackDirection::Forward
            },
            speed,
            preload,
            prefetch: doc.prefetch,
        },
        engine: EngineSettings {
            photometric_mode,
            photometric: photometric_mode.settings(),
            tuning: defaults.tuning,
            multi_threading: !doc.nomt,
            quiet: doc.quiet,
            log_stuff: !doc.nolog,
            debug_save_images: doc.save,
        },
        outputs: OutputSettings {
            viewer: !doc.nogui,
            sample_output: doc.use_sample_output,
            save_images: doc.save,
            result_dir: non_empty(&doc.save_result_to),
            timing_log: !doc.nolog,
        },
        integration: IntegrationToggles {
            disable_reconfigure,
            disable_ros,
        },
    })
}

fn non_empty(path: &Option<PathBuf>) -> Option<PathBuf> {
    path.as_ref()
        .filter(|p| !p.as_os_str().is_empty())
        .cloned()
}
