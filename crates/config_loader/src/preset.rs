//! Preset bundles
//!
//! A preset fixes the default playback speed, the preload mode, and the
//! engine's density and iteration limits.

use contracts::{Preset, PresetTuning};

/// Values implied by a preset before explicit overrides
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresetDefaults {
    pub playback_speed: f64,
    pub preload: bool,
    pub tuning: PresetTuning,
}

/// Cropped image width plus height the keyframe weights are scaled by
const SHIFT_WEIGHT_SCALE: f64 = 640.0 + 128.0;

pub fn defaults(preset: Preset) -> PresetDefaults {
    match preset {
        Preset::Default | Preset::DefaultRealtime => PresetDefaults {
            playback_speed: if preset == Preset::Default { 0.0 } else { 1.0 },
            preload: preset == Preset::DefaultRealtime,
            tuning: PresetTuning {
                immature_density: 1500,
                point_density: 2000,
                min_frames: 5,
                max_frames: 7,
                min_opt_iterations: 1,
                max_opt_iterations: 6,
                kf_global_weight: Some(0.3),
                max_shift_weights: Some([
                    0.04 * SHIFT_WEIGHT_SCALE,
                    0.04 * SHIFT_WEIGHT_SCALE,
                    0.02 * SHIFT_WEIGHT_SCALE,
                ]),
                benchmark_size: None,
            },
        },
        Preset::Fast | Preset::FastRealtime => PresetDefaults {
            playback_speed: if preset == Preset::Fast { 0.0 } else { 5.0 },
            preload: preset == Preset::FastRealtime,
            tuning: PresetTuning {
                immature_density: 600,
                point_density: 800,
                min_frames: 4,
                max_frames: 6,
                min_opt_iterations: 1,
                max_opt_iterations: 4,
                kf_global_weight: None,
                max_shift_weights: None,
                benchmark_size: Some((424, 320)),
            },
        },
    }
}

/// Human-readable summary, one line per setting
pub fn describe(preset: Preset) -> String {
    let d = defaults(preset);
    let kind = match preset {
        Preset::Default | Preset::DefaultRealtime => "DEFAULT",
        Preset::Fast | Preset::FastRealtime => "FAST",
    };
    let realtime = if d.playback_speed == 0.0 {
        "no real-time enforcing".to_string()
    } else {
        format!("{}x real-time enforcing", d.playback_speed)
    };
    let resolution = match d.tuning.benchmark_size {
        Some((w, h)) => format!("{w} x {h} image resolution"),
        None => "original image resolution".to_string(),
    };
    format!(
        "{kind} settings: {realtime}, {} active points, {}-{} active frames, \
         {}-{} LM iterations each KF, {resolution}",
        d.tuning.point_density,
        d.tuning.min_frames,
        d.tuning.max_frames,
        d.tuning.min_opt_iterations,
        d.tuning.max_opt_iterations,
    )
}
