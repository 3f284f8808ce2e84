//! Photometric mode and response contracts

use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Minimum number of entries in a gamma response
pub const GAMMA_MIN_ENTRIES: usize = 256;

/// Photometric handling selected by the `mode` setting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotometricMode {
    /// Photometric calibration available and used (mode 0)
    #[default]
    Calibrated,
    /// No calibration, affine brightness parameters optimized (mode 1)
    Uncalibrated,
    /// Synthetic / perfect images, affine brightness fixed (mode 2)
    Idealized,
}

impl PhotometricMode {
    /// Map the numeric selector; unknown values yield `None`
    pub fn from_selector(selector: i64) -> Option<Self> {
        match selector {
            0 => Some(Self::Calibrated),
            1 => Some(Self::Uncalibrated),
            2 => Some(Self::Idealized),
            _ => None,
        }
    }

    /// Engine flags implied by this mode
    pub fn settings(self) -> PhotometricSettings {
        match self {
            Self::Calibrated => PhotometricSettings {
                use_calibration: true,
                affine_opt_mode_a: AFFINE_PRIOR_DEFAULT,
                affine_opt_mode_b: AFFINE_PRIOR_DEFAULT,
                min_grad_hist_add: MIN_GRAD_HIST_ADD_DEFAULT,
            },
            Self::Uncalibrated => PhotometricSettings {
                use_calibration: false,
                affine_opt_mode_a: 0.0,
                affine_opt_mode_b: 0.0,
                min_grad_hist_add: MIN_GRAD_HIST_ADD_DEFAULT,
            },
            Self::Idealized => PhotometricSettings {
                use_calibration: false,
                affine_opt_mode_a: -1.0,
                affine_opt_mode_b: -1.0,
                min_grad_hist_add: 3.0,
            },
        }
    }

    /// Status line printed at startup
    pub fn describe(self) -> &'static str {
        match self {
            Self::Calibrated => "photometric mode with calibration",
            Self::Uncalibrated => "photometric mode without calibration",
            Self::Idealized => "photometric mode with perfect images",
        }
    }
}

const AFFINE_PRIOR_DEFAULT: f64 = 1e12;
const MIN_GRAD_HIST_ADD_DEFAULT: f64 = 7.0;

/// Photometric flags handed to the engine
///
/// Affine modes: -1 fixed, 0 optimized, > 0 optimized with that prior weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhotometricSettings {
    pub use_calibration: bool,
    pub affine_opt_mode_a: f64,
    pub affine_opt_mode_b: f64,
    pub min_grad_hist_add: f64,
}

impl Default for PhotometricSettings {
    fn default() -> Self {
        PhotometricMode::default().settings()
    }
}

/// Inverse camera response, normalized to [0, 255]
#[derive(Debug, Clone, PartialEq)]
pub struct GammaResponse {
    values: Vec<f32>,
}

impl GammaResponse {
    /// Validate and normalize raw response values
    ///
    /// # Errors
    /// Fewer than 256 entries, or entries not strictly increasing
    pub fn from_values(raw: Vec<f32>) -> Result<Self, ContractError> {
        if raw.len() < GAMMA_MIN_ENTRIES {
            return Err(ContractError::Other(format!(
                "gamma response has {} entries, expected at least {GAMMA_MIN_ENTRIES}",
                raw.len()
            )));
        }
        if raw.windows(2).any(|w| w[1] <= w[0]) {
            return Err(ContractError::Other(
                "gamma response is not strictly increasing".to_string(),
            ));
        }

        let min = raw[0];
        let max = raw[raw.len() - 1];
        let values = raw
            .into_iter()
            .map(|v| 255.0 * (v - min) / (max - min))
            .collect();
        Ok(Self { values })
    }

    /// Identity response with `GAMMA_MIN_ENTRIES` entries
    pub fn linear() -> Self {
        Self {
            values: (0..GAMMA_MIN_ENTRIES)
                .map(|i| 255.0 * i as f32 / (GAMMA_MIN_ENTRIES - 1) as f32)
                .collect(),
        }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Linearly interpolated lookup for a grey value in [0, 255]
    pub fn lookup(&self, grey: f32) -> f32 {
        let last = (self.values.len() - 1) as f32;
        let pos = (grey / 255.0 * last).clamp(0.0, last);
        let lo = pos.floor() as usize;
        let hi = (lo + 1).min(self.values.len() - 1);
        let frac = pos - lo as f32;
        self.values[lo] * (1.0 - frac) + self.values[hi] * frac
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_selector_mapping() {
        assert_eq!(
            PhotometricMode::from_selector(0),
            Some(PhotometricMode::Calibrated)
        );
        assert_eq!(
            PhotometricMode::from_selector(2),
            Some(PhotometricMode::Idealized)
        );
        assert_eq!(PhotometricMode::from_selector(7), None);
    }

    #[test]
    fn each_mode_sets_distinct_flags() {
        let calibrated = PhotometricMode::Calibrated.settings();
        let uncalibrated = PhotometricMode::Uncalibrated.settings();
        let idealized = PhotometricMode::Idealized.settings();

        assert!(calibrated.use_calibration);
        assert!(!uncalibrated.use_calibration);
        assert!(!idealized.use_calibration);

        assert_eq!(uncalibrated.affine_opt_mode_a, 0.0);
        assert_eq!(uncalibrated.affine_opt_mode_b, 0.0);
        assert_eq!(idealized.affine_opt_mode_a, -1.0);
        assert_eq!(idealized.affine_opt_mode_b, -1.0);
        assert_eq!(idealized.min_grad_hist_add, 3.0);
        assert_ne!(calibrated, uncalibrated);
        assert_ne!(uncalibrated, idealized);
    }

    #[test]
    fn gamma_response_normalizes() {
        let raw: Vec<f32> = (0..256).map(|i| 10.0 + 2.0 * i as f32).collect();
        let gamma = GammaResponse::from_values(raw).unwrap();
        assert_eq!(gamma.values()[0], 0.0);
        assert!((gamma.values()[255] - 255.0).abs() < 1e-3);
        assert!((gamma.lookup(127.5) - 127.5).abs() < 1e-2);
    }

    #[test]
    fn gamma_response_rejects_short_or_flat() {
        assert!(GammaResponse::from_values(vec![1.0; 10]).is_err());
        let mut raw: Vec<f32> = (0..256).map(|i| i as f32).collect();
        raw[100] = raw[99];
        assert!(GammaResponse::from_values(raw).is_err());
    }
}
