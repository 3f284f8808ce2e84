//! # Dataset
//!
//! Stereo image sequences and their calibration.
//!
//! - `ImageFolderReader`: `FrameSource` over `<root>/left` and `<root>/right`
//! - `times.txt`: per-frame timestamps and exposures
//! - calibration: gamma response, vignette, geometric camera file
//! - `MockFrameSource`: in-memory frames for tests

mod calibration;
mod error;
mod mock;
mod reader;
mod timestamps;

pub use calibration::{
    load_gamma, load_geometric, load_vignette, GeometricCalibration, OutputMode,
    PhotometricUndistorter, Vignette,
};
pub use error::{DatasetError, Result};
pub use mock::MockFrameSource;
pub use reader::ImageFolderReader;
pub use timestamps::{parse_times, FrameTimes, TIMES_FILE_NAME};

use contracts::{DatasetSettings, FrameSource, GammaResponse};
use tracing::warn;

/// Both streams of a stereo dataset plus what the engine needs from calibration
#[derive(Debug)]
pub struct StereoDataset {
    pub left: ImageFolderReader,
    pub right: ImageFolderReader,
    pub geometric: GeometricCalibration,
    pub gamma: Option<GammaResponse>,
}

impl StereoDataset {
    /// Open `<root>/left` and `<root>/right` with shared calibration
    ///
    /// Photometric correction is applied to decoded frames only when
    /// `apply_photometric` is set and a gamma file is available.
    pub fn open(settings: &DatasetSettings, apply_photometric: bool) -> Result<Self> {
        let geometric = load_geometric(&settings.calib)?;
        let undistorter = load_photometric(settings)?;
        let gamma = undistorter.as_ref().map(|u| u.gamma().clone());

        let mut left = ImageFolderReader::open("left", settings.left_dir(), settings.rescale)?;
        let mut right = ImageFolderReader::open("right", settings.right_dir(), settings.rescale)?;
        if let (true, Some(undistorter)) = (apply_photometric, undistorter) {
            left = left.with_photometric(undistorter.clone());
            right = right.with_photometric(undistorter);
        }

        if left.len() != right.len() {
            warn!(
                left = left.len(),
                right = right.len(),
                "stereo streams differ in length, pairing truncates to the shorter"
            );
        }

        Ok(Self {
            left,
            right,
            geometric,
            gamma,
        })
    }

    pub fn summary(&self) -> [StreamSummary; 2] {
        [
            StreamSummary::of(&self.left),
            StreamSummary::of(&self.right),
        ]
    }
}

fn load_photometric(settings: &DatasetSettings) -> Result<Option<PhotometricUndistorter>> {
    let Some(gamma_path) = &settings.gamma_calib else {
        return Ok(None);
    };
    let gamma = load_gamma(gamma_path)?;
    let vignette = match &settings.vignette {
        Some(path) => Some(load_vignette(path)?),
        None => None,
    };
    Ok(Some(PhotometricUndistorter::new(gamma, vignette)))
}

/// Frame count and time span of one stream
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSummary {
    pub name: String,
    pub frames: usize,
    pub first_timestamp: f64,
    pub last_timestamp: f64,
}

impl StreamSummary {
    pub fn of(source: &dyn FrameSource) -> Self {
        let frames = source.len();
        Self {
            name: source.name().to_string(),
            frames,
            first_timestamp: source.timestamp(0),
            last_timestamp: frames.checked_sub(1).map_or(0.0, |i| source.timestamp(i)),
        }
    }

    pub fn span_seconds(&self) -> f64 {
        (self.last_timestamp - self.first_timestamp).abs()
    }

    /// Mean frame rate, 0 without timing information
    pub fn fps(&self) -> f64 {
        let span = self.span_seconds();
        if span > 0.0 && self.frames > 1 {
            (self.frames - 1) as f64 / span
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_of_mock_stream() {
        let source = MockFrameSource::uniform("left", 21, 20.0);
        let summary = StreamSummary::of(&source);
        assert_eq!(summary.frames, 21);
        assert!((summary.span_seconds() - 1.0).abs() < 1e-9);
        assert!((summary.fps() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn summary_without_timing() {
        let source = MockFrameSource::new("left", vec![0.0; 5]);
        assert_eq!(StreamSummary::of(&source).fps(), 0.0);
    }
}
