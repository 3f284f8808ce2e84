//! `times.txt` parsing
//!
//! One line per frame: `<id> <timestamp seconds> [<exposure ms>]`.
//! The id column is ignored; lines are matched to images by order.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{DatasetError, Result};

pub const TIMES_FILE_NAME: &str = "times.txt";

/// Per-frame timing read from `times.txt`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameTimes {
    pub timestamps: Vec<f64>,
    pub exposures: Vec<f32>,
}

impl FrameTimes {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Parse the content of a times file
pub fn parse_times(content: &str) -> FrameTimes {
    let mut times = FrameTimes::default();
    let mut ignored = 0usize;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace().skip(1);
        let Some(Ok(timestamp)) = fields.next().map(str::parse::<f64>) else {
            ignored += 1;
            continue;
        };
        let exposure = fields
            .next()
            .and_then(|v| v.parse::<f32>().ok())
            .unwrap_or(0.0);
        times.timestamps.push(timestamp);
        times.exposures.push(exposure);
    }

    if ignored > 0 {
        debug!(ignored, "ignored malformed lines in times file");
    }
    fill_missing_exposures(&mut times.exposures);
    times
}

/// Locate the times file of an image directory
///
/// Looks inside the directory first, then next to it.
pub fn find_times_file(image_dir: &Path) -> Option<PathBuf> {
    let inside = image_dir.join(TIMES_FILE_NAME);
    if inside.is_file() {
        return Some(inside);
    }
    let beside = image_dir.parent()?.join(TIMES_FILE_NAME);
    beside.is_file().then_some(beside)
}

/// Load timing for `frame_count` images
///
/// A missing file or a count mismatch yields all-zero timing.
pub fn load_times(image_dir: &Path, frame_count: usize) -> Result<FrameTimes> {
    let zeros = || FrameTimes {
        timestamps: vec![0.0; frame_count],
        exposures: vec![0.0; frame_count],
    };

    let Some(path) = find_times_file(image_dir) else {
        warn!(dir = %image_dir.display(), "no times file, timestamps set to zero");
        return Ok(zeros());
    };

    let content = std::fs::read_to_string(&path).map_err(|source| DatasetError::Read {
        path: path.clone(),
        source,
    })?;
    let times = parse_times(&content);

    if times.len() != frame_count {
        warn!(
            path = %path.display(),
            entries = times.len(),
            frame_count,
            "times file does not match image count, timestamps set to zero"
        );
        return Ok(zeros());
    }

    debug!(path = %path.display(), entries = times.len(), "loaded frame times");
    Ok(times)
}

/// Replace zero exposures with the mean of their valid neighbours
///
/// If any exposure stays unknown, all exposures are cleared.
fn fill_missing_exposures(exposures: &mut [f32]) {
    let n = exposures.len();
    for i in 0..n {
        if exposures[i] > 0.0 {
            continue;
        }
        let prev = i.checked_sub(1).map(|p| exposures[p]).filter(|e| *e > 0.0);
        let next = exposures.get(i + 1).copied().filter(|e| *e > 0.0);
        exposures[i] = match (prev, next) {
            (Some(p), Some(n)) => 0.5 * (p + n),
            (Some(v), None) | (None, Some(v)) => v,
            (None, None) => 0.0,
        };
    }

    if exposures.iter().any(|e| *e <= 0.0) {
        exposures.iter_mut().for_each(|e| *e = 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_timestamps_and_exposures() {
        let content = "\
# id timestamp exposure
000000 1403636579.763555 12.5
000001 1403636579.813555 13.5
000002 1403636579.863555 14.5
";
        let times = parse_times(content);
        assert_eq!(times.len(), 3);
        assert!((times.timestamps[1] - 1403636579.813555).abs() < 1e-6);
        assert_eq!(times.exposures, vec![12.5, 13.5, 14.5]);
    }

    #[test]
    fn missing_exposure_column_clears_exposures() {
        let times = parse_times("0 0.0\n1 0.1\n");
        assert_eq!(times.timestamps, vec![0.0, 0.1]);
        assert_eq!(times.exposures, vec![0.0, 0.0]);
    }

    #[test]
    fn single_gap_is_interpolated() {
        let times = parse_times("0 0.0 10\n1 0.1 0\n2 0.2 20\n");
        assert_eq!(times.exposures, vec![10.0, 15.0, 20.0]);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let times = parse_times("0 0.0 1\ngarbage\n2 abc\n3 0.3 1\n");
        assert_eq!(times.timestamps, vec![0.0, 0.3]);
    }

    #[test]
    fn count_mismatch_yields_zeros() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("left");
        std::fs::create_dir(&images).unwrap();
        std::fs::write(dir.path().join(TIMES_FILE_NAME), "0 1.0\n1 2.0\n").unwrap();

        let times = load_times(&images, 3).unwrap();
        assert_eq!(times.timestamps, vec![0.0; 3]);

        let times = load_times(&images, 2).unwrap();
        assert_eq!(times.timestamps, vec![1.0, 2.0]);
    }

    #[test]
    fn times_file_inside_directory_wins() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("right");
        std::fs::create_dir(&images).unwrap();
        std::fs::write(dir.path().join(TIMES_FILE_NAME), "0 1.0\n").unwrap();
        std::fs::write(images.join(TIMES_FILE_NAME), "0 5.0\n").unwrap();

        assert_eq!(find_times_file(&images), Some(images.join(TIMES_FILE_NAME)));
        assert_eq!(load_times(&images, 1).unwrap().timestamps, vec![5.0]);
    }
}
