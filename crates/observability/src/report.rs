//! Throughput report printed after a run
//!
//! Frame count and recorded duration span the first and last processed
//! frames, so a run cut short by tracking loss or a stop reports only what it
//! played. "Single core" uses process CPU time, "multi core" uses wall time
//! since the final pacing epoch plus the epoch's schedule offset.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use metrics::gauge;

use crate::metrics::RunningStats;

/// Timing log written when logging is enabled
pub const TIMING_LOG_PATH: &str = "logs/time.txt";

/// Raw measurements of one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThroughputSample {
    pub first_frame_id: usize,
    pub last_frame_id: usize,
    pub first_timestamp: f64,
    pub last_timestamp: f64,
    /// Process CPU time
    pub cpu_time: Duration,
    /// Wall time since the last pacing re-anchor
    pub wall_time: Duration,
    /// Schedule offset of the last re-anchor (seconds)
    pub epoch_offset: f64,
    /// Images in the left stream, used by the timing log
    pub total_images: usize,
}

/// Derived throughput figures
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ThroughputReport {
    pub frames: usize,
    pub recorded_seconds: f64,
    pub single_core_ms: f64,
    pub multi_core_ms: f64,
    total_images: usize,
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

impl ThroughputReport {
    pub fn from_sample(sample: &ThroughputSample) -> Self {
        Self {
            frames: sample.first_frame_id.abs_diff(sample.last_frame_id),
            recorded_seconds: (sample.first_timestamp - sample.last_timestamp).abs(),
            single_core_ms: sample.cpu_time.as_secs_f64() * 1000.0,
            multi_core_ms: (sample.epoch_offset + sample.wall_time.as_secs_f64()) * 1000.0,
            total_images: sample.total_images,
        }
    }

    /// Recorded frame rate of the processed span
    pub fn recorded_fps(&self) -> f64 {
        ratio(self.frames as f64, self.recorded_seconds)
    }

    pub fn ms_per_frame_single(&self) -> f64 {
        ratio(self.single_core_ms, self.frames as f64)
    }

    pub fn ms_per_frame_multi(&self) -> f64 {
        ratio(self.multi_core_ms, self.frames as f64)
    }

    /// Recorded time over CPU time
    pub fn realtime_factor_single(&self) -> f64 {
        ratio(self.recorded_seconds * 1000.0, self.single_core_ms)
    }

    /// Recorded time over wall time
    pub fn realtime_factor_multi(&self) -> f64 {
        ratio(self.recorded_seconds * 1000.0, self.multi_core_ms)
    }

    /// `<ms per image single> <ms per image multi>`
    pub fn timing_log_line(&self) -> String {
        let images = self.total_images as f64;
        format!(
            "{} {}",
            ratio(self.single_core_ms, images),
            ratio(self.multi_core_ms, images)
        )
    }
}

impl fmt::Display for ThroughputReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "======================")?;
        writeln!(f, "{} Frames ({:.1} fps)", self.frames, self.recorded_fps())?;
        writeln!(f, "{:.2}ms per frame (single core);", self.ms_per_frame_single())?;
        writeln!(f, "{:.2}ms per frame (multi core);", self.ms_per_frame_multi())?;
        writeln!(f, "{:.3}x (single core);", self.realtime_factor_single())?;
        writeln!(f, "{:.3}x (multi core);", self.realtime_factor_multi())?;
        write!(f, "======================")
    }
}

/// Prints the end-of-run summary and writes the timing log
#[derive(Debug, Clone, Default)]
pub struct MetricsReporter {
    timing_log: Option<PathBuf>,
}

impl MetricsReporter {
    pub fn new(timing_log: Option<PathBuf>) -> Self {
        Self { timing_log }
    }

    /// Reporter writing to [`TIMING_LOG_PATH`] when `enabled`
    pub fn with_default_log(enabled: bool) -> Self {
        Self::new(enabled.then(|| PathBuf::from(TIMING_LOG_PATH)))
    }

    pub fn timing_log(&self) -> Option<&Path> {
        self.timing_log.as_deref()
    }

    pub fn report(
        &self,
        sample: &ThroughputSample,
        stereo_match_ms: &RunningStats,
    ) -> Result<ThroughputReport> {
        let report = ThroughputReport::from_sample(sample);

        println!("\n{report}");
        println!("stereo match (ms): {}\n", stereo_match_ms.summary());

        gauge!("stereo_vo_run_frames").set(report.frames as f64);
        gauge!("stereo_vo_run_ms_per_frame_multi").set(report.ms_per_frame_multi());
        gauge!("stereo_vo_run_realtime_factor").set(report.realtime_factor_multi());

        if let Some(path) = &self.timing_log {
            write_timing_log(path, &report)?;
            tracing::info!(path = %path.display(), "timing log written");
        }

        Ok(report)
    }
}

fn write_timing_log(path: &Path, report: &ThroughputReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    let mut file = fs::File::create(path)
        .with_context(|| format!("Failed to create timing log {}", path.display()))?;
    writeln!(file, "{}", report.timing_log_line())
        .with_context(|| format!("Failed to write timing log {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ThroughputSample {
        ThroughputSample {
            first_frame_id: 0,
            last_frame_id: 100,
            first_timestamp: 10.0,
            last_timestamp: 20.0,
            cpu_time: Duration::from_secs(4),
            wall_time: Duration::from_secs(3),
            epoch_offset: 2.0,
            total_images: 200,
        }
    }

    #[test]
    fn report_arithmetic() {
        let report = ThroughputReport::from_sample(&sample());

        assert_eq!(report.frames, 100);
        assert!((report.recorded_seconds - 10.0).abs() < 1e-9);
        assert!((report.recorded_fps() - 10.0).abs() < 1e-9);
        assert!((report.ms_per_frame_single() - 40.0).abs() < 1e-9);
        assert!((report.ms_per_frame_multi() - 50.0).abs() < 1e-9);
        assert!((report.realtime_factor_single() - 2.5).abs() < 1e-9);
        assert!((report.realtime_factor_multi() - 2.0).abs() < 1e-9);
        assert_eq!(report.timing_log_line(), "20 25");
    }

    #[test]
    fn reverse_run_counts_absolute_span() {
        let mut s = sample();
        std::mem::swap(&mut s.first_frame_id, &mut s.last_frame_id);
        std::mem::swap(&mut s.first_timestamp, &mut s.last_timestamp);

        let report = ThroughputReport::from_sample(&s);
        assert_eq!(report.frames, 100);
        assert!((report.recorded_seconds - 10.0).abs() < 1e-9);
    }

    #[test]
    fn empty_run_has_no_division_by_zero() {
        let report = ThroughputReport::from_sample(&ThroughputSample::default());
        assert_eq!(report.recorded_fps(), 0.0);
        assert_eq!(report.ms_per_frame_multi(), 0.0);
        assert_eq!(report.realtime_factor_single(), 0.0);
    }

    #[test]
    fn display_matches_banner() {
        let text = ThroughputReport::from_sample(&sample()).to_string();
        assert!(text.contains("100 Frames (10.0 fps)"));
        assert!(text.contains("40.00ms per frame (single core);"));
        assert!(text.contains("2.000x (multi core);"));
    }

    #[test]
    fn reporter_writes_timing_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("time.txt");
        let reporter = MetricsReporter::new(Some(path.clone()));

        reporter.report(&sample(), &RunningStats::default()).unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content.trim(), "20 25");
    }

    #[test]
    fn disabled_reporter_writes_nothing() {
        let reporter = MetricsReporter::with_default_log(false);
        assert!(reporter.timing_log().is_none());
        reporter.report(&sample(), &RunningStats::default()).unwrap();
    }
}
