//! Run outcome and statistics

use std::fmt;
use std::time::Duration;

use contracts::FrameId;
use observability::{RunningStats, ThroughputSample};

/// How the ingestion loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Schedule exhausted
    Completed,
    /// Engine reported tracking loss
    TrackingLost,
    /// Initialization failed after the recovery window
    InitializationAbandoned,
    /// Stop flag raised
    Interrupted,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Completed => "completed",
            Self::TrackingLost => "tracking lost",
            Self::InitializationAbandoned => "initialization abandoned",
            Self::Interrupted => "interrupted",
        };
        f.write_str(s)
    }
}

/// Counters collected by the ingestion loop
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Steps executed (skipped ones included)
    pub steps: usize,
    pub ingested: usize,
    pub skipped: usize,
    pub resets: usize,
    /// Depth-estimation call durations (ms)
    pub stereo_match_ms: RunningStats,
    pub first_frame_id: Option<FrameId>,
    pub last_frame_id: Option<FrameId>,
    pub first_timestamp: f64,
    pub last_timestamp: f64,
    /// Wall time since the final pacing epoch
    pub wall_time: Duration,
    /// Schedule offset of the final pacing epoch
    pub epoch_offset: f64,
    /// Process CPU time since the final pacing epoch
    pub cpu_time: Duration,
}

impl RunStats {
    pub(crate) fn record_frame(&mut self, id: FrameId, timestamp: f64) {
        if self.first_frame_id.is_none() {
            self.first_frame_id = Some(id);
            self.first_timestamp = timestamp;
        }
        self.last_frame_id = Some(id);
        self.last_timestamp = timestamp;
    }

    pub fn throughput_sample(&self, total_images: usize) -> ThroughputSample {
        ThroughputSample {
            first_frame_id: self.first_frame_id.unwrap_or_default(),
            last_frame_id: self.last_frame_id.unwrap_or_default(),
            first_timestamp: self.first_timestamp,
            last_timestamp: self.last_timestamp,
            cpu_time: self.cpu_time,
            wall_time: self.wall_time,
            epoch_offset: self.epoch_offset,
            total_images,
        }
    }
}

/// Result of a pipeline run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub stats: RunStats,
}

/// User plus system CPU time of this process
#[cfg(unix)]
pub fn process_cpu_time() -> Duration {
    let mut usage = std::mem::MaybeUninit::<libc::rusage>::zeroed();
    // SAFETY: getrusage only writes into the provided struct.
    let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, usage.as_mut_ptr()) };
    if rc != 0 {
        return Duration::ZERO;
    }
    // SAFETY: rc == 0 means the struct was filled in.
    let usage = unsafe { usage.assume_init() };
    let to_duration = |tv: libc::timeval| {
        Duration::from_secs(tv.tv_sec.max(0) as u64)
            + Duration::from_micros(tv.tv_usec.max(0) as u64)
    };
    to_duration(usage.ru_utime) + to_duration(usage.ru_stime)
}

#[cfg(not(unix))]
pub fn process_cpu_time() -> Duration {
    Duration::ZERO
}
