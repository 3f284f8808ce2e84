//! Positional left/right pairing.
//!
//! Each stream gets its own schedule over the same range. Steps pair the
//! k-th left entry with the k-th right entry; pacing follows the left stream.

use contracts::{FrameId, FrameSource};
use tracing::{info, warn};

use crate::schedule::{PlaybackRange, PlaybackSchedule, PlaybackScheduler};

/// Paired timestamps further apart than this are reported once
pub const DEFAULT_TIMESTAMP_TOLERANCE: f64 = 1e-3;

/// One synchronized stereo step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StereoStep {
    /// Position in the stereo schedule
    pub index: usize,
    pub left_id: FrameId,
    pub right_id: FrameId,

    /// Pacing target (left stream)
    pub target_offset: f64,

    /// Right stream's own offset, diagnostic only
    pub right_offset: f64,
}

/// Synchronized stereo schedule, immutable once built
#[derive(Debug, Clone, PartialEq)]
pub struct StereoSchedule {
    steps: Vec<StereoStep>,
    speed: f64,
}

impl StereoSchedule {
    pub fn steps(&self) -> &[StereoStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn first(&self) -> Option<&StereoStep> {
        self.steps.first()
    }

    pub fn last(&self) -> Option<&StereoStep> {
        self.steps.last()
    }
}

/// Builds a [`StereoSchedule`] from two frame sources
#[derive(Debug, Clone, Copy)]
pub struct DualStreamSynchronizer {
    tolerance: f64,
}

impl Default for DualStreamSynchronizer {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TIMESTAMP_TOLERANCE,
        }
    }
}

impl DualStreamSynchronizer {
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn build(
        &self,
        left: &dyn FrameSource,
        right: &dyn FrameSource,
        range: PlaybackRange,
        speed: f64,
    ) -> StereoSchedule {
        let left_schedule = PlaybackScheduler::build(left, range, speed);
        let right_schedule = PlaybackScheduler::build(right, range, speed);
        let schedule = self.pair(&left_schedule, &right_schedule, left, right);

        info!(
            steps = schedule.len(),
            left = left_schedule.len(),
            right = right_schedule.len(),
            speed,
            "built stereo schedule"
        );
        schedule
    }

    fn pair(
        &self,
        left_schedule: &PlaybackSchedule,
        right_schedule: &PlaybackSchedule,
        left: &dyn FrameSource,
        right: &dyn FrameSource,
    ) -> StereoSchedule {
        if left_schedule.len() != right_schedule.len() {
            warn!(
                left = left_schedule.len(),
                right = right_schedule.len(),
                "stream schedules differ in length, truncating to the shorter"
            );
        }

        let mut reported = false;
        let steps = left_schedule
            .entries()
            .iter()
            .zip(right_schedule.entries())
            .enumerate()
            .map(|(index, (l, r))| {
                let delta = (left.timestamp(l.frame_id) - right.timestamp(r.frame_id)).abs();
                if delta > self.tolerance && !reported {
                    reported = true;
                    warn!(
                        index,
                        left_id = l.frame_id,
                        right_id = r.frame_id,
                        delta,
                        "left/right timestamps disagree"
                    );
                }
                StereoStep {
                    index,
                    left_id: l.frame_id,
                    right_id: r.frame_id,
                    target_offset: l.target_offset,
                    right_offset: r.target_offset,
                }
            })
            .collect();

        StereoSchedule {
            steps,
            speed: left_schedule.speed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataset::MockFrameSource;

    #[test]
    fn truncates_to_shorter_stream() {
        let left = MockFrameSource::uniform("left", 10, 10.0);
        let right = MockFrameSource::uniform("right", 7, 10.0);
        let schedule = DualStreamSynchronizer::default().build(
            &left,
            &right,
            PlaybackRange::forward(0, 100_000),
            1.0,
        );

        assert_eq!(schedule.len(), 7);
        for (k, step) in schedule.steps().iter().enumerate() {
            assert_eq!(step.index, k);
            assert_eq!(step.left_id, k);
            assert_eq!(step.right_id, k);
        }
    }

    #[test]
    fn pacing_follows_left_offsets() {
        let left = MockFrameSource::new("left", vec![0.0, 1.0, 3.0]);
        let right = MockFrameSource::new("right", vec![0.0, 2.0, 2.5]);
        let schedule = DualStreamSynchronizer::default().build(
            &left,
            &right,
            PlaybackRange::forward(0, 3),
            2.0,
        );

        let targets: Vec<f64> = schedule.steps().iter().map(|s| s.target_offset).collect();
        let right_offsets: Vec<f64> = schedule.steps().iter().map(|s| s.right_offset).collect();
        assert_eq!(targets, vec![0.0, 0.5, 1.5]);
        assert_eq!(right_offsets, vec![0.0, 1.0, 1.25]);
    }

    #[test]
    fn empty_when_range_outside_both_streams() {
        let left = MockFrameSource::uniform("left", 3, 10.0);
        let right = MockFrameSource::uniform("right", 3, 10.0);
        let schedule = DualStreamSynchronizer::default().build(
            &left,
            &right,
            PlaybackRange::forward(5, 10),
            1.0,
        );
        assert!(schedule.is_empty());
        assert!(schedule.first().is_none());
    }
}
