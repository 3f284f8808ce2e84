//! Per-stream play schedule.

use contracts::{FrameSource, PlaybackDirection, PlaybackEntry};

/// Requested id range and traversal direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackRange {
    pub start: i64,
    pub end: i64,
    pub direction: PlaybackDirection,
}

impl PlaybackRange {
    pub fn forward(start: i64, end: i64) -> Self {
        Self {
            start,
            end,
            direction: PlaybackDirection::Forward,
        }
    }

    /// Loop bounds `(first, bound, increment)` for a stream of `count` frames
    ///
    /// Reverse traversal starts at `end - 1`, clamped to the last frame, and
    /// runs down to `start` inclusive.
    pub fn bounds(&self, count: usize) -> (i64, i64, i64) {
        let inc = self.direction.increment();
        match self.direction {
            PlaybackDirection::Forward => (self.start, self.end, inc),
            PlaybackDirection::Reverse => {
                let first = (self.end - 1).min(count as i64 - 1);
                (first, self.start - 1, inc)
            }
        }
    }

    /// Ids to play, in order
    pub fn ids(&self, count: usize) -> Vec<usize> {
        let (first, bound, inc) = self.bounds(count);
        let count = count as i64;
        let mut ids = Vec::new();
        let mut i = first;
        while i >= 0 && i < count && inc * i < inc * bound {
            ids.push(i as usize);
            i += inc;
        }
        ids
    }
}

/// Cumulative wall-clock offsets for consecutive timestamps
///
/// Speed 0 yields all-zero offsets.
pub fn compute_offsets(timestamps: &[f64], speed: f64) -> Vec<f64> {
    let mut offsets = Vec::with_capacity(timestamps.len());
    for (k, ts) in timestamps.iter().enumerate() {
        let offset = match k {
            0 => 0.0,
            _ if speed == 0.0 => 0.0,
            _ => offsets[k - 1] + (ts - timestamps[k - 1]).abs() / speed,
        };
        offsets.push(offset);
    }
    offsets
}

/// Immutable play order for one stream
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSchedule {
    entries: Vec<PlaybackEntry>,
    speed: f64,
}

/// Builds [`PlaybackSchedule`]s from a frame source
pub struct PlaybackScheduler;

impl PlaybackScheduler {
    pub fn build(source: &dyn FrameSource, range: PlaybackRange, speed: f64) -> PlaybackSchedule {
        let ids = range.ids(source.len());
        let timestamps: Vec<f64> = ids.iter().map(|&id| source.timestamp(id)).collect();
        PlaybackSchedule::from_parts(&ids, &timestamps, speed)
    }
}

impl PlaybackSchedule {
    pub fn from_parts(ids: &[usize], timestamps: &[f64], speed: f64) -> Self {
        let offsets = compute_offsets(timestamps, speed);
        let entries = ids
            .iter()
            .zip(offsets)
            .map(|(&frame_id, target_offset)| PlaybackEntry {
                frame_id,
                target_offset,
            })
            .collect();
        Self { entries, speed }
    }

    pub fn entries(&self) -> &[PlaybackEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&PlaybackEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }
}
