//! Playback schedule types - PlaybackScheduler output

use serde::{Deserialize, Serialize};

use crate::FrameId;

/// One scheduled frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackEntry {
    /// Frame to play
    pub frame_id: FrameId,

    /// Wall-clock offset (seconds) at which the frame should be played,
    /// relative to the first entry
    pub target_offset: f64,
}

/// Traversal direction of a schedule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackDirection {
    #[default]
    Forward,
    Reverse,
}

impl PlaybackDirection {
    /// Signed index increment
    #[inline]
    pub fn increment(self) -> i64 {
        match self {
            Self::Forward => 1,
            Self::Reverse => -1,
        }
    }
}
