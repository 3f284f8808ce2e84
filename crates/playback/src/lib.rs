//! # Playback
//!
//! 回放调度与双目同步。
//!
//! 负责：
//! - 由时间戳和速度因子生成每帧播放时刻 (`PlaybackScheduler`)
//! - 左右目按位置配对 (`DualStreamSynchronizer`)
//! - 实时节拍控制：等待 / 继续 / 跳帧 (`PacingClock`)
//! - 取帧策略：按需 / 预取 / 预加载
//!
//! ## 使用示例
//!
//! ```ignore
//! use playback::{DualStreamSynchronizer, PaceDecision, PacingClock, PlaybackRange, SystemClock};
//!
//! let schedule = DualStreamSynchronizer::default()
//!     .build(left.as_ref(), right.as_ref(), PlaybackRange::forward(0, 100_000), 1.0);
//! let pacing = PacingClock::new(SystemClock, schedule.speed());
//! for step in schedule.steps() {
//!     let skipped = pacing.pace(step.target_offset, step.index) == PaceDecision::Skip;
//!     // feed the engine
//! }
//! ```

mod fetch;
mod pacing;
mod schedule;
mod synchronizer;

pub use fetch::{
    open_fetcher, open_fetcher_until, FetchMode, FrameFetcher, LazyFetcher, PrefetchFetcher, PreloadedFetcher,
    SourcePair, StereoPair, PREFETCH_DEPTH,
};
pub use pacing::{
    decide, skip_threshold, Clock, ManualClock, PaceDecision, PacingClock, SystemClock,
};
pub use schedule::{compute_offsets, PlaybackRange, PlaybackSchedule, PlaybackScheduler};
pub use synchronizer::{
    DualStreamSynchronizer, StereoSchedule, StereoStep, DEFAULT_TIMESTAMP_TOLERANCE,
};

use contracts::PlaybackSettings;

impl From<&PlaybackSettings> for PlaybackRange {
    fn from(settings: &PlaybackSettings) -> Self {
        Self {
            start: settings.start,
            end: settings.end,
            direction: settings.direction,
        }
    }
}
