//! 回放指标记录
//!
//! 所有指标名以 `stereo_vo_` 为前缀。未安装 recorder 时调用为空操作。

use metrics::{counter, gauge, histogram};

/// 记录一个已执行的回放步
///
/// 跳过的步不会送入引擎的主输入，但仍计入步数。
pub fn record_step(frame_id: usize, skipped: bool) {
    counter!("stereo_vo_steps_total").increment(1);
    if skipped {
        counter!("stereo_vo_frames_skipped_total").increment(1);
    } else {
        counter!("stereo_vo_frames_ingested_total").increment(1);
    }
    gauge!("stereo_vo_last_frame_id").set(frame_id as f64);
}

/// 深度估计调用耗时
pub fn record_stereo_match_ms(elapsed_ms: f64) {
    histogram!("stereo_vo_stereo_match_ms").record(elapsed_ms);
}

/// 节拍等待时长
pub fn record_pacing_wait_ms(wait_ms: f64) {
    histogram!("stereo_vo_pacing_wait_ms").record(wait_ms);
}

/// 引擎重置决策 (`recovered` / `declined`)
pub fn record_engine_reset(outcome: &'static str) {
    counter!("stereo_vo_engine_resets_total", "outcome" => outcome).increment(1);
}

pub fn record_tracking_lost() {
    counter!("stereo_vo_tracking_lost_total").increment(1);
}

/// 输出端生命周期事件 (`reset` / `join`)
pub fn record_sink_event(sink_name: &str, event: &'static str) {
    counter!(
        "stereo_vo_sink_events_total",
        "sink" => sink_name.to_string(),
        "event" => event
    )
    .increment(1);
}

/// 统计摘要
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计 (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
    total: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.total += value;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// 所有样本之和
    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary::from(self)
    }
}
