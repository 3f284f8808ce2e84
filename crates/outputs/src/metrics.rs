//! Per-sink counters

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct SinkMetrics {
    poses: AtomicU64,
    depth_images: AtomicU64,
    /// Items dropped because the worker queue was full
    dropped: AtomicU64,
    failures: AtomicU64,
    resets: AtomicU64,
    joins: AtomicU64,
}

impl SinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_poses(&self) {
        self.poses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_depth_images(&self) {
        self.depth_images.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failures(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_resets(&self) {
        self.resets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_joins(&self) {
        self.joins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            poses: self.poses.load(Ordering::Relaxed),
            depth_images: self.depth_images.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            resets: self.resets.load(Ordering::Relaxed),
            joins: self.joins.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`SinkMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub poses: u64,
    pub depth_images: u64,
    pub dropped: u64,
    pub failures: u64,
    pub resets: u64,
    pub joins: u64,
}
