//! SampleOutputSink - logs poses and depth summaries via tracing

use std::sync::Arc;

use contracts::{CamPose, FrameId, InverseDepthMap, OutputSink};
use tracing::{debug, info};

use crate::metrics::SinkMetrics;

/// Prints every published pose; for debugging and scripting
pub struct SampleOutputSink {
    name: String,
    metrics: Arc<SinkMetrics>,
}

impl SampleOutputSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metrics: Arc::new(SinkMetrics::new()),
        }
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }
}

impl OutputSink for SampleOutputSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn publish_cam_pose(&self, pose: &CamPose) {
        self.metrics.inc_poses();
        let t = pose.pose.translation.vector;
        let q = pose.pose.rotation.quaternion();
        info!(
            sink = %self.name,
            frame = pose.frame_id,
            time = pose.timestamp,
            position = format!("[{:.4}, {:.4}, {:.4}]", t.x, t.y, t.z),
            rotation = format!("[{:.4}, {:.4}, {:.4}, {:.4}]", q.i, q.j, q.k, q.w),
            "OUT: current frame"
        );
    }

    fn push_depth_image(&self, frame_id: FrameId, depth: &InverseDepthMap) {
        self.metrics.inc_depth_images();
        debug!(
            sink = %self.name,
            frame = frame_id,
            valid = depth.valid_count(),
            width = depth.width(),
            height = depth.height(),
            "OUT: depth image"
        );
    }

    fn reset(&self) {
        self.metrics.inc_resets();
        info!(sink = %self.name, "OUT: got reset");
    }

    fn join(&self) {
        self.metrics.inc_joins();
        debug!(sink = %self.name, "OUT: joined");
    }
}
