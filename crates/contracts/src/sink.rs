//! OutputSink trait - engine result consumers
//!
//! Sinks outlive every engine instance. The driver owns the list as a
//! `SinkSet` and hands clones of it to each engine it builds.

use std::fmt;
use std::sync::Arc;

use nalgebra::Isometry3;
use serde::{Deserialize, Serialize};

use crate::{FrameId, InverseDepthMap};

/// Camera pose published by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CamPose {
    /// Frame the pose belongs to
    pub frame_id: FrameId,

    /// Source timestamp (seconds)
    pub timestamp: f64,

    /// Camera-to-world transform
    pub pose: Isometry3<f64>,
}

/// External consumer of engine results
///
/// All methods take `&self`; implementations synchronize internally
/// because the presentation thread may read what the ingestion thread writes.
pub trait OutputSink: Send + Sync {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// New camera pose
    fn publish_cam_pose(&self, _pose: &CamPose) {}

    /// New depth preview for a frame
    fn push_depth_image(&self, _frame_id: FrameId, _depth: &InverseDepthMap) {}

    /// Called once per engine reconstruction, between teardown and rebuild
    fn reset(&self);

    /// Block until background work of the sink has completed
    fn join(&self);
}

/// Shared, ordered list of output sinks
///
/// Cloning is cheap and keeps identity: two clones compare equal with
/// [`SinkSet::same_as`].
#[derive(Clone)]
pub struct SinkSet(Arc<[Arc<dyn OutputSink>]>);

impl SinkSet {
    pub fn new(sinks: Vec<Arc<dyn OutputSink>>) -> Self {
        Self(sinks.into())
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn OutputSink>> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Same underlying list (pointer identity)
    pub fn same_as(&self, other: &SinkSet) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|s| s.name().to_string()).collect()
    }

    pub fn reset_all(&self) {
        for sink in self.0.iter() {
            sink.reset();
        }
    }

    pub fn join_all(&self) {
        for sink in self.0.iter() {
            sink.join();
        }
    }

    pub fn publish_cam_pose(&self, pose: &CamPose) {
        for sink in self.0.iter() {
            sink.publish_cam_pose(pose);
        }
    }

    pub fn push_depth_image(&self, frame_id: FrameId, depth: &InverseDepthMap) {
        for sink in self.0.iter() {
            sink.push_depth_image(frame_id, depth);
        }
    }
}

impl fmt::Debug for SinkSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter().map(|s| s.name())).finish()
    }
}
