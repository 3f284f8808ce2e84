//! Terminal viewer
//!
//! `ViewerSink` forwards engine output to a `ViewerLoop` that runs on the
//! presentation thread. The loop ends when closed through a
//! [`ViewerCloser`] or when every sender is gone.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use contracts::{CamPose, FrameId, InverseDepthMap, OutputSink};
use tokio::sync::{mpsc, Notify};
use tracing::{debug, info, instrument, warn};

use crate::metrics::SinkMetrics;

pub const DEFAULT_VIEWER_QUEUE: usize = 256;

/// Poses between two progress lines
const PROGRESS_EVERY: usize = 100;

/// Camera centre in world coordinates
pub type Position = [f64; 3];

#[derive(Debug, Clone, PartialEq)]
enum ViewerEvent {
    Pose {
        frame_id: FrameId,
        position: Position,
    },
    Depth {
        frame_id: FrameId,
        valid: usize,
    },
    Reset,
}

/// Closes the viewer loop from any thread
#[derive(Debug, Clone)]
pub struct ViewerCloser {
    notify: Arc<Notify>,
    closed: Arc<AtomicBool>,
}

impl ViewerCloser {
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.notify.notify_one();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// What the viewer showed before closing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewerSummary {
    pub poses: usize,
    pub depth_images: usize,
    pub resets: usize,
    pub last_frame: Option<FrameId>,
    pub last_position: Option<Position>,
    /// Trajectory length since the last reset
    pub path_length: f64,
}

/// Presentation loop fed by [`ViewerSink`]
pub struct ViewerLoop {
    rx: mpsc::Receiver<ViewerEvent>,
    closer: ViewerCloser,
}

impl ViewerLoop {
    pub fn closer(&self) -> ViewerCloser {
        self.closer.clone()
    }

    /// Present events until closed
    #[instrument(name = "viewer_loop", skip(self))]
    pub async fn run(mut self) -> ViewerSummary {
        let mut summary = ViewerSummary::default();
        info!("viewer started");

        loop {
            tokio::select! {
                biased;
                _ = self.closer.notify.notified() => break,
                event = self.rx.recv() => match event {
                    Some(event) => present(&mut summary, event),
                    None => break,
                },
            }
        }

        self.closer.closed.store(true, Ordering::SeqCst);
        info!(
            poses = summary.poses,
            resets = summary.resets,
            path_length = summary.path_length,
            "viewer closed"
        );
        summary
    }
}

fn present(summary: &mut ViewerSummary, event: ViewerEvent) {
    match event {
        ViewerEvent::Pose { frame_id, position } => {
            if let Some(prev) = summary.last_position {
                let d: f64 = prev
                    .iter()
                    .zip(position.iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum();
                summary.path_length += d.sqrt();
            }
            summary.poses += 1;
            summary.last_frame = Some(frame_id);
            summary.last_position = Some(position);
            if summary.poses % PROGRESS_EVERY == 0 {
                info!(
                    frame = frame_id,
                    x = position[0],
                    y = position[1],
                    z = position[2],
                    path_length = summary.path_length,
                    "viewer"
                );
            }
        }
        ViewerEvent::Depth { frame_id, valid } => {
            summary.depth_images += 1;
            debug!(frame = frame_id, valid, "viewer depth");
        }
        ViewerEvent::Reset => {
            summary.resets += 1;
            summary.last_position = None;
            summary.path_length = 0.0;
            info!("viewer reset");
        }
    }
}

/// Sink half of the viewer
pub struct ViewerSink {
    name: String,
    tx: mpsc::Sender<ViewerEvent>,
    closer: ViewerCloser,
    metrics: Arc<SinkMetrics>,
}

/// Connected sink and loop
pub fn viewer(name: impl Into<String>, capacity: usize) -> (ViewerSink, ViewerLoop) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let closer = ViewerCloser {
        notify: Arc::new(Notify::new()),
        closed: Arc::new(AtomicBool::new(false)),
    };
    let sink = ViewerSink {
        name: name.into(),
        tx,
        closer: closer.clone(),
        metrics: Arc::new(SinkMetrics::new()),
    };
    (sink, ViewerLoop { rx, closer })
}

impl ViewerSink {
    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    pub fn closer(&self) -> ViewerCloser {
        self.closer.clone()
    }

    fn send(&self, event: ViewerEvent) {
        if self.closer.is_closed() {
            return;
        }
        if let Err(mpsc::error::TrySendError::Full(_)) = self.tx.try_send(event) {
            self.metrics.inc_dropped();
            warn!(sink = %self.name, "viewer queue full, event dropped");
        }
    }
}

impl OutputSink for ViewerSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn publish_cam_pose(&self, pose: &CamPose) {
        self.metrics.inc_poses();
        let t = pose.pose.translation.vector;
        self.send(ViewerEvent::Pose {
            frame_id: pose.frame_id,
            position: [t.x, t.y, t.z],
        });
    }

    fn push_depth_image(&self, frame_id: FrameId, depth: &InverseDepthMap) {
        self.metrics.inc_depth_images();
        self.send(ViewerEvent::Depth {
            frame_id,
            valid: depth.valid_count(),
        });
    }

    fn reset(&self) {
        self.metrics.inc_resets();
        self.send(ViewerEvent::Reset);
    }

    /// The loop runs on the presentation thread and has exited by now
    fn join(&self) {
        self.metrics.inc_joins();
        self.closer.close();
    }
}
