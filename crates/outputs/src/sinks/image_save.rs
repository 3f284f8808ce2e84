//! ImageSaveSink - writes depth previews as PNG files
//!
//! Encoding happens on a worker thread fed through a bounded queue. A full
//! queue drops the preview instead of stalling the ingestion thread.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use contracts::{FrameId, InverseDepthMap, OutputSink};
use image::GrayImage;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use crate::error::OutputError;
use crate::metrics::SinkMetrics;

pub const DEFAULT_IMAGE_QUEUE: usize = 16;

/// Remove and recreate the image output directory
pub fn prepare_image_dir(path: &Path) -> Result<(), OutputError> {
    let wrap = |source| OutputError::ImageDir {
        path: path.to_path_buf(),
        source,
    };
    if path.exists() {
        fs::remove_dir_all(path).map_err(wrap)?;
    }
    fs::create_dir_all(path).map_err(wrap)?;
    info!(path = %path.display(), "image output directory recreated");
    Ok(())
}

/// First channel scaled to 0..255 by its maximum
pub fn depth_preview(depth: &InverseDepthMap) -> GrayImage {
    let max = depth
        .as_slice()
        .iter()
        .map(|v| v[0])
        .fold(0.0f32, f32::max);
    let scale = if max > 0.0 { 255.0 / max } else { 0.0 };
    GrayImage::from_fn(depth.width(), depth.height(), |x, y| {
        let v = depth.get(x, y).map_or(0.0, |v| v[0]);
        image::Luma([(v * scale).clamp(0.0, 255.0) as u8])
    })
}

struct Job {
    frame_id: FrameId,
    preview: GrayImage,
}

pub struct ImageSaveSink {
    name: String,
    dir: PathBuf,
    tx: Mutex<Option<mpsc::Sender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    metrics: Arc<SinkMetrics>,
}

impl ImageSaveSink {
    /// Start the writer thread; `dir` must exist
    pub fn spawn(
        name: impl Into<String>,
        dir: impl Into<PathBuf>,
        queue_capacity: usize,
    ) -> Result<Self, OutputError> {
        let name = name.into();
        let dir = dir.into();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let metrics = Arc::new(SinkMetrics::new());

        let worker_dir = dir.clone();
        let worker_name = name.clone();
        let worker_metrics = Arc::clone(&metrics);
        let worker = thread::Builder::new()
            .name(format!("sink-{name}"))
            .spawn(move || image_worker(rx, worker_dir, worker_metrics, worker_name))
            .map_err(|source| OutputError::Worker {
                name: name.clone(),
                source,
            })?;

        Ok(Self {
            name,
            dir,
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            metrics,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }
}

impl OutputSink for ImageSaveSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn push_depth_image(&self, frame_id: FrameId, depth: &InverseDepthMap) {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = tx.as_ref() else {
            return;
        };
        let job = Job {
            frame_id,
            preview: depth_preview(depth),
        };
        match tx.try_send(job) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(job)) => {
                self.metrics.inc_dropped();
                warn!(sink = %self.name, frame = job.frame_id, "queue full, preview dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(sink = %self.name, "image worker closed unexpectedly");
            }
        }
    }

    fn reset(&self) {
        self.metrics.inc_resets();
        debug!(sink = %self.name, "reset");
    }

    #[instrument(name = "image_sink_join", skip(self), fields(sink = %self.name))]
    fn join(&self) {
        self.metrics.inc_joins();
        drop(self.tx.lock().unwrap_or_else(PoisonError::into_inner).take());
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            if worker.join().is_err() {
                error!(sink = %self.name, "image worker panicked");
            }
        }
    }
}

fn image_worker(
    mut rx: mpsc::Receiver<Job>,
    dir: PathBuf,
    metrics: Arc<SinkMetrics>,
    name: String,
) {
    debug!(sink = %name, "image worker started");
    while let Some(job) = rx.blocking_recv() {
        let path = dir.join(format!("depth_{:05}.png", job.frame_id));
        match job.preview.save(&path) {
            Ok(()) => metrics.inc_depth_images(),
            Err(e) => {
                metrics.inc_failures();
                error!(sink = %name, path = %path.display(), error = %e, "write failed");
            }
        }
    }
    debug!(sink = %name, "image worker stopped");
}
