//! # Outputs
//!
//! 引擎输出端。
//!
//! 负责：
//! - 按配置创建 sinks（日志 / 终端可视化 / 深度图保存）
//! - 慢 sink 丢弃而不阻塞送帧线程
//! - `reset()` / `join()` 生命周期

pub mod error;
pub mod metrics;
pub mod sinks;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use contracts::{OutputSettings, OutputSink, SinkSet};
use tracing::{info, instrument};

pub use error::OutputError;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{
    depth_preview, prepare_image_dir, viewer, ImageSaveSink, SampleOutputSink, ViewerCloser,
    ViewerLoop, ViewerSink, ViewerSummary,
};

/// Sinks of one run plus the viewer loop, if any
pub struct Outputs {
    pub sinks: SinkSet,
    /// Must run on the presentation thread
    pub viewer: Option<ViewerLoop>,
    pub image_dir: Option<PathBuf>,
}

impl Outputs {
    pub fn viewer_closer(&self) -> Option<ViewerCloser> {
        self.viewer.as_ref().map(ViewerLoop::closer)
    }
}

/// Create the sinks selected by `settings`
///
/// With image saving on, `image_dir` is removed and recreated.
#[instrument(name = "outputs_create", skip(settings))]
pub fn create_outputs(
    settings: &OutputSettings,
    image_dir: &Path,
) -> Result<Outputs, OutputError> {
    let mut selected: Vec<Arc<dyn OutputSink>> = Vec::new();
    let mut viewer_loop = None;
    let mut saved_dir = None;

    if settings.viewer {
        let (sink, presentation) = sinks::viewer("viewer", sinks::DEFAULT_VIEWER_QUEUE);
        selected.push(Arc::new(sink));
        viewer_loop = Some(presentation);
    }

    if settings.sample_output {
        selected.push(Arc::new(SampleOutputSink::new("sample")));
    }

    if settings.save_images {
        prepare_image_dir(image_dir)?;
        let sink = ImageSaveSink::spawn("images", image_dir, sinks::DEFAULT_IMAGE_QUEUE)?;
        selected.push(Arc::new(sink));
        saved_dir = Some(image_dir.to_path_buf());
    }

    let sinks = SinkSet::new(selected);
    info!(sinks = ?sinks, "outputs created");

    Ok(Outputs {
        sinks,
        viewer: viewer_loop,
        image_dir: saved_dir,
    })
}
