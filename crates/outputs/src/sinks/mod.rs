//! Sink implementations
//!
//! Contains SampleOutputSink, ViewerSink and ImageSaveSink.

mod image_save;
mod sample;
mod viewer;

pub use self::image_save::{depth_preview, prepare_image_dir, ImageSaveSink, DEFAULT_IMAGE_QUEUE};
pub use self::sample::SampleOutputSink;
pub use self::viewer::{
    viewer, Position, ViewerCloser, ViewerLoop, ViewerSink, ViewerSummary, DEFAULT_VIEWER_QUEUE,
};
