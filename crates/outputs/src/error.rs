//! Output errors

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    /// Image output directory could not be recreated
    #[error("failed to prepare image directory '{}': {source}", path.display())]
    ImageDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Sink worker thread could not be started
    #[error("failed to start worker for sink '{name}': {source}")]
    Worker {
        name: String,
        #[source]
        source: std::io::Error,
    },
}
