//! Driver errors

use std::path::PathBuf;

use contracts::ContractError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    /// The factory could not build an engine instance
    #[error("failed to construct engine: {0}")]
    EngineConstruction(#[source] ContractError),

    /// Frames of a step could not be decoded
    #[error("failed to fetch frames for step {index}: {source}")]
    Fetch {
        index: usize,
        #[source]
        source: ContractError,
    },

    /// Result persistence failed after the drain
    #[error("failed to save result to '{}': {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: ContractError,
    },
}

pub type Result<T> = std::result::Result<T, DriverError>;
