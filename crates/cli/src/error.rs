//! Error types for CLI operations.

use std::process::ExitCode;

use contracts::ContractError;
use dataset::DatasetError;
use driver::DriverError;
use outputs::OutputError;
use thiserror::Error;

/// Settings missing, unreadable or invalid
pub const EXIT_CONFIG: u8 = 255;
/// Calibration, dataset and runtime failures; interrupted runs
pub const EXIT_FAILURE: u8 = 1;
/// Initialization failed outside the recovery window
pub const EXIT_ABANDONED: u8 = 2;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Settings could not be loaded or validated
    #[error("Configuration error: {0}")]
    Config(#[source] ContractError),

    /// Calibrated mode without a photometric response
    #[error("{0}")]
    CalibrationMissing(#[source] ContractError),

    /// Dataset could not be opened
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    /// Frames could not be prepared before the run
    #[error("Frame loading failed: {0}")]
    Frames(#[source] ContractError),

    /// Output sinks could not be created
    #[error("Output setup failed: {0}")]
    Output(#[from] OutputError),

    /// Ingestion failed
    #[error("Pipeline execution failed: {0}")]
    Pipeline(#[from] DriverError),

    /// Generic error wrapper
    #[error("{0:#}")]
    Other(#[from] anyhow::Error),
}

impl CliError {
    pub fn exit_status(&self) -> u8 {
        match self {
            Self::Config(_) => EXIT_CONFIG,
            _ => EXIT_FAILURE,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
