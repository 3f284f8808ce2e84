//! Layered error definitions
//!
//! Categorized by source: config / calibration / dataset / engine / sink

use thiserror::Error;

use crate::FrameId;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Calibration Errors =====
    /// Calibrated photometric mode without a photometric response
    #[error("photometric calibration missing: {message}")]
    CalibrationMissing { message: String },

    /// Calibration file present but unusable
    #[error("calibration error in '{path}': {message}")]
    Calibration { path: String, message: String },

    // ===== Dataset Errors =====
    /// Frame id outside of the stream
    #[error("frame {id} out of range for stream '{stream}' ({count} frames)")]
    FrameOutOfRange {
        stream: String,
        id: FrameId,
        count: usize,
    },

    /// Image decode error
    #[error("failed to decode '{path}': {message}")]
    Decode { path: String, message: String },

    // ===== Engine Errors =====
    /// Engine construction or persistence error
    #[error("engine error: {message}")]
    Engine { message: String },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create calibration error
    pub fn calibration(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Calibration {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create decode error
    pub fn decode(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create engine error
    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine {
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Whether this error belongs to the configuration category
    pub fn is_config(&self) -> bool {
        matches!(self, Self::ConfigParse { .. } | Self::ConfigValidation { .. })
    }
}
