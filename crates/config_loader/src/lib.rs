//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse YAML/TOML/JSON settings documents
//! - Validate configuration legality
//! - Expand presets and the photometric mode into `RunSettings`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let settings = ConfigLoader::load_from_path(Path::new("config.yaml")).unwrap();
//! println!("Dataset: {}", settings.dataset.root.display());
//! ```

mod parser;
mod preset;
mod resolve;
mod validator;

pub use contracts::{RunSettings, SettingsDocument};
pub use parser::ConfigFormat;
pub use preset::{defaults as preset_defaults, describe as describe_preset, PresetDefaults};
pub use resolve::resolve;

use contracts::ContractError;
use std::path::Path;

/// Default settings file name
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and resolve configuration from file path
    ///
    /// Automatically detects format from file extension (.yaml / .toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<RunSettings, ContractError> {
        let document = Self::load_document_from_path(path)?;
        resolve(&document)
    }

    /// Load and validate the raw document without resolving it
    pub fn load_document_from_path(path: &Path) -> Result<SettingsDocument, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_document_from_str(&content, format)
    }

    /// Load and resolve configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<RunSettings, ContractError> {
        let document = Self::load_document_from_str(content, format)?;
        resolve(&document)
    }

    pub fn load_document_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<SettingsDocument, ContractError> {
        let document = parser::parse(content, format)?;
        validator::validate(&document)?;
        Ok(document)
    }

    /// Serialize a document to YAML string
    pub fn to_yaml(document: &SettingsDocument) -> Result<String, ContractError> {
        serde_yaml::to_string(document)
            .map_err(|e| ContractError::config_parse(format!("YAML serialize error: {e}")))
    }

    /// Serialize a document to TOML string
    pub fn to_toml(document: &SettingsDocument) -> Result<String, ContractError> {
        toml::to_string_pretty(document)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize resolved settings to JSON string
    pub fn to_json(settings: &RunSettings) -> Result<String, ContractError> {
        serde_json::to_string_pretty(settings)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        std::fs::read_to_string(path).map_err(|e| ContractError::ConfigParse {
            message: format!("failed to open settings file at {}", path.display()),
            source: Some(Box::new(e)),
        })
    }
}
