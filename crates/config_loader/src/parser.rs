//! 配置解析模块
//!
//! 支持 YAML (默认)、TOML 和 JSON 格式。

use contracts::{ContractError, SettingsDocument};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML 格式 (默认 `config.yaml`)
    Yaml,
    /// TOML 格式
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 YAML 格式配置
///
/// 允许 OpenCV FileStorage 风格的 `%YAML:1.0` 首行。
pub fn parse_yaml(content: &str) -> Result<SettingsDocument, ContractError> {
    let body = strip_yaml_directive(content);
    if body.trim().is_empty() {
        return Ok(SettingsDocument::default());
    }
    serde_yaml::from_str(body).map_err(|e| ContractError::ConfigParse {
        message: format!("YAML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<SettingsDocument, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<SettingsDocument, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<SettingsDocument, ContractError> {
    match format {
        ConfigFormat::Yaml => parse_yaml(content),
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

fn strip_yaml_directive(content: &str) -> &str {
    let trimmed = content.trim_start();
    if trimmed.starts_with("%YAML") {
        match trimmed.find('\n') {
            Some(pos) => &trimmed[pos + 1..],
            None => "",
        }
    } else {
        content
    }
}
