//! 配置校验模块
//!
//! 校验规则：
//! - preset 在 0-3 之间
//! - start / end 非负
//! - rescale > 0 且有限
//! - playback_speed (如有) >= 0 且有限
//! - 数据集根目录与标定文件路径非空

use contracts::{ContractError, Preset, SettingsDocument};

/// 校验配置文档
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(doc: &SettingsDocument) -> Result<(), ContractError> {
    validate_preset(doc)?;
    validate_range(doc)?;
    validate_rescale(doc)?;
    validate_playback_speed(doc)?;
    validate_paths(doc)?;
    Ok(())
}

fn validate_preset(doc: &SettingsDocument) -> Result<(), ContractError> {
    if Preset::from_id(doc.preset).is_none() {
        return Err(ContractError::config_validation(
            "preset",
            format!("unknown preset {}, expected 0-3", doc.preset),
        ));
    }
    Ok(())
}

/// 校验帧范围
fn validate_range(doc: &SettingsDocument) -> Result<(), ContractError> {
    if doc.start < 0 {
        return Err(ContractError::config_validation(
            "start",
            format!("start must be >= 0, got {}", doc.start),
        ));
    }
    if doc.end < 0 {
        return Err(ContractError::config_validation(
            "end",
            format!("end must be >= 0, got {}", doc.end),
        ));
    }
    Ok(())
}

fn validate_rescale(doc: &SettingsDocument) -> Result<(), ContractError> {
    if !doc.rescale.is_finite() || doc.rescale <= 0.0 {
        return Err(ContractError::config_validation(
            "rescale",
            format!("rescale must be > 0, got {}", doc.rescale),
        ));
    }
    Ok(())
}

fn validate_playback_speed(doc: &SettingsDocument) -> Result<(), ContractError> {
    if let Some(speed) = doc.playback_speed {
        if !speed.is_finite() || speed < 0.0 {
            return Err(ContractError::config_validation(
                "playback_speed",
                format!("playback_speed must be finite and >= 0, got {speed}"),
            ));
        }
    }
    Ok(())
}

/// 校验必填路径
fn validate_paths(doc: &SettingsDocument) -> Result<(), ContractError> {
    if doc.dataset_root.as_os_str().is_empty() {
        return Err(ContractError::config_validation(
            "dataset_root",
            "dataset root directory cannot be empty",
        ));
    }
    if doc.calib.as_os_str().is_empty() {
        return Err(ContractError::config_validation(
            "calib",
            "calibration file path cannot be empty",
        ));
    }
    Ok(())
}
