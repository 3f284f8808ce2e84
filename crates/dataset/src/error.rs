//! Dataset 错误类型

use std::path::PathBuf;

use contracts::{ContractError, FrameId};
use thiserror::Error;

/// Dataset 错误
#[derive(Debug, Error)]
pub enum DatasetError {
    /// 图像目录不存在
    #[error("image directory not found: {}", path.display())]
    DirectoryNotFound { path: PathBuf },

    /// 目录中没有图像
    #[error("no images found in {}", path.display())]
    NoImages { path: PathBuf },

    /// 读取文件或目录失败
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 图像解码失败
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// 标定文件格式错误
    #[error("invalid calibration file {}: {message}", path.display())]
    Calibration { path: PathBuf, message: String },

    /// 帧 id 越界
    #[error("frame {id} out of range for stream '{stream}' ({count} frames)")]
    OutOfRange {
        stream: String,
        id: FrameId,
        count: usize,
    },
}

impl DatasetError {
    pub(crate) fn calibration(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Calibration {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<DatasetError> for ContractError {
    fn from(err: DatasetError) -> Self {
        match err {
            DatasetError::OutOfRange { stream, id, count } => {
                ContractError::FrameOutOfRange { stream, id, count }
            }
            DatasetError::Decode { path, source } => {
                ContractError::decode(path.display().to_string(), source.to_string())
            }
            DatasetError::Calibration { path, message } => {
                ContractError::calibration(path.display().to_string(), message)
            }
            DatasetError::Read { source, .. } => ContractError::Io(source),
            other => ContractError::Other(other.to_string()),
        }
    }
}

/// Dataset Result 类型别名
pub type Result<T> = std::result::Result<T, DatasetError>;
