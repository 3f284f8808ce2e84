//! # Driver
//!
//! 引擎会话驱动：逐帧送入 SLAM 引擎、节拍控制、失败重建。
//!
//! - `EngineHandle`: 独占当前引擎实例及其输出端
//! - `SessionRecoveryManager`: 初始化失败或完全重置时重建引擎，输出端原样迁移
//! - `IngestionPipeline`: 每步的取帧 / 节拍 / 送入 / 恢复检查循环
//!
//! 只有运行管线的线程接触引擎实例。

mod error;
mod handle;
mod pipeline;
mod recovery;
mod stats;

pub use error::{DriverError, Result};
pub use handle::{EngineHandle, SessionConfig};
pub use pipeline::{scheduled_duration, IngestionPipeline};
pub use recovery::{
    RecoveryOutcome, RecoveryPolicy, SessionRecoveryManager, DEFAULT_RECOVERY_WINDOW,
};
pub use stats::{process_cpu_time, RunOutcome, RunReport, RunStats};
