//! RunSettings - Config Loader 输出
//!
//! `SettingsDocument` 是配置文件的原始形态；`RunSettings` 是解析、预设展开
//! 与校验之后的不可变运行配置，构建一次后显式传递给各组件。

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::{PhotometricMode, PhotometricSettings, PlaybackDirection};

/// 原始配置文档
///
/// 键名使用 snake_case，同时接受原有的驼峰键名作为别名。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsDocument {
    /// 启用示例输出 sink
    #[serde(default, alias = "useSampleOutput", deserialize_with = "flag")]
    pub use_sample_output: bool,

    /// 安静模式
    #[serde(default, deserialize_with = "flag")]
    pub quiet: bool,

    /// 预设编号 (0-3)
    #[serde(default)]
    pub preset: u32,

    /// 允许运行时重配置
    #[serde(default = "default_true", deserialize_with = "flag")]
    pub rec: bool,

    /// 禁用 ROS 集成 (同时禁用重配置)
    #[serde(default, deserialize_with = "flag")]
    pub noros: bool,

    /// 禁用计时日志
    #[serde(default, deserialize_with = "flag")]
    pub nolog: bool,

    /// 禁用可视化窗口
    #[serde(default, deserialize_with = "flag")]
    pub nogui: bool,

    /// 禁用多线程
    #[serde(default, deserialize_with = "flag")]
    pub nomt: bool,

    /// 后台预取下一帧
    #[serde(default, deserialize_with = "flag")]
    pub prefetch: bool,

    /// 预加载全部帧 (缺省时由预设决定)
    #[serde(
        default,
        deserialize_with = "optional_flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub preload: Option<bool>,

    /// 起始帧 id
    #[serde(default)]
    pub start: i64,

    /// 结束帧 id (不含)
    #[serde(default = "default_end")]
    pub end: i64,

    /// 倒序回放 [end-1, start]
    #[serde(default, deserialize_with = "flag")]
    pub reverse: bool,

    /// 数据集根目录，包含 `left/` 与 `right/`
    #[serde(default, alias = "DataSetRootDirectory")]
    pub dataset_root: PathBuf,

    /// 几何标定文件
    #[serde(default)]
    pub calib: PathBuf,

    /// 渐晕图像
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vignette: Option<PathBuf>,

    /// 光度响应 (gamma) 文件
    #[serde(
        default,
        alias = "gammaCalib",
        skip_serializing_if = "Option::is_none"
    )]
    pub gamma_calib: Option<PathBuf>,

    /// 图像缩放系数
    #[serde(default = "default_rescale")]
    pub rescale: f64,

    /// 回放速度 (缺省时由预设决定；0 表示不限速)
    #[serde(
        default,
        alias = "playbackSpeed",
        skip_serializing_if = "Option::is_none"
    )]
    pub playback_speed: Option<f64>,

    /// 保存调试图像到 `images_out`
    #[serde(default, deserialize_with = "flag")]
    pub save: bool,

    /// 结果输出目录
    #[serde(
        default,
        alias = "SaveResultTo",
        skip_serializing_if = "Option::is_none"
    )]
    pub save_result_to: Option<PathBuf>,

    /// 光度模式选择器 (0: 标定, 1: 无标定, 2: 理想图像)
    #[serde(default)]
    pub mode: i64,
}

/// 布尔开关，兼容 0/1 写法
#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
}

impl From<Flag> for bool {
    fn from(flag: Flag) -> Self {
        match flag {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
        }
    }
}

fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Flag::deserialize(deserializer).map(bool::from)
}

fn optional_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    Option::<Flag>::deserialize(deserializer).map(|f| f.map(bool::from))
}

fn default_true() -> bool {
    true
}

fn default_end() -> i64 {
    100_000
}

fn default_rescale() -> f64 {
    1.0
}

impl Default for SettingsDocument {
    fn default() -> Self {
        Self {
            use_sample_output: false,
            quiet: false,
            preset: 0,
            rec: true,
            noros: false,
            nolog: false,
            nogui: false,
            nomt: false,
            prefetch: false,
            preload: None,
            start: 0,
            end: default_end(),
            reverse: false,
            dataset_root: PathBuf::new(),
            calib: PathBuf::new(),
            vignette: None,
            gamma_calib: None,
            rescale: default_rescale(),
            playback_speed: None,
            save: false,
            save_result_to: None,
            mode: 0,
        }
    }
}

/// 预设
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// 0: 默认参数，不限速
    #[default]
    Default,
    /// 1: 默认参数，1x 实时，预加载
    DefaultRealtime,
    /// 2: 快速参数，不限速
    Fast,
    /// 3: 快速参数，5x 实时，预加载
    FastRealtime,
}

impl Preset {
    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            0 => Some(Self::Default),
            1 => Some(Self::DefaultRealtime),
            2 => Some(Self::Fast),
            3 => Some(Self::FastRealtime),
            _ => None,
        }
    }

    pub fn id(self) -> u32 {
        match self {
            Self::Default => 0,
            Self::DefaultRealtime => 1,
            Self::Fast => 2,
            Self::FastRealtime => 3,
        }
    }
}

/// 预设决定的引擎参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PresetTuning {
    pub immature_density: u32,
    pub point_density: u32,
    pub min_frames: u32,
    pub max_frames: u32,
    pub min_opt_iterations: u32,
    pub max_opt_iterations: u32,

    /// 关键帧全局权重 (None 使用引擎默认值)
    pub kf_global_weight: Option<f64>,

    /// 平移 / 旋转 / 平移旋转 关键帧阈值权重
    pub max_shift_weights: Option<[f64; 3]>,

    /// 基准分辨率 (宽, 高)；None 表示原始分辨率
    pub benchmark_size: Option<(u32, u32)>,
}

/// 数据集路径与标定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSettings {
    pub root: PathBuf,
    pub calib: PathBuf,
    pub vignette: Option<PathBuf>,
    pub gamma_calib: Option<PathBuf>,
    pub rescale: f64,
}

impl DatasetSettings {
    /// 左目图像目录
    pub fn left_dir(&self) -> PathBuf {
        self.root.join("left")
    }

    /// 右目图像目录
    pub fn right_dir(&self) -> PathBuf {
        self.root.join("right")
    }
}

/// 回放参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSettings {
    pub start: i64,
    pub end: i64,
    pub direction: PlaybackDirection,

    /// 0 表示逐帧顺序处理，不做节拍控制
    pub speed: f64,
    pub preload: bool,
    pub prefetch: bool,
}

impl PlaybackSettings {
    /// 跟踪与建图是否串行执行
    pub fn linearize(&self) -> bool {
        self.speed == 0.0
    }
}

/// 交给引擎的参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    pub photometric_mode: PhotometricMode,
    pub photometric: PhotometricSettings,
    pub tuning: PresetTuning,
    pub multi_threading: bool,
    pub quiet: bool,
    pub log_stuff: bool,
    pub debug_save_images: bool,
}

/// 输出 sink 选择与文件输出
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputSettings {
    /// 可视化 sink (`nogui` 取反)
    pub viewer: bool,
    pub sample_output: bool,
    pub save_images: bool,

    /// 结果目录；None 表示当前目录
    pub result_dir: Option<PathBuf>,

    /// 写入 `logs/time.txt`
    pub timing_log: bool,
}

impl OutputSettings {
    pub const RESULT_FILE_NAME: &'static str = "result.txt";
    pub const IMAGES_OUT_DIR: &'static str = "images_out";

    /// 结果文件完整路径
    pub fn result_path(&self) -> PathBuf {
        self.result_dir
            .as_deref()
            .unwrap_or_else(|| Path::new("."))
            .join(Self::RESULT_FILE_NAME)
    }
}

/// 外部集成开关
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationToggles {
    pub disable_reconfigure: bool,
    pub disable_ros: bool,
}

/// 不可变运行配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    pub preset: Preset,
    pub dataset: DatasetSettings,
    pub playback: PlaybackSettings,
    pub engine: EngineSettings,
    pub outputs: OutputSettings,
    pub integration: IntegrationToggles,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_defaults() {
        let doc: SettingsDocument = serde_json::from_str("{}").unwrap();
        assert_eq!(doc, SettingsDocument::default());
        assert!(doc.rec);
        assert_eq!(doc.end, 100_000);
        assert_eq!(doc.rescale, 1.0);
        assert!(doc.playback_speed.is_none());
    }

    #[test]
    fn document_accepts_legacy_key_names() {
        let doc: SettingsDocument = serde_json::from_str(
            r#"{
                "useSampleOutput": true,
                "DataSetRootDirectory": "/data/seq00",
                "gammaCalib": "pcalib.txt",
                "playbackSpeed": 2.0,
                "SaveResultTo": "/tmp/out"
            }"#,
        )
        .unwrap();

        assert!(doc.use_sample_output);
        assert_eq!(doc.dataset_root, PathBuf::from("/data/seq00"));
        assert_eq!(doc.gamma_calib, Some(PathBuf::from("pcalib.txt")));
        assert_eq!(doc.playback_speed, Some(2.0));
        assert_eq!(doc.save_result_to, Some(PathBuf::from("/tmp/out")));
    }

    #[test]
    fn document_accepts_numeric_flags() {
        let doc: SettingsDocument =
            serde_json::from_str(r#"{ "nogui": 1, "rec": 0, "preload": 1, "save": false }"#)
                .unwrap();
        assert!(doc.nogui);
        assert!(!doc.rec);
        assert_eq!(doc.preload, Some(true));
        assert!(!doc.save);
    }

    #[test]
    fn result_path_defaults_to_current_dir() {
        let mut outputs = OutputSettings {
            viewer: false,
            sample_output: false,
            save_images: false,
            result_dir: None,
            timing_log: false,
        };
        assert_eq!(outputs.result_path(), PathBuf::from("./result.txt"));

        outputs.result_dir = Some(PathBuf::from("/tmp/run"));
        assert_eq!(outputs.result_path(), PathBuf::from("/tmp/run/result.txt"));
    }

    #[test]
    fn preset_ids() {
        for id in 0..4 {
            assert_eq!(Preset::from_id(id).map(Preset::id), Some(id));
        }
        assert_eq!(Preset::from_id(4), None);
    }
}
