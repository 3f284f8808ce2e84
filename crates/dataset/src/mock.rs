//! Mock 帧源
//!
//! 用于无数据集环境的测试与演示。

use std::sync::atomic::{AtomicUsize, Ordering};

use contracts::{ContractError, DecodedFrame, FrameId, FrameSource};

/// 内存中的帧源
///
/// 每帧像素值为 `(id + x + y) % 256`，并记录解码次数。
#[derive(Debug)]
pub struct MockFrameSource {
    name: String,
    timestamps: Vec<f64>,
    width: u32,
    height: u32,
    loads: AtomicUsize,
}

impl MockFrameSource {
    /// 使用给定时间戳创建
    pub fn new(name: impl Into<String>, timestamps: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            timestamps,
            width: 16,
            height: 12,
            loads: AtomicUsize::new(0),
        }
    }

    /// 按固定帧率生成 `count` 帧
    pub fn uniform(name: impl Into<String>, count: usize, fps: f64) -> Self {
        let timestamps = (0..count).map(|i| i as f64 / fps).collect();
        Self::new(name, timestamps)
    }

    /// 设置图像尺寸
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// 已解码帧数
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl FrameSource for MockFrameSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> usize {
        self.timestamps.len()
    }

    fn timestamp(&self, id: FrameId) -> f64 {
        self.timestamps.get(id).copied().unwrap_or(0.0)
    }

    fn load(&self, id: FrameId) -> Result<DecodedFrame, ContractError> {
        if id >= self.timestamps.len() {
            return Err(ContractError::FrameOutOfRange {
                stream: self.name.clone(),
                id,
                count: self.timestamps.len(),
            });
        }
        self.loads.fetch_add(1, Ordering::SeqCst);

        let pixels = (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| ((id as u32 + x + y) % 256) as f32))
            .collect();
        DecodedFrame::new(
            id,
            self.timestamps[id],
            0.0,
            self.width,
            self.height,
            pixels,
        )
    }
}
