//! Mock SLAM 引擎
//!
//! 用于无真实引擎环境的运行与测试，支持按帧 id 注入初始化失败、跟踪丢失
//! 与重置请求。

use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{
    CamPose, ContractError, DecodedFrame, EngineFactory, EngineSettings, EngineStatus, FrameId,
    GammaResponse, InverseDepthMap, ResetRequest, SinkSet, SlamEngine,
};
use nalgebra::{Isometry3, Vector3};
use tracing::{debug, info, instrument, warn};

/// 注入场景
#[derive(Debug, Clone, Default)]
pub struct MockScript {
    /// 每个实例接收多少帧后完成初始化
    pub init_after: usize,
    /// 未初始化时收到这些帧即初始化失败
    pub fail_init_on: HashSet<FrameId>,
    /// 收到该帧后跟踪丢失
    pub lose_on: Option<FrameId>,
    /// 收到该帧后请求完全重置
    pub request_reset_on: Option<FrameId>,
}

impl MockScript {
    pub fn new() -> Self {
        Self {
            init_after: 2,
            ..Default::default()
        }
    }
}

/// 所有实例共享的调用记录
#[derive(Debug, Default)]
pub struct EngineJournal {
    /// 已创建实例数
    pub created: usize,
    /// 已销毁实例数
    pub dropped: usize,
    /// (实例, 帧 id) 主输入调用
    pub ingested: Vec<(usize, FrameId)>,
    /// (实例, 帧 id) 深度估计调用
    pub stereo_matched: Vec<(usize, FrameId)>,
    /// 每个实例收到的 (gamma 是否存在, linearize)
    pub configured: Vec<(usize, bool, bool)>,
    /// 调用过 drain 的实例
    pub drained: Vec<usize>,
    /// 交还过 sink 的实例
    pub detached: Vec<usize>,
}

pub type SharedJournal = Arc<Mutex<EngineJournal>>;

fn lock(journal: &SharedJournal) -> MutexGuard<'_, EngineJournal> {
    journal.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 脚本驱动的引擎实例
pub struct MockEngine {
    instance: usize,
    script: MockScript,
    journal: SharedJournal,
    reset: ResetRequest,
    status: EngineStatus,
    frames_seen: usize,
    gamma: Option<GammaResponse>,
    linearize: bool,
    sinks: SinkSet,
    trajectory: Vec<CamPose>,
}

impl MockEngine {
    fn new(instance: usize, script: MockScript, journal: SharedJournal, reset: ResetRequest) -> Self {
        Self {
            instance,
            script,
            journal,
            reset,
            status: EngineStatus::default(),
            frames_seen: 0,
            gamma: None,
            linearize: false,
            sinks: SinkSet::empty(),
            trajectory: Vec::new(),
        }
    }

    pub fn instance(&self) -> usize {
        self.instance
    }

    pub fn trajectory(&self) -> &[CamPose] {
        &self.trajectory
    }

    fn record_config(&self) {
        lock(&self.journal).configured.push((
            self.instance,
            self.gamma.is_some(),
            self.linearize,
        ));
    }

    fn track(&mut self, frame: &DecodedFrame) {
        let k = self.trajectory.len() as f64;
        let pose = CamPose {
            frame_id: frame.id,
            timestamp: frame.timestamp,
            pose: Isometry3::new(
                Vector3::new(0.1 * k, 0.0, 0.0),
                Vector3::new(0.0, 0.01 * k, 0.0),
            ),
        };
        self.sinks.publish_cam_pose(&pose);
        self.trajectory.push(pose);
    }
}

impl SlamEngine for MockEngine {
    fn set_gamma_function(&mut self, gamma: Option<&GammaResponse>) {
        self.gamma = gamma.cloned();
        self.record_config();
    }

    fn set_linearize_operation(&mut self, linearize: bool) {
        self.linearize = linearize;
        self.record_config();
    }

    fn add_active_frame(&mut self, left: &DecodedFrame, _right: &DecodedFrame, id: FrameId) {
        lock(&self.journal).ingested.push((self.instance, id));
        if self.status.is_lost || self.status.init_failed {
            return;
        }
        self.frames_seen += 1;

        if self.script.request_reset_on == Some(id) {
            info!(instance = self.instance, id, "requesting full reset");
            self.reset.request();
        }

        if !self.status.initialized {
            if self.script.fail_init_on.contains(&id) {
                warn!(instance = self.instance, id, "initialization failed");
                self.status.init_failed = true;
                return;
            }
            if self.frames_seen >= self.script.init_after {
                info!(instance = self.instance, id, "initialized");
                self.status.initialized = true;
            }
        }

        if self.status.initialized {
            self.track(left);
            if self.script.lose_on == Some(id) {
                warn!(instance = self.instance, id, "tracking lost");
                self.status.is_lost = true;
            }
        }
    }

    fn stereo_match(
        &mut self,
        left: &DecodedFrame,
        right: &DecodedFrame,
        id: FrameId,
        out: &mut InverseDepthMap,
    ) {
        lock(&self.journal).stereo_matched.push((self.instance, id));
        let width = out.width().min(left.width).min(right.width);
        let height = out.height().min(left.height).min(right.height);
        for y in 0..height {
            for x in 0..width {
                let (Some(l), Some(r)) = (left.pixel(x, y), right.pixel(x, y)) else {
                    continue;
                };
                let disparity = (l - r).abs() / 255.0;
                out.set(x, y, [disparity, l / 255.0, 1.0]);
            }
        }
        self.sinks.push_depth_image(id, out);
    }

    fn status(&self) -> EngineStatus {
        self.status
    }

    fn attach_sinks(&mut self, sinks: SinkSet) {
        debug!(instance = self.instance, sinks = ?sinks, "sinks attached");
        self.sinks = sinks;
    }

    fn detach_sinks(&mut self) -> SinkSet {
        debug!(instance = self.instance, sinks = ?self.sinks, "sinks detached");
        lock(&self.journal).detached.push(self.instance);
        std::mem::replace(&mut self.sinks, SinkSet::empty())
    }

    fn sinks(&self) -> &SinkSet {
        &self.sinks
    }

    fn block_until_mapping_finished(&mut self) {
        lock(&self.journal).drained.push(self.instance);
    }

    #[instrument(name = "mock_engine_save_result", skip(self), fields(instance = self.instance))]
    fn save_result(&self, path: &Path) -> Result<(), ContractError> {
        let mut out = String::new();
        for cam in &self.trajectory {
            let t = cam.pose.translation.vector;
            let q = cam.pose.rotation.quaternion();
            let _ = writeln!(
                out,
                "{:.6} {} {} {} {} {} {} {}",
                cam.timestamp, t.x, t.y, t.z, q.i, q.j, q.k, q.w
            );
        }
        std::fs::write(path, out)?;
        info!(path = %path.display(), poses = self.trajectory.len(), "result saved");
        Ok(())
    }
}

impl Drop for MockEngine {
    fn drop(&mut self) {
        lock(&self.journal).dropped += 1;
    }
}

/// 构造 [`MockEngine`] 的工厂
pub struct MockEngineFactory {
    settings: Option<EngineSettings>,
    script: MockScript,
    journal: SharedJournal,
}

impl MockEngineFactory {
    pub fn new(script: MockScript) -> Self {
        Self {
            settings: None,
            script,
            journal: SharedJournal::default(),
        }
    }

    /// 记录运行配置，仅用于日志
    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn journal(&self) -> SharedJournal {
        self.journal.clone()
    }
}

impl EngineFactory for MockEngineFactory {
    type Engine = MockEngine;

    fn create(&self, reset: &ResetRequest) -> Result<MockEngine, ContractError> {
        let instance = {
            let mut journal = lock(&self.journal);
            journal.created += 1;
            journal.created - 1
        };
        match &self.settings {
            Some(settings) => info!(
                instance,
                mode = ?settings.photometric_mode,
                points = settings.tuning.point_density,
                multi_threading = settings.multi_threading,
                "created mock engine"
            ),
            None => info!(instance, "created mock engine"),
        }
        Ok(MockEngine::new(
            instance,
            self.script.clone(),
            self.journal.clone(),
            reset.clone(),
        ))
    }
}
