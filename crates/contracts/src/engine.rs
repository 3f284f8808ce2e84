//! SlamEngine trait - the consumed engine boundary
//!
//! The engine itself is external. The driver only needs to feed frames,
//! read status flags, swap instances, and persist results.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::{ContractError, DecodedFrame, FrameId, GammaResponse, InverseDepthMap, SinkSet};

/// Status flags reported by the engine after each ingestion call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStatus {
    /// Bootstrap finished
    pub initialized: bool,

    /// Bootstrap failed; the instance is unusable
    pub init_failed: bool,

    /// Tracking lost; the session is over
    pub is_lost: bool,
}

/// Shared "full reset requested" flag
///
/// Engines and sinks raise it; the recovery manager clears it after a swap.
#[derive(Debug, Clone, Default)]
pub struct ResetRequest(Arc<AtomicBool>);

impl ResetRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// One live SLAM engine instance
///
/// Owned exclusively by the ingestion thread.
pub trait SlamEngine: Send {
    /// Photometric response; `None` when running without calibration
    fn set_gamma_function(&mut self, gamma: Option<&GammaResponse>);

    /// Run tracking and mapping sequentially
    fn set_linearize_operation(&mut self, linearize: bool);

    /// Primary ingestion call for a stereo pair
    fn add_active_frame(&mut self, left: &DecodedFrame, right: &DecodedFrame, id: FrameId);

    /// Stereo depth estimation into a caller-provided buffer
    fn stereo_match(
        &mut self,
        left: &DecodedFrame,
        right: &DecodedFrame,
        id: FrameId,
        out: &mut InverseDepthMap,
    );

    fn status(&self) -> EngineStatus;

    /// Replace the attached sink list
    fn attach_sinks(&mut self, sinks: SinkSet);

    /// Hand the attached sinks back; the engine publishes nothing afterwards
    fn detach_sinks(&mut self) -> SinkSet;

    fn sinks(&self) -> &SinkSet;

    /// Wait for background mapping work to drain
    fn block_until_mapping_finished(&mut self);

    /// Write the estimated trajectory to `path`
    ///
    /// # Errors
    /// IO failures while writing the result file
    fn save_result(&self, path: &Path) -> Result<(), ContractError>;
}

/// Builds fresh engine instances with default settings
///
/// Every instance built by one factory shares the same reset flag.
pub trait EngineFactory: Send {
    type Engine: SlamEngine;

    /// # Errors
    /// Engine construction failures
    fn create(&self, reset: &ResetRequest) -> Result<Self::Engine, ContractError>;
}
