//! Exclusive ownership of the live engine instance

use contracts::{EngineFactory, EngineStatus, GammaResponse, ResetRequest, SinkSet, SlamEngine};
use tracing::debug;

use crate::error::{DriverError, Result};

/// Configuration every engine instance of a session is built with
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Photometric response handed to the engine (None = uncalibrated)
    pub gamma: Option<GammaResponse>,
    /// Tracking and mapping run sequentially (speed factor 0)
    pub linearize: bool,
}

/// One engine instance plus the sinks attached to it
///
/// Dropping the handle drops the engine. The sink set is shared and
/// outlives every instance; [`EngineHandle::release`] takes it back first.
pub struct EngineHandle<E: SlamEngine> {
    engine: E,
    sinks: SinkSet,
}

impl<E: SlamEngine> EngineHandle<E> {
    /// Construct, configure and attach sinks
    pub fn create<F>(
        factory: &F,
        config: &SessionConfig,
        sinks: SinkSet,
        reset: &ResetRequest,
    ) -> Result<Self>
    where
        F: EngineFactory<Engine = E>,
    {
        let mut engine = factory
            .create(reset)
            .map_err(DriverError::EngineConstruction)?;
        engine.set_gamma_function(config.gamma.as_ref());
        engine.set_linearize_operation(config.linearize);
        engine.attach_sinks(sinks.clone());
        debug!(sinks = ?sinks, linearize = config.linearize, "engine handle created");
        Ok(Self { engine, sinks })
    }

    pub fn status(&self) -> EngineStatus {
        self.engine.status()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn sinks(&self) -> &SinkSet {
        &self.sinks
    }

    /// Detach the sinks, then drop the engine
    pub fn release(mut self) -> SinkSet {
        let detached = self.engine.detach_sinks();
        debug!(sinks = ?detached, "engine handle released");
        self.sinks
    }
}
