//! Session recovery
//!
//! An engine that failed to initialize, or that asked for a full reset, is
//! torn down and rebuilt with the same configuration. The sink set moves to
//! the new instance unchanged.

use contracts::{EngineFactory, EngineStatus, ResetRequest, SinkSet};
use observability::{record_engine_reset, record_sink_event};
use tracing::{info, warn};

use crate::error::Result;
use crate::handle::{EngineHandle, SessionConfig};

/// Steps during which an initialization failure is recovered automatically
pub const DEFAULT_RECOVERY_WINDOW: usize = 250;

/// What a recovery check did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// No failure condition
    NotNeeded,
    /// Engine rebuilt
    Recovered,
    /// Failure outside the window without a forced reset; nothing changed
    Declined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryPolicy {
    pub window: usize,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            window: DEFAULT_RECOVERY_WINDOW,
        }
    }
}

impl RecoveryPolicy {
    /// Pure swap rule
    ///
    /// A requested full reset is forced and ignores the window.
    pub fn evaluate(
        &self,
        status: EngineStatus,
        reset_requested: bool,
        processed: usize,
    ) -> RecoveryOutcome {
        if !(status.init_failed || reset_requested) {
            RecoveryOutcome::NotNeeded
        } else if processed < self.window || reset_requested {
            RecoveryOutcome::Recovered
        } else {
            RecoveryOutcome::Declined
        }
    }
}

/// Owns the engine factory and rebuilds engine instances on failure
pub struct SessionRecoveryManager<F: EngineFactory> {
    factory: F,
    config: SessionConfig,
    sinks: SinkSet,
    reset: ResetRequest,
    policy: RecoveryPolicy,
    recoveries: usize,
}

impl<F: EngineFactory> SessionRecoveryManager<F> {
    pub fn new(factory: F, config: SessionConfig, sinks: SinkSet, reset: ResetRequest) -> Self {
        Self {
            factory,
            config,
            sinks,
            reset,
            policy: RecoveryPolicy::default(),
            recoveries: 0,
        }
    }

    pub fn with_policy(mut self, policy: RecoveryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// First engine of the session
    pub fn start(&self) -> Result<EngineHandle<F::Engine>> {
        EngineHandle::create(&self.factory, &self.config, self.sinks.clone(), &self.reset)
    }

    pub fn policy(&self) -> RecoveryPolicy {
        self.policy
    }

    pub fn reset_request(&self) -> &ResetRequest {
        &self.reset
    }

    pub fn recoveries(&self) -> usize {
        self.recoveries
    }

    /// Check the engine after a step and swap it if the policy allows
    ///
    /// `processed` is the index of the step just completed. The returned
    /// handle is the one to keep using.
    pub fn check(
        &mut self,
        handle: EngineHandle<F::Engine>,
        processed: usize,
    ) -> Result<(EngineHandle<F::Engine>, RecoveryOutcome)> {
        let status = handle.status();
        let forced = self.reset.is_requested();

        match self.policy.evaluate(status, forced, processed) {
            RecoveryOutcome::NotNeeded => Ok((handle, RecoveryOutcome::NotNeeded)),
            RecoveryOutcome::Declined => {
                warn!(
                    processed,
                    window = self.policy.window,
                    "initialization failed outside the recovery window"
                );
                record_engine_reset("declined");
                Ok((handle, RecoveryOutcome::Declined))
            }
            RecoveryOutcome::Recovered => {
                info!(processed, init_failed = status.init_failed, forced, "RESETTING!");
                let rebuilt = self.swap(handle)?;
                Ok((rebuilt, RecoveryOutcome::Recovered))
            }
        }
    }

    fn swap(&mut self, handle: EngineHandle<F::Engine>) -> Result<EngineHandle<F::Engine>> {
        let sinks = handle.release();

        sinks.reset_all();
        for name in sinks.names() {
            record_sink_event(&name, "reset");
        }

        let rebuilt = EngineHandle::create(&self.factory, &self.config, sinks, &self.reset)?;
        self.reset.clear();
        self.recoveries += 1;
        record_engine_reset("recovered");
        Ok(rebuilt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use contracts::{DecodedFrame, OutputSink, SlamEngine};
    use engine::{MockEngineFactory, MockScript};

    #[derive(Default)]
    struct CountingSink {
        resets: AtomicUsize,
    }

    impl OutputSink for CountingSink {
        fn name(&self) -> &str {
            "counting"
        }

        fn reset(&self) {
            self.resets.fetch_add(1, Ordering::SeqCst);
        }

        fn join(&self) {}
    }

    fn failed() -> EngineStatus {
        EngineStatus {
            init_failed: true,
            ..Default::default()
        }
    }

    fn frame(id: usize) -> DecodedFrame {
        DecodedFrame::new(id, id as f64, 0.0, 1, 1, vec![1.0]).unwrap()
    }

    #[test]
    fn policy_swaps_inside_window_only() {
        let policy = RecoveryPolicy::default();
        assert_eq!(policy.evaluate(failed(), false, 10), RecoveryOutcome::Recovered);
        assert_eq!(policy.evaluate(failed(), false, 249), RecoveryOutcome::Recovered);
        assert_eq!(policy.evaluate(failed(), false, 250), RecoveryOutcome::Declined);
        assert_eq!(policy.evaluate(failed(), false, 300), RecoveryOutcome::Declined);
    }

    #[test]
    fn forced_reset_ignores_window() {
        let policy = RecoveryPolicy::default();
        assert_eq!(
            policy.evaluate(EngineStatus::default(), true, 300),
            RecoveryOutcome::Recovered
        );
        assert_eq!(
            policy.evaluate(EngineStatus::default(), false, 0),
            RecoveryOutcome::NotNeeded
        );
    }

    #[test]
    fn swap_keeps_sink_identity_and_config() {
        let sink = Arc::new(CountingSink::default());
        let sinks = SinkSet::new(vec![sink.clone() as Arc<dyn OutputSink>]);
        let factory = MockEngineFactory::new(MockScript {
            init_after: 5,
            fail_init_on: [0].into_iter().collect(),
            ..Default::default()
        });
        let journal = factory.journal();
        let config = SessionConfig {
            gamma: None,
            linearize: true,
        };
        let mut manager =
            SessionRecoveryManager::new(factory, config, sinks.clone(), ResetRequest::new());

        let mut handle = manager.start().unwrap();
        handle.engine_mut().add_active_frame(&frame(0), &frame(0), 0);
        assert!(handle.status().init_failed);

        let (handle, outcome) = manager.check(handle, 10).unwrap();
        assert_eq!(outcome, RecoveryOutcome::Recovered);
        assert!(!handle.status().init_failed);
        assert!(handle.sinks().same_as(&sinks));
        assert!(handle.engine().sinks().same_as(&sinks));
        assert_eq!(sink.resets.load(Ordering::SeqCst), 1);
        assert_eq!(manager.recoveries(), 1);

        let journal = journal.lock().unwrap();
        assert_eq!(journal.created, 2);
        assert_eq!(journal.dropped, 1);
        // the failed instance gave its sinks back before teardown
        assert_eq!(journal.detached, vec![0]);
        assert!(journal.configured.iter().filter(|c| c.0 == 1).all(|c| !c.1));
        assert!(journal.configured.contains(&(1, false, true)));
    }

    #[test]
    fn declined_outside_window_leaves_engine() {
        let factory = MockEngineFactory::new(MockScript {
            fail_init_on: [0].into_iter().collect(),
            ..MockScript::new()
        });
        let journal = factory.journal();
        let mut manager = SessionRecoveryManager::new(
            factory,
            SessionConfig::default(),
            SinkSet::empty(),
            ResetRequest::new(),
        );

        let mut handle = manager.start().unwrap();
        handle.engine_mut().add_active_frame(&frame(0), &frame(0), 0);
        let (handle, outcome) = manager.check(handle, 300).unwrap();

        assert_eq!(outcome, RecoveryOutcome::Declined);
        assert!(handle.status().init_failed);
        assert_eq!(journal.lock().unwrap().created, 1);
    }

    #[test]
    fn reset_flag_is_cleared_after_swap() {
        let reset = ResetRequest::new();
        let mut manager = SessionRecoveryManager::new(
            MockEngineFactory::new(MockScript::new()),
            SessionConfig::default(),
            SinkSet::empty(),
            reset.clone(),
        );
        let handle = manager.start().unwrap();

        reset.request();
        let (_, outcome) = manager.check(handle, 1000).unwrap();
        assert_eq!(outcome, RecoveryOutcome::Recovered);
        assert!(!reset.is_requested());
    }
}
