//! Real-time pacing
//!
//! The pacing clock measures elapsed schedule time as
//! `epoch_offset + (now - origin)`. Until the engine initializes, the
//! pipeline re-anchors the epoch on every step.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Source of wall time, swappable in tests
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Monotonic system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Clock that only moves when told to; `sleep` advances it
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
    slept: Mutex<Vec<Duration>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
            slept: Mutex::new(Vec::new()),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut offset) = self.offset.lock() {
            *offset += by;
        }
    }

    /// Every sleep requested so far
    pub fn sleeps(&self) -> Vec<Duration> {
        self.slept.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = self.offset.lock().map(|o| *o).unwrap_or_default();
        self.base + offset
    }

    fn sleep(&self, duration: Duration) {
        if let Ok(mut slept) = self.slept.lock() {
            slept.push(duration);
        }
        self.advance(duration);
    }
}

/// Outcome of the pacing check for one step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PaceDecision {
    /// On time
    Proceed,
    /// Early; wait this long before proceeding
    Wait(Duration),
    /// Too late; the primary ingestion call is skipped
    Skip,
}

/// Lateness tolerated before a step is skipped
///
/// Alternates between 0.5 s and 0.6 s so consecutive steps are not
/// dropped in lockstep.
pub fn skip_threshold(target: f64, step_index: usize) -> f64 {
    target + 0.5 + 0.1 * (step_index % 2) as f64
}

/// Pure pacing rule
pub fn decide(elapsed: f64, target: f64, step_index: usize) -> PaceDecision {
    if elapsed < target {
        PaceDecision::Wait(Duration::from_secs_f64(target - elapsed))
    } else if elapsed > skip_threshold(target, step_index) {
        PaceDecision::Skip
    } else {
        PaceDecision::Proceed
    }
}

/// Pacing state of one run
#[derive(Debug)]
pub struct PacingClock<C: Clock> {
    clock: C,
    speed: f64,
    origin: Instant,
    epoch_offset: f64,
}

impl<C: Clock> PacingClock<C> {
    pub fn new(clock: C, speed: f64) -> Self {
        let origin = clock.now();
        Self {
            clock,
            speed,
            origin,
            epoch_offset: 0.0,
        }
    }

    /// Whether steps are paced at all
    pub fn is_paced(&self) -> bool {
        self.speed != 0.0
    }

    /// Restart the wall clock at the given schedule offset
    pub fn reanchor(&mut self, schedule_offset: f64) {
        self.origin = self.clock.now();
        self.epoch_offset = schedule_offset;
    }

    pub fn epoch_offset(&self) -> f64 {
        self.epoch_offset
    }

    /// Wall time since the last re-anchor
    pub fn since_origin(&self) -> Duration {
        self.clock.now().saturating_duration_since(self.origin)
    }

    /// Schedule time reached by the wall clock
    pub fn elapsed(&self) -> f64 {
        self.epoch_offset + self.since_origin().as_secs_f64()
    }

    /// Check one step; blocks when early
    ///
    /// `Wait(d)` means the call already slept for `d`. Unpaced runs always
    /// proceed.
    pub fn pace(&self, target: f64, step_index: usize) -> PaceDecision {
        if !self.is_paced() {
            return PaceDecision::Proceed;
        }
        let decision = decide(self.elapsed(), target, step_index);
        if let PaceDecision::Wait(duration) = decision {
            self.clock.sleep(duration);
        }
        decision
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}
