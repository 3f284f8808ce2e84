//! Per-step ingestion loop
//!
//! One step: stop check, epoch re-anchor while uninitialized, fetch, pace,
//! feed, depth estimation, recovery check, loss check. Drain and result
//! persistence happen on every exit path except fatal errors.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{EngineFactory, InverseDepthMap, SlamEngine};
use observability::{
    record_pacing_wait_ms, record_step, record_stereo_match_ms, record_tracking_lost,
};
use playback::{Clock, FrameFetcher, PaceDecision, PacingClock, StereoSchedule, SystemClock};
use tracing::{debug, info, instrument, warn};

use crate::error::{DriverError, Result};
use crate::recovery::{RecoveryOutcome, SessionRecoveryManager};
use crate::stats::{process_cpu_time, RunOutcome, RunReport, RunStats};

/// Drives one engine session over a synchronized schedule
pub struct IngestionPipeline<F: EngineFactory, C: Clock = SystemClock> {
    recovery: SessionRecoveryManager<F>,
    schedule: StereoSchedule,
    fetcher: Box<dyn FrameFetcher>,
    pacing: PacingClock<C>,
    stop: Arc<AtomicBool>,
    result_path: PathBuf,
}

impl<F: EngineFactory> IngestionPipeline<F, SystemClock> {
    pub fn new(
        recovery: SessionRecoveryManager<F>,
        schedule: StereoSchedule,
        fetcher: Box<dyn FrameFetcher>,
        result_path: impl Into<PathBuf>,
    ) -> Self {
        let pacing = PacingClock::new(SystemClock, schedule.speed());
        Self::with_clock(recovery, schedule, fetcher, pacing, result_path)
    }
}

impl<F: EngineFactory, C: Clock> IngestionPipeline<F, C> {
    pub fn with_clock(
        recovery: SessionRecoveryManager<F>,
        schedule: StereoSchedule,
        fetcher: Box<dyn FrameFetcher>,
        pacing: PacingClock<C>,
        result_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            recovery,
            schedule,
            fetcher,
            pacing,
            stop: Arc::new(AtomicBool::new(false)),
            result_path: result_path.into(),
        }
    }

    /// Share an externally owned stop flag
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn result_path(&self) -> &Path {
        &self.result_path
    }

    /// Run the loop to completion
    ///
    /// # Errors
    /// Engine construction, frame decoding and result persistence failures.
    #[instrument(name = "ingestion_pipeline", skip(self), fields(steps = self.schedule.len()))]
    pub fn run(self) -> Result<RunReport> {
        let Self {
            mut recovery,
            schedule,
            mut fetcher,
            mut pacing,
            stop,
            result_path,
        } = self;

        info!(
            steps = schedule.len(),
            speed = schedule.speed(),
            fetch = ?fetcher.mode(),
            "starting ingestion"
        );

        let mut handle = recovery.start()?;
        let mut stats = RunStats::default();
        let mut outcome = RunOutcome::Completed;
        let mut cpu_origin = process_cpu_time();

        for step in schedule.steps() {
            if stop.load(Ordering::SeqCst) {
                info!(step = step.index, "stop requested, ending ingestion");
                outcome = RunOutcome::Interrupted;
                break;
            }

            if !handle.status().initialized {
                pacing.reanchor(step.target_offset);
                cpu_origin = process_cpu_time();
            }

            let pair = fetcher.fetch(step).map_err(|source| DriverError::Fetch {
                index: step.index,
                source,
            })?;

            let skipped = match pacing.pace(step.target_offset, step.index) {
                PaceDecision::Skip => true,
                PaceDecision::Wait(waited) => {
                    record_pacing_wait_ms(waited.as_secs_f64() * 1000.0);
                    false
                }
                PaceDecision::Proceed => false,
            };

            if skipped {
                info!(step = step.index, frame = step.left_id, "SKIPFRAME");
                stats.skipped += 1;
            } else {
                handle
                    .engine_mut()
                    .add_active_frame(&pair.left, &pair.right, step.left_id);
                stats.ingested += 1;
            }

            let mut depth = InverseDepthMap::for_frame(&pair.left);
            let started = Instant::now();
            handle
                .engine_mut()
                .stereo_match(&pair.left, &pair.right, step.left_id, &mut depth);
            let match_ms = started.elapsed().as_secs_f64() * 1000.0;
            stats.stereo_match_ms.push(match_ms);
            record_stereo_match_ms(match_ms);
            debug!(step = step.index, match_ms, "stereo match");

            stats.record_frame(step.left_id, pair.left.timestamp);
            stats.steps += 1;
            record_step(step.left_id, skipped);
            drop(depth);
            drop(pair);

            let (next, recovered) = recovery.check(handle, step.index)?;
            handle = next;
            match recovered {
                RecoveryOutcome::Recovered => stats.resets += 1,
                RecoveryOutcome::Declined => {
                    warn!(step = step.index, "abandoning run, engine failed to initialize");
                    outcome = RunOutcome::InitializationAbandoned;
                    break;
                }
                RecoveryOutcome::NotNeeded => {}
            }

            if handle.status().is_lost {
                warn!(step = step.index, frame = step.left_id, "LOST!!");
                record_tracking_lost();
                outcome = RunOutcome::TrackingLost;
                break;
            }
        }

        info!(%outcome, steps = stats.steps, "ingestion finished, waiting for mapping");
        handle.engine_mut().block_until_mapping_finished();

        stats.wall_time = pacing.since_origin();
        stats.epoch_offset = pacing.epoch_offset();
        stats.cpu_time = process_cpu_time().saturating_sub(cpu_origin);

        handle
            .engine()
            .save_result(&result_path)
            .map_err(|source| DriverError::Persist {
                path: result_path.clone(),
                source,
            })?;

        info!(
            %outcome,
            ingested = stats.ingested,
            skipped = stats.skipped,
            resets = stats.resets,
            wall_secs = stats.wall_time.as_secs_f64(),
            "run finished"
        );

        Ok(RunReport { outcome, stats })
    }
}

/// Wall time a paced run needs at minimum
pub fn scheduled_duration(schedule: &StereoSchedule) -> Duration {
    match schedule.last() {
        Some(step) if schedule.speed() != 0.0 => Duration::from_secs_f64(step.target_offset),
        _ => Duration::ZERO,
    }
}
