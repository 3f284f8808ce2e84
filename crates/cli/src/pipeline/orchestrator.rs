//! Session orchestrator - threads, signals and shutdown order.
//!
//! The ingestion loop runs on its own named thread. The viewer loop, if any,
//! runs on the launching thread. Sinks are joined only after the ingestion
//! thread returned, whether it finished, failed or panicked.

use std::path::Path;
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Context};
use contracts::{FrameSource, OutputSettings, ResetRequest, RunSettings, SinkSet};
use dataset::StereoDataset;
use driver::{IngestionPipeline, RunReport, SessionConfig, SessionRecoveryManager};
use engine::{MockEngineFactory, MockScript};
use observability::{record_sink_event, MetricsReporter, ThroughputReport};
use outputs::{ViewerCloser, ViewerSummary};
use playback::{
    open_fetcher_until, DualStreamSynchronizer, FetchMode, PlaybackRange, SourcePair,
    StereoSchedule,
};
use tokio::sync::oneshot;
use tracing::{info, instrument};

use crate::error::{CliError, Result};
use crate::pipeline::Shutdown;

/// Everything a finished session reports
#[derive(Debug)]
pub struct SessionReport {
    pub run: RunReport,
    pub throughput: ThroughputReport,
    pub viewer: Option<ViewerSummary>,
    pub sinks: Vec<String>,
}

/// Synchronized schedule for the configured range and speed
pub fn build_schedule(settings: &RunSettings, dataset: &StereoDataset) -> StereoSchedule {
    DualStreamSynchronizer::default().build(
        &dataset.left,
        &dataset.right,
        PlaybackRange::from(&settings.playback),
        settings.playback.speed,
    )
}

/// One playback run over an opened dataset
pub struct PlaybackSession {
    settings: RunSettings,
    dataset: StereoDataset,
    shutdown: Shutdown,
}

impl PlaybackSession {
    pub fn new(settings: RunSettings, dataset: StereoDataset) -> Self {
        Self {
            settings,
            dataset,
            shutdown: Shutdown::new(),
        }
    }

    /// Share the stop flag and viewer slot of an installed signal listener
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Run to completion
    #[instrument(name = "playback_session", skip(self))]
    pub async fn run(self) -> Result<SessionReport> {
        let Self {
            settings,
            dataset,
            shutdown,
        } = self;

        let schedule = build_schedule(&settings, &dataset);
        let total_images = dataset.left.len();
        info!(
            steps = schedule.len(),
            speed = schedule.speed(),
            images = total_images,
            "schedule built"
        );

        let outputs =
            outputs::create_outputs(&settings.outputs, Path::new(OutputSettings::IMAGES_OUT_DIR))?;
        let sinks = outputs.sinks.clone();
        let closer = outputs.viewer_closer();
        let viewer_loop = outputs.viewer;
        if let Some(closer) = &closer {
            shutdown.register_viewer(closer.clone());
        }

        let session = SessionConfig {
            gamma: dataset.gamma.clone(),
            linearize: settings.playback.linearize(),
        };
        let sources = SourcePair::new(Arc::new(dataset.left), Arc::new(dataset.right));
        let mode = FetchMode::from_flags(settings.playback.preload, settings.playback.prefetch);
        let stop = shutdown.stop_flag();
        let fetcher =
            open_fetcher_until(mode, sources, &schedule, &stop).map_err(CliError::Frames)?;

        let factory = MockEngineFactory::new(MockScript::new()).with_settings(settings.engine);
        let recovery =
            SessionRecoveryManager::new(factory, session, sinks.clone(), ResetRequest::new());

        let pipeline = IngestionPipeline::new(
            recovery,
            schedule,
            fetcher,
            settings.outputs.result_path(),
        )
        .with_stop_flag(stop);

        let (done_tx, done_rx) = oneshot::channel();
        let viewer_guard = CloseViewerOnDrop(closer);
        let ingestion = thread::Builder::new()
            .name("ingestion".to_string())
            .spawn(move || {
                let _viewer_guard = viewer_guard;
                let result = pipeline.run();
                let _ = done_tx.send(());
                result
            })
            .context("Failed to spawn ingestion thread")?;

        let viewer = match viewer_loop {
            Some(viewer_loop) => Some(viewer_loop.run().await),
            None => None,
        };

        // Sender dropped means the thread panicked; join reports it
        let _ = done_rx.await;
        let run = finish_ingestion(ingestion.join(), &sinks)?;

        let reporter = MetricsReporter::with_default_log(settings.outputs.timing_log);
        let throughput = reporter.report(
            &run.stats.throughput_sample(total_images),
            &run.stats.stereo_match_ms,
        )?;

        Ok(SessionReport {
            run,
            throughput,
            viewer,
            sinks: sinks.names(),
        })
    }
}

/// Closes the viewer when the ingestion thread ends, panics included
struct CloseViewerOnDrop(Option<ViewerCloser>);

impl Drop for CloseViewerOnDrop {
    fn drop(&mut self) {
        if let Some(closer) = &self.0 {
            closer.close();
        }
    }
}

/// Join every sink, then surface the ingestion result
fn finish_ingestion(
    joined: thread::Result<driver::Result<RunReport>>,
    sinks: &SinkSet,
) -> Result<RunReport> {
    for sink in sinks.iter() {
        sink.join();
        record_sink_event(sink.name(), "join");
    }
    info!(sinks = ?sinks, "sinks joined");

    match joined {
        Ok(result) => Ok(result?),
        Err(_) => Err(anyhow!("ingestion thread panicked").into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ContractError, OutputSink};
    use driver::{DriverError, RunOutcome, RunStats};

    fn sample_sinks() -> (SinkSet, Arc<outputs::SinkMetrics>) {
        let sample = Arc::new(outputs::SampleOutputSink::new("sample"));
        let metrics = sample.metrics().clone();
        (SinkSet::new(vec![sample as Arc<dyn OutputSink>]), metrics)
    }

    #[test]
    fn sinks_joined_before_ingestion_error() {
        let (sinks, metrics) = sample_sinks();
        let failed = Err(DriverError::Fetch {
            index: 3,
            source: ContractError::Other("decode".into()),
        });

        let err = finish_ingestion(Ok(failed), &sinks).unwrap_err();
        assert!(matches!(err, CliError::Pipeline(_)));
        assert_eq!(metrics.snapshot().joins, 1);
    }

    #[test]
    fn sinks_joined_after_ingestion_panic() {
        let (sinks, metrics) = sample_sinks();
        let joined = thread::spawn(|| -> driver::Result<RunReport> { panic!("ingestion") }).join();

        assert!(finish_ingestion(joined, &sinks).is_err());
        assert_eq!(metrics.snapshot().joins, 1);
    }

    #[test]
    fn finished_run_passes_through() {
        let (sinks, metrics) = sample_sinks();
        let run = RunReport {
            outcome: RunOutcome::Completed,
            stats: RunStats::default(),
        };

        let run = finish_ingestion(Ok(Ok(run)), &sinks).unwrap();
        assert_eq!(run.outcome, RunOutcome::Completed);
        assert_eq!(metrics.snapshot().joins, 1);
    }

    #[tokio::test]
    async fn panicking_ingestion_still_closes_viewer() {
        let (_sink, presentation) = outputs::viewer("viewer", 4);
        let guard = CloseViewerOnDrop(Some(presentation.closer()));

        let joined = thread::spawn(move || {
            let _guard = guard;
            panic!("ingestion");
        })
        .join();

        assert!(joined.is_err());
        assert!(presentation.closer().is_closed());
        // the loop returns instead of waiting for events
        let summary = presentation.run().await;
        assert_eq!(summary.poses, 0);
    }
}
