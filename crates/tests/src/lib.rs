//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置文件到 RunSettings 的解析
//! - 磁盘数据集 e2e 回放（Mock 引擎）
//! - 引擎重建、放弃、中断与可视化 sink 的联动

#[cfg(test)]
mod support {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use contracts::{FrameSource, ResetRequest, RunSettings, SinkSet};
    use dataset::{MockFrameSource, StereoDataset};
    use driver::{IngestionPipeline, RecoveryPolicy, SessionConfig, SessionRecoveryManager};
    use engine::{MockEngineFactory, MockScript, SharedJournal};
    use image::{GrayImage, Luma};
    use playback::{
        open_fetcher, DualStreamSynchronizer, FetchMode, PlaybackRange, SourcePair,
        StereoSchedule,
    };

    /// Stereo sequence on disk: `left/`, `right/`, `times.txt`, `camera.txt`
    pub fn write_dataset(root: &Path, frames: u32) -> PathBuf {
        for side in ["left", "right"] {
            let dir = root.join(side);
            std::fs::create_dir_all(&dir).unwrap();
            for i in 0..frames {
                let shade = if side == "left" { i * 10 } else { i * 10 + 5 };
                let img = GrayImage::from_pixel(8, 6, Luma([shade as u8]));
                img.save(dir.join(format!("{i:05}.png"))).unwrap();
            }
        }

        let times: String = (0..frames)
            .map(|i| format!("{i:05} {:.6} 10.0\n", 100.0 + i as f64 * 0.05))
            .collect();
        std::fs::write(root.join("times.txt"), times).unwrap();

        let calib = root.join("camera.txt");
        std::fs::write(&calib, "Pinhole 0.5 0.5 0.5 0.5 0\n8 6\ncrop\n8 6\n").unwrap();
        calib
    }

    pub fn load_settings(dir: &Path, yaml: &str) -> RunSettings {
        let path = dir.join("config.yaml");
        std::fs::write(&path, yaml).unwrap();
        config_loader::ConfigLoader::load_from_path(&path).unwrap()
    }

    pub fn dataset_schedule(settings: &RunSettings, dataset: &StereoDataset) -> StereoSchedule {
        DualStreamSynchronizer::default().build(
            &dataset.left,
            &dataset.right,
            PlaybackRange::from(&settings.playback),
            settings.playback.speed,
        )
    }

    /// In-memory stereo pair at 10 fps
    pub struct MockRun {
        pub sources: SourcePair,
        pub schedule: StereoSchedule,
        pub dir: tempfile::TempDir,
    }

    impl MockRun {
        pub fn new(frames: usize) -> Self {
            Self::with_range(frames, PlaybackRange::forward(0, 100_000))
        }

        pub fn with_range(frames: usize, range: PlaybackRange) -> Self {
            let left: Arc<dyn FrameSource> =
                Arc::new(MockFrameSource::uniform("left", frames, 10.0));
            let right: Arc<dyn FrameSource> =
                Arc::new(MockFrameSource::uniform("right", frames, 10.0));
            let schedule =
                DualStreamSynchronizer::default().build(left.as_ref(), right.as_ref(), range, 0.0);
            Self {
                sources: SourcePair::new(left, right),
                schedule,
                dir: tempfile::tempdir().unwrap(),
            }
        }

        pub fn result_path(&self) -> PathBuf {
            self.dir.path().join("result.txt")
        }

        pub fn pipeline(
            &self,
            script: MockScript,
            sinks: SinkSet,
        ) -> (IngestionPipeline<MockEngineFactory>, SharedJournal) {
            self.pipeline_with_policy(script, sinks, RecoveryPolicy::default())
        }

        pub fn pipeline_with_policy(
            &self,
            script: MockScript,
            sinks: SinkSet,
            policy: RecoveryPolicy,
        ) -> (IngestionPipeline<MockEngineFactory>, SharedJournal) {
            let factory = MockEngineFactory::new(script);
            let journal = factory.journal();
            let recovery = SessionRecoveryManager::new(
                factory,
                SessionConfig {
                    gamma: None,
                    linearize: true,
                },
                sinks,
                ResetRequest::new(),
            )
            .with_policy(policy);
            let fetcher =
                open_fetcher(FetchMode::Lazy, self.sources.clone(), &self.schedule).unwrap();
            let pipeline = IngestionPipeline::new(
                recovery,
                self.schedule.clone(),
                fetcher,
                self.result_path(),
            );
            (pipeline, journal)
        }
    }
}

#[cfg(test)]
mod config_tests {
    use contracts::{PhotometricMode, PlaybackDirection, Preset};

    use crate::support::load_settings;

    #[test]
    fn legacy_settings_file_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings(
            dir.path(),
            r#"%YAML:1.0
DataSetRootDirectory: "/data/seq"
calib: "/data/seq/camera.txt"
preset: 3
mode: 2
reverse: 1
nogui: 1
useSampleOutput: 1
start: 10
end: 200
"#,
        );

        assert_eq!(settings.preset, Preset::FastRealtime);
        assert_eq!(settings.engine.photometric_mode, PhotometricMode::Idealized);
        assert!(!settings.engine.photometric.use_calibration);
        assert_eq!(settings.playback.direction, PlaybackDirection::Reverse);
        assert_eq!((settings.playback.start, settings.playback.end), (10, 200));
        assert_eq!(settings.playback.speed, 5.0);
        assert!(settings.playback.preload);
        assert!(!settings.playback.linearize());
        assert!(!settings.outputs.viewer);
        assert!(settings.outputs.sample_output);
        assert_eq!(
            settings.dataset.left_dir(),
            std::path::PathBuf::from("/data/seq/left")
        );
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "DataSetRootDirectory: /d\ncalib: /d/c.txt\nrescale: 0\n").unwrap();

        let err = config_loader::ConfigLoader::load_from_path(&path).unwrap_err();
        assert!(err.is_config());
    }
}

#[cfg(test)]
mod e2e_tests {
    use contracts::{FrameSource, OutputSink, SinkSet};
    use dataset::StereoDataset;
    use driver::{IngestionPipeline, RunOutcome, SessionConfig, SessionRecoveryManager};
    use engine::{MockEngineFactory, MockScript};
    use observability::MetricsReporter;
    use playback::{open_fetcher, FetchMode, SourcePair};
    use std::sync::Arc;

    use crate::support::{dataset_schedule, load_settings, write_dataset};

    /// End-to-end: settings file -> dataset on disk -> mock engine -> sinks
    ///
    /// 验证完整的数据流：
    /// 1. 配置解析与数据集打开
    /// 2. 双目配对与取帧
    /// 3. 引擎输出到达 sample 与图像 sink
    /// 4. 结果文件与吞吐量报告
    #[test]
    fn test_e2e_dataset_playback() {
        let root = tempfile::tempdir().unwrap();
        let calib = write_dataset(root.path(), 5);
        let yaml = format!(
            "DataSetRootDirectory: {}\ncalib: {}\nmode: 1\nnogui: 1\nnolog: 1\n\
             useSampleOutput: 1\nsave: 1\nprefetch: 1\nSaveResultTo: {}\n",
            root.path().display(),
            calib.display(),
            root.path().display()
        );
        let settings = load_settings(root.path(), &yaml);
        assert!(settings.playback.linearize());

        let dataset = StereoDataset::open(&settings.dataset, false).unwrap();
        assert!(dataset.gamma.is_none());
        let schedule = dataset_schedule(&settings, &dataset);
        assert_eq!(schedule.len(), 5);
        let total_images = dataset.left.len();

        let images = root.path().join("images_out");
        let outputs = outputs::create_outputs(&settings.outputs, &images).unwrap();
        assert!(outputs.viewer.is_none());
        assert_eq!(outputs.sinks.names(), vec!["sample", "images"]);
        let sinks = outputs.sinks.clone();

        let recovery = SessionRecoveryManager::new(
            MockEngineFactory::new(MockScript::new()),
            SessionConfig {
                gamma: dataset.gamma.clone(),
                linearize: settings.playback.linearize(),
            },
            outputs.sinks,
            contracts::ResetRequest::new(),
        );
        let mode = FetchMode::from_flags(settings.playback.preload, settings.playback.prefetch);
        assert_eq!(mode, FetchMode::Prefetch);
        let sources = SourcePair::new(Arc::new(dataset.left), Arc::new(dataset.right));
        let fetcher = open_fetcher(mode, sources, &schedule).unwrap();

        let report = IngestionPipeline::new(
            recovery,
            schedule,
            fetcher,
            settings.outputs.result_path(),
        )
        .run()
        .unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.stats.steps, 5);
        assert_eq!(report.stats.resets, 0);
        assert_eq!(report.stats.first_timestamp, 100.0);
        assert!((report.stats.last_timestamp - 100.2).abs() < 1e-9);

        sinks.join_all();
        for i in 0..5 {
            assert!(images.join(format!("depth_{i:05}.png")).is_file());
        }

        // MockScript::new() initializes on the second frame
        let result = std::fs::read_to_string(root.path().join("result.txt")).unwrap();
        assert_eq!(result.lines().count(), 4);

        let throughput = MetricsReporter::new(None)
            .report(
                &report.stats.throughput_sample(total_images),
                &report.stats.stereo_match_ms,
            )
            .unwrap();
        assert_eq!(throughput.frames, 4);
        assert!((throughput.recorded_seconds - 0.2).abs() < 1e-9);
    }

    #[test]
    fn calibrated_dataset_carries_gamma_to_engine() {
        let root = tempfile::tempdir().unwrap();
        let calib = write_dataset(root.path(), 3);
        let gamma: Vec<String> = (0..256).map(|v| v.to_string()).collect();
        let gamma_path = root.path().join("pcalib.txt");
        std::fs::write(&gamma_path, gamma.join(" ")).unwrap();

        let yaml = format!(
            "DataSetRootDirectory: {}\ncalib: {}\ngammaCalib: {}\nmode: 0\nnogui: 1\n",
            root.path().display(),
            calib.display(),
            gamma_path.display()
        );
        let settings = load_settings(root.path(), &yaml);
        let dataset = StereoDataset::open(&settings.dataset, true).unwrap();
        assert!(dataset.gamma.is_some());
        assert!(dataset.left.photometric().is_some());

        let schedule = dataset_schedule(&settings, &dataset);
        let factory = MockEngineFactory::new(MockScript::new());
        let journal = factory.journal();
        let recovery = SessionRecoveryManager::new(
            factory,
            SessionConfig {
                gamma: dataset.gamma.clone(),
                linearize: true,
            },
            SinkSet::empty(),
            contracts::ResetRequest::new(),
        );
        let sources = SourcePair::new(Arc::new(dataset.left), Arc::new(dataset.right));
        let fetcher = open_fetcher(FetchMode::Preload, sources, &schedule).unwrap();
        IngestionPipeline::new(recovery, schedule, fetcher, root.path().join("result.txt"))
            .run()
            .unwrap();

        // gamma first, then linearize
        let journal = journal.lock().unwrap();
        assert_eq!(journal.configured, vec![(0, true, false), (0, true, true)]);
    }

    #[test]
    fn sample_sink_sees_every_pose() {
        let run = crate::support::MockRun::new(8);
        let sample = Arc::new(outputs::SampleOutputSink::new("sample"));
        let metrics = sample.metrics().clone();
        let sinks = SinkSet::new(vec![sample as Arc<dyn OutputSink>]);

        let (pipeline, _) = run.pipeline(MockScript::new(), sinks.clone());
        let report = pipeline.run().unwrap();
        sinks.join_all();

        assert_eq!(report.outcome, RunOutcome::Completed);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.poses, 7);
        assert_eq!(snapshot.depth_images, 8);
        assert_eq!(snapshot.joins, 1);
    }
}

#[cfg(test)]
mod recovery_tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use contracts::{OutputSink, ResetRequest, SinkSet};
    use driver::{
        IngestionPipeline, RecoveryPolicy, RunOutcome, SessionConfig, SessionRecoveryManager,
    };
    use engine::{MockEngineFactory, MockScript};
    use playback::{open_fetcher_until, FetchMode, PlaybackRange};

    use crate::support::MockRun;

    fn sample_sinks() -> (SinkSet, Arc<outputs::SinkMetrics>) {
        let sample = Arc::new(outputs::SampleOutputSink::new("sample"));
        let metrics = sample.metrics().clone();
        (SinkSet::new(vec![sample as Arc<dyn OutputSink>]), metrics)
    }

    #[test]
    fn failed_initialization_rebuilds_engine_with_same_sinks() {
        let run = MockRun::new(10);
        let (sinks, metrics) = sample_sinks();
        let (pipeline, journal) = run.pipeline(
            MockScript {
                fail_init_on: [0].into_iter().collect(),
                ..MockScript::new()
            },
            sinks,
        );

        let report = pipeline.run().unwrap();
        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.stats.resets, 1);
        assert_eq!(report.stats.steps, 10);

        let journal = journal.lock().unwrap();
        assert_eq!(journal.created, 2);
        assert_eq!(journal.dropped, 2);
        // the replacement sees frames from 1 on and is configured like the first
        assert_eq!(journal.ingested.iter().filter(|(i, _)| *i == 1).count(), 9);
        assert!(journal.configured.contains(&(1, false, true)));
        assert_eq!(journal.drained, vec![1]);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.resets, 1);
        // instance 1 initializes on frame 2
        assert_eq!(snapshot.poses, 8);
        let result = std::fs::read_to_string(run.result_path()).unwrap();
        assert_eq!(result.lines().count(), 8);
    }

    #[test]
    fn requested_full_reset_is_honoured() {
        let run = MockRun::new(6);
        let (sinks, metrics) = sample_sinks();
        let (pipeline, journal) = run.pipeline(
            MockScript {
                request_reset_on: Some(3),
                ..MockScript::new()
            },
            sinks,
        );

        let report = pipeline.run().unwrap();
        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.stats.resets, 1);
        assert_eq!(journal.lock().unwrap().created, 2);
        assert_eq!(metrics.snapshot().resets, 1);
    }

    #[test]
    fn late_initialization_failure_abandons_run() {
        let run = MockRun::new(10);
        let (pipeline, journal) = run.pipeline_with_policy(
            MockScript {
                init_after: 100,
                fail_init_on: [4].into_iter().collect(),
                ..MockScript::new()
            },
            SinkSet::empty(),
            RecoveryPolicy { window: 3 },
        );

        let report = pipeline.run().unwrap();
        assert_eq!(report.outcome, RunOutcome::InitializationAbandoned);
        assert_eq!(report.stats.steps, 5);
        assert_eq!(report.stats.resets, 0);
        assert_eq!(journal.lock().unwrap().created, 1);
    }

    #[test]
    fn tracking_loss_ends_run_successfully() {
        let run = MockRun::new(10);
        let (pipeline, journal) = run.pipeline(
            MockScript {
                lose_on: Some(6),
                ..MockScript::new()
            },
            SinkSet::empty(),
        );

        let report = pipeline.run().unwrap();
        assert_eq!(report.outcome, RunOutcome::TrackingLost);
        assert_eq!(report.stats.last_frame_id, Some(6));
        // throughput covers the frames actually played, not the whole schedule
        let sample = report.stats.throughput_sample(10);
        assert_eq!((sample.first_frame_id, sample.last_frame_id), (0, 6));
        assert!((sample.last_timestamp - sample.first_timestamp - 0.6).abs() < 1e-9);
        // result is still saved after the loss
        assert!(run.result_path().is_file());
        assert_eq!(journal.lock().unwrap().drained, vec![0]);
    }

    #[test]
    fn stop_flag_interrupts_before_next_step() {
        let run = MockRun::new(10);
        let (pipeline, _) = run.pipeline(MockScript::new(), SinkSet::empty());
        let stop = pipeline.stop_flag();
        stop.store(true, Ordering::SeqCst);

        let report = pipeline.run().unwrap();
        assert_eq!(report.outcome, RunOutcome::Interrupted);
        assert_eq!(report.stats.steps, 0);
        assert!(run.result_path().is_file());
    }

    #[test]
    fn interrupted_preload_ends_run_as_interrupted() {
        let run = MockRun::new(10);
        let stop = Arc::new(AtomicBool::new(true));
        let fetcher = open_fetcher_until(
            FetchMode::Preload,
            run.sources.clone(),
            &run.schedule,
            &stop,
        )
        .unwrap();
        let factory = MockEngineFactory::new(MockScript::new());
        let journal = factory.journal();
        let recovery = SessionRecoveryManager::new(
            factory,
            SessionConfig {
                gamma: None,
                linearize: true,
            },
            SinkSet::empty(),
            ResetRequest::new(),
        );

        let report = IngestionPipeline::new(
            recovery,
            run.schedule.clone(),
            fetcher,
            run.result_path(),
        )
        .with_stop_flag(stop)
        .run()
        .unwrap();

        assert_eq!(report.outcome, RunOutcome::Interrupted);
        assert_eq!(report.stats.steps, 0);
        assert!(journal.lock().unwrap().ingested.is_empty());
    }

    #[test]
    fn reverse_playback_feeds_descending_ids() {
        let run = MockRun::with_range(
            6,
            PlaybackRange {
                start: 1,
                end: 5,
                direction: contracts::PlaybackDirection::Reverse,
            },
        );
        let (pipeline, journal) = run.pipeline(MockScript::new(), SinkSet::empty());

        let report = pipeline.run().unwrap();
        assert_eq!(report.stats.first_frame_id, Some(4));
        assert_eq!(report.stats.last_frame_id, Some(1));
        let ids: Vec<usize> = journal.lock().unwrap().ingested.iter().map(|(_, id)| *id).collect();
        assert_eq!(ids, vec![4, 3, 2, 1]);
    }
}

#[cfg(test)]
mod viewer_tests {
    use std::thread;

    use contracts::OutputSettings;
    use driver::RunOutcome;
    use engine::MockScript;

    use crate::support::MockRun;

    /// Ingestion on its own thread, viewer loop on the runtime
    #[tokio::test]
    async fn viewer_presents_poses_from_ingestion_thread() {
        let run = MockRun::new(12);
        let settings = OutputSettings {
            viewer: true,
            ..OutputSettings::default()
        };
        let outputs = outputs::create_outputs(&settings, &run.dir.path().join("images")).unwrap();
        assert_eq!(outputs.sinks.names(), vec!["viewer"]);

        let viewer_loop = outputs.viewer.unwrap();
        let (pipeline, _) = run.pipeline(MockScript::new(), outputs.sinks);

        // the loop drains and ends once the last sink reference is dropped
        let ingestion = thread::spawn(move || pipeline.run());
        let summary = viewer_loop.run().await;
        let report = ingestion.join().unwrap().unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(summary.poses, 11);
        assert_eq!(summary.depth_images, 12);
        assert_eq!(summary.last_frame, Some(11));
        assert!(summary.path_length > 0.0);
    }
}
