//! Frame fetch strategies
//!
//! - `Lazy`: decode both frames when the step runs
//! - `Prefetch`: a worker decodes ahead into a bounded queue
//! - `Preload`: decode the whole schedule before the loop starts
//!
//! All three hand out the same frames in the same order.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use contracts::{ContractError, DecodedFrame, FrameSource};
use tracing::{debug, info, warn};

use crate::synchronizer::{StereoSchedule, StereoStep};

/// Steps decoded ahead of the consumer in prefetch mode
pub const PREFETCH_DEPTH: usize = 2;

/// Owned left/right frames of one step
#[derive(Debug)]
pub struct StereoPair {
    pub left: DecodedFrame,
    pub right: DecodedFrame,
}

/// How frames reach the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    Lazy,
    Prefetch,
    Preload,
}

impl FetchMode {
    /// Preload wins when both flags are set
    pub fn from_flags(preload: bool, prefetch: bool) -> Self {
        match (preload, prefetch) {
            (true, _) => Self::Preload,
            (false, true) => Self::Prefetch,
            (false, false) => Self::Lazy,
        }
    }
}

/// Supplies the frames of successive steps
pub trait FrameFetcher: Send {
    /// Frames for `step`; steps must be requested in schedule order
    ///
    /// # Errors
    /// Decode failures, or a request out of schedule order
    fn fetch(&mut self, step: &StereoStep) -> Result<StereoPair, ContractError>;

    fn mode(&self) -> FetchMode;
}

/// Shared left/right sources
#[derive(Clone)]
pub struct SourcePair {
    pub left: Arc<dyn FrameSource>,
    pub right: Arc<dyn FrameSource>,
}

impl SourcePair {
    pub fn new(left: Arc<dyn FrameSource>, right: Arc<dyn FrameSource>) -> Self {
        Self { left, right }
    }

    pub fn load(&self, step: &StereoStep) -> Result<StereoPair, ContractError> {
        Ok(StereoPair {
            left: self.left.load(step.left_id)?,
            right: self.right.load(step.right_id)?,
        })
    }
}

/// Build the fetcher for `mode`
///
/// Preload decodes the entire schedule here.
pub fn open_fetcher(
    mode: FetchMode,
    sources: SourcePair,
    schedule: &StereoSchedule,
) -> Result<Box<dyn FrameFetcher>, ContractError> {
    open_fetcher_until(mode, sources, schedule, &AtomicBool::new(false))
}

/// Same as [`open_fetcher`], but a raised `stop` flag cuts the preload short
///
/// 预加载被打断时返回已解码的部分，由主循环在下一步检查停止标志后退出。
pub fn open_fetcher_until(
    mode: FetchMode,
    sources: SourcePair,
    schedule: &StereoSchedule,
    stop: &AtomicBool,
) -> Result<Box<dyn FrameFetcher>, ContractError> {
    let fetcher: Box<dyn FrameFetcher> = match mode {
        FetchMode::Lazy => Box::new(LazyFetcher { sources }),
        FetchMode::Prefetch => Box::new(PrefetchFetcher::spawn(sources, schedule)?),
        FetchMode::Preload => Box::new(PreloadedFetcher::load_until(&sources, schedule, stop)?),
    };
    Ok(fetcher)
}

/// Decode on demand
pub struct LazyFetcher {
    sources: SourcePair,
}

impl FrameFetcher for LazyFetcher {
    fn fetch(&mut self, step: &StereoStep) -> Result<StereoPair, ContractError> {
        self.sources.load(step)
    }

    fn mode(&self) -> FetchMode {
        FetchMode::Lazy
    }
}

/// Whole schedule decoded up front
pub struct PreloadedFetcher {
    frames: VecDeque<(usize, StereoPair)>,
}

impl PreloadedFetcher {
    pub fn load(sources: &SourcePair, schedule: &StereoSchedule) -> Result<Self, ContractError> {
        Self::load_until(sources, schedule, &AtomicBool::new(false))
    }

    /// Decode steps in order until the schedule ends or `stop` is raised
    pub fn load_until(
        sources: &SourcePair,
        schedule: &StereoSchedule,
        stop: &AtomicBool,
    ) -> Result<Self, ContractError> {
        info!(steps = schedule.len(), "preloading frames");
        let mut frames = VecDeque::with_capacity(schedule.len());
        for step in schedule.steps() {
            if stop.load(Ordering::SeqCst) {
                warn!(
                    loaded = frames.len(),
                    steps = schedule.len(),
                    "preload interrupted"
                );
                return Ok(Self { frames });
            }
            frames.push_back((step.index, sources.load(step)?));
        }
        info!(steps = frames.len(), "preload finished");
        Ok(Self { frames })
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameFetcher for PreloadedFetcher {
    fn fetch(&mut self, step: &StereoStep) -> Result<StereoPair, ContractError> {
        match self.frames.pop_front() {
            Some((index, pair)) if index == step.index => Ok(pair),
            Some((index, _)) => Err(out_of_order(step, index)),
            None => Err(ContractError::Other(format!(
                "preload buffer exhausted at step {}",
                step.index
            ))),
        }
    }

    fn mode(&self) -> FetchMode {
        FetchMode::Preload
    }
}

type PrefetchItem = (usize, Result<StereoPair, ContractError>);

/// Background decoder feeding a bounded queue
pub struct PrefetchFetcher {
    rx: async_channel::Receiver<PrefetchItem>,
    worker: Option<JoinHandle<()>>,
}

impl PrefetchFetcher {
    pub fn spawn(sources: SourcePair, schedule: &StereoSchedule) -> Result<Self, ContractError> {
        let (tx, rx) = async_channel::bounded::<PrefetchItem>(PREFETCH_DEPTH);
        let steps = schedule.steps().to_vec();

        let worker = thread::Builder::new()
            .name("frame-prefetch".to_string())
            .spawn(move || {
                for step in steps {
                    let item = (step.index, sources.load(&step));
                    if tx.send_blocking(item).is_err() {
                        debug!(index = step.index, "prefetch consumer gone");
                        return;
                    }
                }
                debug!("prefetch worker finished");
            })?;

        Ok(Self {
            rx,
            worker: Some(worker),
        })
    }
}

impl FrameFetcher for PrefetchFetcher {
    fn fetch(&mut self, step: &StereoStep) -> Result<StereoPair, ContractError> {
        match self.rx.recv_blocking() {
            Ok((index, pair)) if index == step.index => pair,
            Ok((index, _)) => Err(out_of_order(step, index)),
            Err(_) => Err(ContractError::Other(format!(
                "prefetch worker stopped before step {}",
                step.index
            ))),
        }
    }

    fn mode(&self) -> FetchMode {
        FetchMode::Prefetch
    }
}

impl Drop for PrefetchFetcher {
    fn drop(&mut self) {
        self.rx.close();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("prefetch worker panicked");
            }
        }
    }
}

fn out_of_order(step: &StereoStep, buffered: usize) -> ContractError {
    ContractError::Other(format!(
        "step {} requested out of order, next buffered step is {buffered}",
        step.index
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DualStreamSynchronizer, PlaybackRange};
    use dataset::MockFrameSource;

    fn fixture(count: usize) -> (SourcePair, StereoSchedule, Arc<MockFrameSource>) {
        let left = Arc::new(MockFrameSource::uniform("left", count, 10.0));
        let right = Arc::new(MockFrameSource::uniform("right", count, 10.0));
        let schedule = DualStreamSynchronizer::default().build(
            left.as_ref(),
            right.as_ref(),
            PlaybackRange::forward(0, 100),
            0.0,
        );
        (SourcePair::new(left.clone(), right), schedule, left)
    }

    fn drain(fetcher: &mut dyn FrameFetcher, schedule: &StereoSchedule) -> Vec<(usize, usize)> {
        schedule
            .steps()
            .iter()
            .map(|step| {
                let pair = fetcher.fetch(step).unwrap();
                (pair.left.id, pair.right.id)
            })
            .collect()
    }

    #[test]
    fn mode_from_flags() {
        assert_eq!(FetchMode::from_flags(true, true), FetchMode::Preload);
        assert_eq!(FetchMode::from_flags(false, true), FetchMode::Prefetch);
        assert_eq!(FetchMode::from_flags(false, false), FetchMode::Lazy);
    }

    #[test]
    fn all_modes_yield_same_frames() {
        let (sources, schedule, _) = fixture(6);
        let expected: Vec<(usize, usize)> = (0..6).map(|i| (i, i)).collect();

        for mode in [FetchMode::Lazy, FetchMode::Prefetch, FetchMode::Preload] {
            let mut fetcher = open_fetcher(mode, sources.clone(), &schedule).unwrap();
            assert_eq!(fetcher.mode(), mode);
            assert_eq!(drain(fetcher.as_mut(), &schedule), expected);
        }
    }

    #[test]
    fn preload_decodes_before_first_fetch() {
        let (sources, schedule, left) = fixture(4);
        let fetcher = PreloadedFetcher::load(&sources, &schedule).unwrap();
        assert_eq!(left.load_count(), 4);
        assert_eq!(fetcher.remaining(), 4);
    }

    /// Raises `stop` once the wrapped source has decoded `after` frames
    struct StopAfter {
        inner: Arc<MockFrameSource>,
        stop: Arc<AtomicBool>,
        after: usize,
    }

    impl FrameSource for StopAfter {
        fn name(&self) -> &str {
            self.inner.name()
        }

        fn len(&self) -> usize {
            self.inner.len()
        }

        fn timestamp(&self, id: usize) -> f64 {
            self.inner.timestamp(id)
        }

        fn load(&self, id: usize) -> Result<DecodedFrame, ContractError> {
            let frame = self.inner.load(id)?;
            if self.inner.load_count() >= self.after {
                self.stop.store(true, Ordering::SeqCst);
            }
            Ok(frame)
        }
    }

    #[test]
    fn preload_stops_when_flag_raised() {
        let (_, schedule, _) = fixture(20);
        let left = Arc::new(MockFrameSource::uniform("left", 20, 10.0));
        let stop = Arc::new(AtomicBool::new(false));
        let sources = SourcePair::new(
            Arc::new(StopAfter {
                inner: left.clone(),
                stop: stop.clone(),
                after: 3,
            }),
            Arc::new(MockFrameSource::uniform("right", 20, 10.0)),
        );

        let mut fetcher = PreloadedFetcher::load_until(&sources, &schedule, &stop).unwrap();
        assert_eq!(left.load_count(), 3);
        assert_eq!(fetcher.remaining(), 3);
        assert_eq!(fetcher.fetch(&schedule.steps()[0]).unwrap().left.id, 0);
    }

    #[test]
    fn preload_skipped_when_already_stopped() {
        let (sources, schedule, left) = fixture(5);
        let stop = AtomicBool::new(true);
        let fetcher =
            open_fetcher_until(FetchMode::Preload, sources, &schedule, &stop).unwrap();
        assert_eq!(left.load_count(), 0);
        assert_eq!(fetcher.mode(), FetchMode::Preload);
    }

    #[test]
    fn preload_rejects_out_of_order_step() {
        let (sources, schedule, _) = fixture(3);
        let mut fetcher = PreloadedFetcher::load(&sources, &schedule).unwrap();
        assert!(fetcher.fetch(&schedule.steps()[1]).is_err());
    }

    #[test]
    fn prefetch_stops_when_dropped_early() {
        let (sources, schedule, _) = fixture(50);
        let mut fetcher = PrefetchFetcher::spawn(sources, &schedule).unwrap();
        fetcher.fetch(&schedule.steps()[0]).unwrap();
        drop(fetcher);
    }
}
