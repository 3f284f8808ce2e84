//! Ctrl-C / SIGTERM handling for the whole `run` command
//!
//! 信号处理在打开数据集之前安装：第一次信号设置停止标志并关闭 viewer，
//! 第二次直接退出。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use outputs::ViewerCloser;
use tokio::task::JoinHandle;
use tracing::{error, warn};

/// Stop flag plus the viewer to close once a stop is requested
#[derive(Clone, Default)]
pub struct Shutdown {
    stop: Arc<AtomicBool>,
    viewer: Arc<Mutex<Option<ViewerCloser>>>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the signal listener; it stops when the guard drops
    pub fn listen(&self) -> SignalGuard {
        SignalGuard(tokio::spawn(signal_bridge(self.clone())))
    }

    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn is_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Ask ingestion to stop and close the viewer
    pub fn request(&self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(viewer) = self.slot().as_ref() {
            viewer.close();
        }
    }

    /// Viewer to close on stop; closed at once if a stop already came in
    pub fn register_viewer(&self, closer: ViewerCloser) {
        let mut slot = self.slot();
        if self.is_requested() {
            closer.close();
        }
        *slot = Some(closer);
    }

    fn slot(&self) -> MutexGuard<'_, Option<ViewerCloser>> {
        self.viewer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Aborts the signal listener on drop
pub struct SignalGuard(JoinHandle<()>);

impl Drop for SignalGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn signal_bridge(shutdown: Shutdown) {
    if let Err(e) = shutdown_signal().await {
        warn!(error = %e, "signal handler unavailable");
        return;
    }
    warn!("Received shutdown signal, finishing current frame");
    shutdown.request();

    if shutdown_signal().await.is_ok() {
        error!("Second shutdown signal, exiting without cleanup");
        std::process::exit(1);
    }
}

async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result,
            _ = terminate.recv() => Ok(()),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_sets_flag_and_closes_viewer() {
        let shutdown = Shutdown::new();
        let (_sink, presentation) = outputs::viewer("viewer", 4);
        shutdown.register_viewer(presentation.closer());
        assert!(!presentation.closer().is_closed());

        shutdown.request();
        assert!(shutdown.is_requested());
        assert!(shutdown.stop_flag().load(Ordering::SeqCst));
        assert!(presentation.closer().is_closed());
    }

    #[test]
    fn viewer_registered_after_stop_closes_immediately() {
        let shutdown = Shutdown::new();
        shutdown.request();

        let (_sink, presentation) = outputs::viewer("viewer", 4);
        shutdown.register_viewer(presentation.closer());
        assert!(presentation.closer().is_closed());
    }

    #[tokio::test]
    async fn listener_is_aborted_with_guard() {
        let shutdown = Shutdown::new();
        let guard = shutdown.listen();
        drop(guard);
        assert!(!shutdown.is_requested());
    }
}
