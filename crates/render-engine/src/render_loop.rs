//! Periodic redraw task.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use lumacut_common::clock::FramePacing;
use lumacut_common::error::LumacutResult;

/// Handle to a running render loop.
///
/// The loop stops when [`RenderLoop::cancel`] is awaited or the handle is
/// dropped, whichever comes first.
#[derive(Debug)]
pub struct RenderLoop {
    stop_flag: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl RenderLoop {
    /// Run `tick` once per refresh interval on the tokio runtime.
    ///
    /// A failing tick is logged and the loop keeps going.
    pub fn spawn<F>(refresh_hz: u32, mut tick: F) -> Self
    where
        F: FnMut() -> LumacutResult<()> + Send + 'static,
    {
        let pacing = FramePacing::new(refresh_hz);
        let stop_flag = Arc::new(AtomicBool::new(false));
        let ticks = Arc::new(AtomicU64::new(0));

        let flag = stop_flag.clone();
        let counter = ticks.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(pacing.interval());
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::debug!(refresh_hz = pacing.hz(), "Render loop started");

            loop {
                interval.tick().await;
                if flag.load(Ordering::Relaxed) {
                    break;
                }
                if let Err(e) = tick() {
                    tracing::warn!(error = %e, "Render tick failed");
                }
                counter.fetch_add(1, Ordering::Relaxed);
            }

            tracing::debug!(
                ticks = counter.load(Ordering::Relaxed),
                "Render loop stopped"
            );
        });

        Self {
            stop_flag,
            ticks,
            handle: Some(handle),
        }
    }

    /// Ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        !self.stop_flag.load(Ordering::Relaxed)
            && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the loop and wait for it to exit. Returns the number of ticks run.
    pub async fn cancel(mut self) -> u64 {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
        }
        self.ticks()
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
