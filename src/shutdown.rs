//! Graceful shutdown signalling.
//!
//! A [`ShutdownLatch`] is a one-way flag shared by cloning: the binary trips
//! it on Ctrl+C and hands a clone to the scheduler, which checks it between
//! upload cycles and aborts the inter-cycle sleep when it trips. Shutdown
//! therefore always lands on a cycle boundary, never mid-upload.

use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tracing::warn;

/// Clone-to-share one-way shutdown flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownLatch {
    inner: Arc<LatchState>,
}

#[derive(Debug, Default)]
struct LatchState {
    triggered: AtomicBool,
    notify: Notify,
}

impl ShutdownLatch {
    /// Create an untriggered latch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the latch. Waiters are woken exactly once; later calls are no-ops.
    pub fn trigger(&self) {
        if !self.inner.triggered.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    /// Whether the latch has been tripped.
    pub fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::SeqCst)
    }

    /// Wait until the latch trips. Returns immediately if it already has.
    pub async fn wait(&self) {
        // Register with the notifier before checking the flag, so a trigger
        // landing between the check and the await is not missed.
        let mut notified = pin!(self.inner.notify.notified());
        notified.as_mut().enable();
        if self.is_triggered() {
            return;
        }
        notified.await;
    }

    /// Spawn a task that trips the latch on the first Ctrl+C.
    pub fn trigger_on_ctrl_c(&self) {
        let latch = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Ctrl+C received, stopping after the current cycle");
                latch.trigger();
            }
        });
    }
}
