//! Adaptive cycle scheduling.
//!
//! The delay before the next cycle depends on what the last one did: a large
//! upload means the uploader is catching up and should go again almost
//! immediately, a small or empty one means it is keeping pace, and a failure
//! backs off hard so a broken store or config is not hammered.

use std::time::Duration;

use tracing::{debug, info};

use crate::config::UploadConfig;
use crate::shutdown::ShutdownLatch;
use crate::store::FeedStore;

use super::{CycleOutcome, UploadCycle};

/// The three inter-cycle delays plus the record-count threshold that selects
/// between fast and normal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadIntervals {
    /// Delay after a cycle that uploaded at least `record_count_threshold`
    /// records
    pub fast: Duration,
    /// Delay after a quiet cycle
    pub normal: Duration,
    /// Delay after a failed cycle
    pub error: Duration,
    /// Minimum uploaded record count for a cycle to count as catching up
    pub record_count_threshold: usize,
}

impl UploadIntervals {
    /// Pick the delay before the next cycle from the last cycle's outcome.
    pub fn delay_for(&self, outcome: &CycleOutcome) -> Duration {
        match outcome {
            CycleOutcome::Uploaded(n) if *n >= self.record_count_threshold => self.fast,
            CycleOutcome::Uploaded(_) | CycleOutcome::NoData => self.normal,
            CycleOutcome::Failed(_) => self.error,
        }
    }
}

impl From<&UploadConfig> for UploadIntervals {
    fn from(config: &UploadConfig) -> Self {
        Self {
            fast: Duration::from_millis(config.fast_interval_ms),
            normal: Duration::from_millis(config.normal_interval_ms),
            error: Duration::from_millis(config.error_interval_ms),
            record_count_threshold: config.record_count_threshold,
        }
    }
}

/// Drives an [`UploadCycle`] either once or continuously.
///
/// In continuous mode the loop only ends on shutdown; the shutdown flag is
/// checked between cycles and also interrupts the inter-cycle sleep, so a
/// long error backoff does not delay exit.
pub struct Scheduler<S: FeedStore> {
    cycle: UploadCycle<S>,
    intervals: UploadIntervals,
    continuous: bool,
    shutdown: Option<ShutdownLatch>,
}

impl<S: FeedStore> Scheduler<S> {
    /// Build a scheduler with no shutdown latch; a continuous run then loops
    /// until the process is killed.
    pub fn new(cycle: UploadCycle<S>, config: &UploadConfig) -> Self {
        Self {
            cycle,
            intervals: UploadIntervals::from(config),
            continuous: config.continuous,
            shutdown: None,
        }
    }

    /// Stop the continuous loop at the next cycle boundary after this latch
    /// trips.
    pub fn with_shutdown(mut self, shutdown: ShutdownLatch) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Run until shutdown (continuous mode) or for exactly one cycle.
    ///
    /// Returns the outcome of the last completed cycle.
    pub async fn run(&self) -> CycleOutcome {
        let mut outcome = self.cycle.run().await;
        if !self.continuous {
            return outcome;
        }

        loop {
            let delay = self.intervals.delay_for(&outcome);
            debug!(delay_ms = delay.as_millis() as u64, "next cycle scheduled");

            if self.sleep_or_shutdown(delay).await {
                info!("shutdown requested; stopping after current cycle");
                return outcome;
            }

            outcome = self.cycle.run().await;
        }
    }

    /// Sleep for `delay`, returning `true` if shutdown was requested before
    /// the delay elapsed (or already was).
    async fn sleep_or_shutdown(&self, delay: Duration) -> bool {
        match &self.shutdown {
            Some(shutdown) => {
                if shutdown.is_triggered() {
                    return true;
                }
                tokio::select! {
                    _ = tokio::time::sleep(delay) => false,
                    _ = shutdown.wait() => true,
                }
            }
            None => {
                tokio::time::sleep(delay).await;
                false
            }
        }
    }
}
