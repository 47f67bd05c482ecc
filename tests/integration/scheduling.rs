//! Scheduler behavior: single-shot runs and shutdown handling.

use std::time::Duration;

use csv_feed_uploader::config::UploadConfig;
use csv_feed_uploader::shutdown::ShutdownLatch;
use csv_feed_uploader::uploader::{Scheduler, UploadCycle};
use csv_feed_uploader::CycleOutcome;

use super::helpers::{humidity_config, write_csv, MemoryFeedStore};

const SAMPLE: &str = "timestamp,humidity\n100.0,41\n101.5,42\n103.0,40\n";

#[tokio::test]
async fn test_single_shot_runs_exactly_one_cycle() {
    let file = write_csv(SAMPLE);
    let store = MemoryFeedStore::new();
    let mut config = humidity_config(file.path(), 2);
    config.upload.continuous = false;

    let cycle = UploadCycle::new(&config, store.clone());
    let outcome = Scheduler::new(cycle, &config.upload).run().await;

    assert!(matches!(outcome, CycleOutcome::Uploaded(2)));
    // Only the first batch went out; the remaining record waits for the next
    // invocation.
    assert_eq!(store.uploaded_timestamps(), vec![100.0, 101.5]);
}

#[tokio::test]
async fn test_single_shot_reports_failure() {
    let file = write_csv(SAMPLE);
    let store = MemoryFeedStore::new();
    store.fail_next_put();
    let mut config = humidity_config(file.path(), 100);
    config.upload.continuous = false;

    let cycle = UploadCycle::new(&config, store.clone());
    let outcome = Scheduler::new(cycle, &config.upload).run().await;
    assert!(matches!(outcome, CycleOutcome::Failed(_)));
}

#[tokio::test]
async fn test_continuous_run_drains_file_and_stops_on_shutdown() {
    let file = write_csv(SAMPLE);
    let store = MemoryFeedStore::new();
    let config = {
        let mut c = humidity_config(file.path(), 1);
        c.upload.fast_interval_ms = 1;
        c.upload.normal_interval_ms = 1;
        c.upload.error_interval_ms = 1;
        c
    };

    let shutdown = ShutdownLatch::new();
    let cycle = UploadCycle::new(&config, store.clone());
    let scheduler = Scheduler::new(cycle, &config.upload).with_shutdown(shutdown.clone());

    let runner = tokio::spawn(async move { scheduler.run().await });

    // Wait until all three records have drained, then request shutdown.
    for _ in 0..200 {
        if store.uploaded_timestamps().len() == 3 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(store.uploaded_timestamps(), vec![100.0, 101.5, 103.0]);

    shutdown.trigger();
    let outcome = tokio::time::timeout(Duration::from_secs(5), runner)
        .await
        .expect("scheduler did not stop after shutdown")
        .unwrap();
    assert!(matches!(
        outcome,
        CycleOutcome::NoData | CycleOutcome::Uploaded(_)
    ));
}

#[tokio::test]
async fn test_shutdown_requested_before_run_stops_after_first_cycle() {
    let file = write_csv(SAMPLE);
    let store = MemoryFeedStore::new();
    let config = humidity_config(file.path(), 1);

    let shutdown = ShutdownLatch::new();
    shutdown.trigger();

    let cycle = UploadCycle::new(&config, store.clone());
    let scheduler = Scheduler::new(cycle, &config.upload).with_shutdown(shutdown);

    let outcome = tokio::time::timeout(Duration::from_secs(5), scheduler.run())
        .await
        .expect("scheduler did not honor pre-requested shutdown");
    assert!(matches!(outcome, CycleOutcome::Uploaded(1)));
    assert_eq!(store.uploaded_timestamps(), vec![100.0]);
}
