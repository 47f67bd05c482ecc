//! Resume correctness when the uploader restarts with no local state.
//!
//! Every test builds a fresh `UploadCycle` mid-scenario; the only state that
//! survives is what the store reports.

use csv_feed_uploader::uploader::UploadCycle;
use csv_feed_uploader::CycleOutcome;

use super::helpers::{append, humidity_config, write_csv, MemoryFeedStore};

const SAMPLE: &str = "timestamp,humidity\n100.0,41\n101.5,42\n103.0,40\n";

#[tokio::test]
async fn test_restart_continues_where_store_left_off() {
    let mut file = write_csv(SAMPLE);
    let store = MemoryFeedStore::new();

    {
        let cycle = UploadCycle::new(&humidity_config(file.path(), 2), store.clone());
        assert!(matches!(cycle.run().await, CycleOutcome::Uploaded(2)));
    }

    // Process restarts; more data arrived meanwhile.
    append(&mut file, "104.0,39\n");
    let cycle = UploadCycle::new(&humidity_config(file.path(), 100), store.clone());
    assert!(matches!(cycle.run().await, CycleOutcome::Uploaded(2)));

    assert_eq!(
        store.uploaded_timestamps(),
        vec![100.0, 101.5, 103.0, 104.0]
    );
}

#[tokio::test]
async fn test_high_water_between_rows_resumes_at_next_newer_row() {
    let file = write_csv(SAMPLE);
    // 102.0 never appears in the file; resume starts at the first row after
    // it rather than re-uploading 101.5.
    let store = MemoryFeedStore::with_max_timestamp(102.0);
    let cycle = UploadCycle::new(&humidity_config(file.path(), 100), store.clone());

    assert!(matches!(cycle.run().await, CycleOutcome::Uploaded(1)));
    assert_eq!(store.uploaded_timestamps(), vec![103.0]);
}

#[tokio::test]
async fn test_high_water_matching_a_row_skips_that_row() {
    let file = write_csv(SAMPLE);
    let store = MemoryFeedStore::with_max_timestamp(101.5);
    let cycle = UploadCycle::new(&humidity_config(file.path(), 100), store.clone());

    assert!(matches!(cycle.run().await, CycleOutcome::Uploaded(1)));
    assert_eq!(store.uploaded_timestamps(), vec![103.0]);
}

#[tokio::test]
async fn test_high_water_before_first_row_uploads_everything() {
    let file = write_csv(SAMPLE);
    let store = MemoryFeedStore::with_max_timestamp(50.0);
    let cycle = UploadCycle::new(&humidity_config(file.path(), 100), store.clone());

    assert!(matches!(cycle.run().await, CycleOutcome::Uploaded(3)));
    assert_eq!(store.uploaded_timestamps(), vec![100.0, 101.5, 103.0]);
}

#[tokio::test]
async fn test_high_water_past_last_row_is_idle() {
    let file = write_csv(SAMPLE);
    let store = MemoryFeedStore::with_max_timestamp(103.0);
    let cycle = UploadCycle::new(&humidity_config(file.path(), 100), store.clone());

    assert!(matches!(cycle.run().await, CycleOutcome::NoData));
    assert!(store.uploaded_timestamps().is_empty());
}

#[tokio::test]
async fn test_repeated_restarts_never_duplicate_records() {
    let mut file = write_csv("timestamp,humidity\n");
    let store = MemoryFeedStore::new();

    for i in 0..5u32 {
        append(&mut file, &format!("{}.0,{}\n", 100 + i, 40 + i));
        let cycle = UploadCycle::new(&humidity_config(file.path(), 100), store.clone());
        assert!(matches!(cycle.run().await, CycleOutcome::Uploaded(1)));
    }

    assert_eq!(
        store.uploaded_timestamps(),
        vec![100.0, 101.0, 102.0, 103.0, 104.0]
    );
}
