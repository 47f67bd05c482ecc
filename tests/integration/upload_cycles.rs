//! End-to-end upload cycles against a real file and an in-memory store.

use csv_feed_uploader::uploader::{UploadCycle, UploadError};
use csv_feed_uploader::CycleOutcome;

use super::helpers::{append, humidity_config, write_csv, MemoryFeedStore};

const SAMPLE: &str = "timestamp,humidity\n100.0,41\n101.5,42\n103.0,40\n";

#[tokio::test]
async fn test_fresh_store_receives_whole_file() {
    let file = write_csv(SAMPLE);
    let store = MemoryFeedStore::new();
    let cycle = UploadCycle::new(&humidity_config(file.path(), 100), store.clone());

    match cycle.run().await {
        CycleOutcome::Uploaded(n) => assert_eq!(n, 3),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(store.uploaded_timestamps(), vec![100.0, 101.5, 103.0]);
}

#[tokio::test]
async fn test_batch_carries_channel_names_and_positional_rows() {
    let file = write_csv(SAMPLE);
    let store = MemoryFeedStore::new();
    let cycle = UploadCycle::new(&humidity_config(file.path(), 100), store.clone());
    cycle.run().await;

    let batches = store.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].channel_names, vec!["humidity"]);

    let wire = serde_json::to_value(&batches[0]).unwrap();
    assert_eq!(
        wire,
        serde_json::json!({
            "channel_names": ["humidity"],
            "data": [[100.0, 41], [101.5, 42], [103.0, 40]],
        })
    );
}

#[tokio::test]
async fn test_large_file_drains_in_batches() {
    let mut contents = String::from("timestamp,humidity\n");
    for i in 0..25 {
        contents.push_str(&format!("{}.0,{}\n", 100 + i, 40 + i));
    }
    let file = write_csv(&contents);
    let store = MemoryFeedStore::new();
    let cycle = UploadCycle::new(&humidity_config(file.path(), 10), store.clone());

    assert!(matches!(cycle.run().await, CycleOutcome::Uploaded(10)));
    assert!(matches!(cycle.run().await, CycleOutcome::Uploaded(10)));
    assert!(matches!(cycle.run().await, CycleOutcome::Uploaded(5)));
    assert!(matches!(cycle.run().await, CycleOutcome::NoData));

    let uploaded = store.uploaded_timestamps();
    assert_eq!(uploaded.len(), 25);
    assert!(uploaded.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn test_appends_between_cycles_are_picked_up() {
    let mut file = write_csv(SAMPLE);
    let store = MemoryFeedStore::new();
    let cycle = UploadCycle::new(&humidity_config(file.path(), 100), store.clone());

    assert!(matches!(cycle.run().await, CycleOutcome::Uploaded(3)));
    assert!(matches!(cycle.run().await, CycleOutcome::NoData));

    append(&mut file, "104.0,39\n105.0,38\n");
    assert!(matches!(cycle.run().await, CycleOutcome::Uploaded(2)));
    assert_eq!(
        store.uploaded_timestamps(),
        vec![100.0, 101.5, 103.0, 104.0, 105.0]
    );
}

#[tokio::test]
async fn test_partial_trailing_line_uploads_after_completion() {
    let mut file = write_csv("timestamp,humidity\n100.0,41\n101.5,4");
    let store = MemoryFeedStore::new();
    let cycle = UploadCycle::new(&humidity_config(file.path(), 100), store.clone());

    assert!(matches!(cycle.run().await, CycleOutcome::Uploaded(1)));

    append(&mut file, "2\n");
    assert!(matches!(cycle.run().await, CycleOutcome::Uploaded(1)));
    assert_eq!(store.uploaded_timestamps(), vec![100.0, 101.5]);
}

#[tokio::test]
async fn test_failed_put_is_retried_next_cycle_without_loss() {
    let file = write_csv(SAMPLE);
    let store = MemoryFeedStore::new();
    store.fail_next_put();
    let cycle = UploadCycle::new(&humidity_config(file.path(), 100), store.clone());

    assert!(matches!(
        cycle.run().await,
        CycleOutcome::Failed(UploadError::Store(_))
    ));
    assert!(store.uploaded_timestamps().is_empty());

    // Nothing was acknowledged, so the next cycle re-reads the same records.
    assert!(matches!(cycle.run().await, CycleOutcome::Uploaded(3)));
    assert_eq!(store.uploaded_timestamps(), vec![100.0, 101.5, 103.0]);
}

#[tokio::test]
async fn test_malformed_data_line_fails_without_partial_upload() {
    let file = write_csv("timestamp,humidity\n100.0,41\nbroken\n103.0,40\n");
    let store = MemoryFeedStore::new();
    let cycle = UploadCycle::new(&humidity_config(file.path(), 100), store.clone());

    assert!(matches!(cycle.run().await, CycleOutcome::Failed(_)));
    assert!(store.uploaded_timestamps().is_empty());
}
