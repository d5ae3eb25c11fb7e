//! Integration tests for the wave scheduler and listing pipeline.

#![allow(clippy::unwrap_used)]

mod support;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use objdl_core::download::NoopObserver;
use objdl_core::{
    EntityGrouping, Manifest, ObjectLister, ObjectStore, PathResolver, RemoteObject, RetryPolicy,
    RetryingStore, TransferObserver, WaveScheduler,
};
use support::memory_store::{Fault, MemoryStore, pattern};
use support::recorder::{Event, Recorder};
use tempfile::TempDir;

const CHUNK: u64 = 64 * 1024;

async fn listed(store: &Arc<MemoryStore>) -> Vec<RemoteObject> {
    store.list_objects("dataset", "", true).await.unwrap()
}

fn scheduler(store: &Arc<MemoryStore>, root: &Path, workers: usize) -> WaveScheduler {
    let resolver = Arc::new(PathResolver::new(root));
    WaveScheduler::new(
        Arc::clone(store) as Arc<dyn ObjectStore>,
        "dataset",
        resolver,
        workers,
        CHUNK,
    )
    .unwrap()
}

fn numbered_store(count: usize, size: usize) -> MemoryStore {
    (0..count).fold(MemoryStore::new(), |store, i| {
        store.with_object(&format!("raster/E{i}_48N.tif"), size)
    })
}

#[tokio::test]
async fn test_concurrency_never_exceeds_worker_count() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(numbered_store(10, 1000).with_latency(Duration::from_millis(50)));
    let objects = listed(&store).await;

    let report = scheduler(&store, dir.path(), 3).run(objects).await;

    assert_eq!(report.completed.len(), 10);
    assert_eq!(report.waves, 4);
    assert_eq!(store.max_concurrent_requests(), 3);
}

#[tokio::test]
async fn test_waves_run_strictly_in_order() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(numbered_store(5, 1000));
    let objects = listed(&store).await;
    let keys: Vec<String> = objects.iter().map(|object| object.key.clone()).collect();
    let recorder = Arc::new(Recorder::new());

    let report = scheduler(&store, dir.path(), 2)
        .with_observer(Arc::clone(&recorder) as Arc<dyn TransferObserver>)
        .run(objects)
        .await;

    assert_eq!(report.waves, 3);
    assert_eq!(report.completed.len(), 5);

    let wave1_end = recorder.position(&Event::WaveFinished(1));
    let wave2_end = recorder.position(&Event::WaveFinished(2));
    for key in &keys[..2] {
        assert!(recorder.position(&Event::TaskFinished(key.clone(), true)) < wave1_end);
    }
    for key in &keys[2..4] {
        let started = recorder.position(&Event::TaskStarted(key.clone()));
        assert!(started > wave1_end, "{key} started before wave 1 drained");
        assert!(recorder.position(&Event::TaskFinished(key.clone(), true)) < wave2_end);
    }
    assert!(recorder.position(&Event::TaskStarted(keys[4].clone())) > wave2_end);
    assert_eq!(recorder.bytes(), 5000);
}

#[tokio::test]
async fn test_every_object_is_fetched_exactly_once() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(numbered_store(7, 1000));
    let objects = listed(&store).await;

    scheduler(&store, dir.path(), 3).run(objects.clone()).await;

    for object in &objects {
        assert_eq!(store.fetches_for(&object.key), vec![(0, 1000)]);
    }
    assert_eq!(store.fetches().len(), 7);
}

#[tokio::test]
async fn test_failed_object_does_not_affect_siblings() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(
        MemoryStore::new()
            .with_object("raster/A_48N.tif", 1000)
            .with_object("raster/B_48N.tif", 1000)
            .with_object("raster/C_48N.tif", 1000)
            .with_fault("raster/B_48N.tif", Fault::Status(404)),
    );
    let objects = listed(&store).await;

    let report = scheduler(&store, dir.path(), 2).run(objects).await;

    assert_eq!(report.completed.len(), 2);
    assert!(report.has_failures());
    assert_eq!(report.failed[0].key, "raster/B_48N.tif");
    let reason = &report.failed[0].reason;
    assert!(reason.contains("404"), "Expected status in: {reason}");
    assert!(dir.path().join("A").join("A_48N.tif").exists());
    assert!(dir.path().join("C").join("C_48N.tif").exists());
    assert!(!dir.path().join("B").join("B_48N.tif").exists());
}

#[tokio::test]
async fn test_panicking_task_is_recorded_against_its_key() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(
        MemoryStore::new()
            .with_object("raster/A_48N.tif", 1000)
            .with_object("raster/B_48N.tif", 1000)
            .with_fault("raster/A_48N.tif", Fault::Panic),
    );
    let objects = listed(&store).await;

    let report = scheduler(&store, dir.path(), 2).run(objects).await;

    assert_eq!(report.completed.len(), 1);
    assert_eq!(report.completed[0].key, "raster/B_48N.tif");
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].key, "raster/A_48N.tif");
    let reason = &report.failed[0].reason;
    assert!(reason.contains("worker task failed"), "Expected panic note in: {reason}");
}

#[tokio::test]
async fn test_interrupt_stops_at_wave_boundary() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(numbered_store(5, 1000));
    let objects = listed(&store).await;
    let keys: Vec<String> = objects.iter().map(|object| object.key.clone()).collect();
    let interrupted = Arc::new(AtomicBool::new(false));
    let recorder = Arc::new(Recorder::interrupting_after(1, Arc::clone(&interrupted)));

    let report = scheduler(&store, dir.path(), 2)
        .with_observer(Arc::clone(&recorder) as Arc<dyn TransferObserver>)
        .run_interruptible(objects, &interrupted)
        .await;

    assert!(report.interrupted);
    assert_eq!(report.waves, 1);
    assert_eq!(report.completed.len(), 2);
    assert_eq!(report.not_started, keys[2..].to_vec());
    assert_eq!(store.fetches().len(), 2);
    for key in &keys[2..] {
        let file_name = key.rsplit('/').next().unwrap();
        let entity = file_name.split('_').next().unwrap();
        assert!(!dir.path().join(entity).join(file_name).exists());
    }
}

#[tokio::test]
async fn test_interrupt_before_start_runs_nothing() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(numbered_store(3, 10));
    let objects = listed(&store).await;

    let report = scheduler(&store, dir.path(), 2)
        .run_interruptible(objects, &AtomicBool::new(true))
        .await;

    assert!(report.interrupted);
    assert_eq!(report.waves, 0);
    assert_eq!(report.not_started.len(), 3);
    assert!(store.fetches().is_empty());
}

#[tokio::test]
async fn test_shared_destination_fails_later_key() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(
        MemoryStore::new()
            .with_object("north/A_48N.tif", 100)
            .with_object("south/A_48N.tif", 200),
    );
    let objects = listed(&store).await;

    let report = scheduler(&store, dir.path(), 4).run(objects).await;

    assert_eq!(report.completed.len(), 1);
    assert_eq!(report.completed[0].key, "north/A_48N.tif");
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].key, "south/A_48N.tif");
    let reason = &report.failed[0].reason;
    assert!(reason.contains("already used"), "Expected collision in: {reason}");
    assert!(store.fetches_for("south/A_48N.tif").is_empty());
    assert_eq!(
        std::fs::read(dir.path().join("A").join("A_48N.tif")).unwrap(),
        pattern(100)
    );
}

#[tokio::test]
async fn test_layout_groups_by_entity() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(
        MemoryStore::new()
            .with_object("dataset_9/Raster/A_B_48N.tif", 100)
            .with_object("dataset_9/Raster/A_B_47N.tif", 100)
            .with_object("dataset_9/Raster/plain.tif", 100),
    );
    let objects = listed(&store).await;

    let report = scheduler(&store, dir.path(), 2).run(objects).await;

    assert_eq!(report.completed.len(), 3);
    assert!(dir.path().join("A_B").join("A_B_48N.tif").is_file());
    assert!(dir.path().join("A_B").join("A_B_47N.tif").is_file());
    assert!(dir.path().join("plain.tif").is_file());
}

#[tokio::test]
async fn test_flat_layout_writes_into_root() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new().with_object("raster/A_B_48N.tif", 100));
    let objects = listed(&store).await;
    let resolver = Arc::new(PathResolver::with_grouping(dir.path(), EntityGrouping::Flat));

    let report = WaveScheduler::new(
        Arc::clone(&store) as Arc<dyn ObjectStore>,
        "dataset",
        resolver,
        1,
        CHUNK,
    )
    .unwrap()
    .run(objects)
    .await;

    assert_eq!(report.completed.len(), 1);
    assert_eq!(report.completed[0].path, dir.path().join("A_B_48N.tif"));
}

#[tokio::test]
async fn test_empty_listing_runs_no_waves() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());

    let report = scheduler(&store, dir.path(), 4).run(Vec::new()).await;

    assert_eq!(report.waves, 0);
    assert!(report.completed.is_empty());
    assert!(!report.has_failures());
}

#[tokio::test]
async fn test_manifest_selects_objects_for_download() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(
        MemoryStore::new()
            .with_object("raster/A_48N.tif", 100)
            .with_object("raster/B_48N.tif", 100)
            .with_object("raster/C_47N.tif", 100),
    );
    let lister = ObjectLister::new(Arc::clone(&store) as Arc<dyn ObjectStore>)
        .with_manifest(Manifest::parse("A\n\n C \n"));

    let objects = lister.list("dataset", "raster/", true).await.unwrap();
    let keys: Vec<&str> = objects.iter().map(|object| object.key.as_str()).collect();
    assert_eq!(keys, vec!["raster/A_48N.tif", "raster/C_47N.tif"]);

    let report = scheduler(&store, dir.path(), 4).run(objects).await;

    assert_eq!(report.completed.len(), 2);
    assert!(store.fetches_for("raster/B_48N.tif").is_empty());
    assert!(!dir.path().join("B").exists());
}

#[tokio::test]
async fn test_lister_non_recursive_skips_nested_keys() {
    let store = Arc::new(
        MemoryStore::new()
            .with_object("raster/A_48N.tif", 100)
            .with_object("raster/old/A_47N.tif", 100),
    );
    let lister = ObjectLister::new(Arc::clone(&store) as Arc<dyn ObjectStore>);

    let objects = lister.list("dataset", "raster/", false).await.unwrap();

    assert_eq!(objects, vec![RemoteObject::new("raster/A_48N.tif", 100)]);
}

#[tokio::test]
async fn test_listing_failure_is_fatal() {
    let store = Arc::new(MemoryStore::new().with_listing_error("connection refused"));
    let lister = ObjectLister::new(Arc::clone(&store) as Arc<dyn ObjectStore>);

    let error = lister.list("dataset", "raster/", true).await.unwrap_err();

    let msg = error.to_string();
    assert!(msg.contains("connection refused"), "Expected cause in: {msg}");
}

#[tokio::test(start_paused = true)]
async fn test_retrying_store_recovers_transient_range_failure() {
    let dir = TempDir::new().unwrap();
    let memory = MemoryStore::new()
        .with_object("raster/A_48N.tif", 1000)
        .with_fault(
            "raster/A_48N.tif",
            Fault::FailTimes {
                status: 503,
                times: 2,
            },
        );
    let store: Arc<dyn ObjectStore> =
        Arc::new(RetryingStore::new(memory, RetryPolicy::from_retries(2)));
    let objects = store.list_objects("dataset", "", true).await.unwrap();
    let resolver = Arc::new(PathResolver::new(dir.path()));

    let report = WaveScheduler::new(store, "dataset", resolver, 1, CHUNK)
        .unwrap()
        .with_observer(Arc::new(NoopObserver))
        .run(objects)
        .await;

    assert_eq!(report.completed.len(), 1, "failed: {:?}", report.failed);
    assert_eq!(report.total_bytes(), 1000);
}

#[tokio::test]
async fn test_without_retries_transient_failure_fails_object() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(
        MemoryStore::new()
            .with_object("raster/A_48N.tif", 1000)
            .with_fault(
                "raster/A_48N.tif",
                Fault::FailTimes {
                    status: 503,
                    times: 1,
                },
            ),
    );
    let objects = listed(&store).await;

    let report = scheduler(&store, dir.path(), 1).run(objects).await;

    assert_eq!(report.failed.len(), 1);
    assert_eq!(store.fetches_for("raster/A_48N.tif").len(), 1);
}
