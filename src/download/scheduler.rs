//! Wave scheduler for batch object downloads.
//!
//! This module provides the [`WaveScheduler`] which partitions the listed
//! objects into consecutive waves of `num_workers` and runs each wave to
//! completion before starting the next.
//!
//! # Concurrency Model
//!
//! - Each object in a wave runs in its own Tokio task inside a `JoinSet`
//! - The set is drained completely before the next wave is formed, so at
//!   most `num_workers` transfers are open at any instant
//! - Every task receives its own `Arc` handles to the store and resolver
//! - A failed or panicked task is recorded against its key; siblings and
//!   later waves keep going
//! - Cancellation is cooperative and only checked between waves

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use super::constants::{MAX_WORKERS, MIN_WORKERS};
use super::error::ObjectError;
use super::writer::{ChunkedObjectWriter, DownloadTask};
use crate::resolver::{PathResolver, ResolveError};
use crate::store::{ObjectStore, RemoteObject};

/// Error type for scheduler construction.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Worker count outside the supported range.
    #[error("invalid worker count {value}: must be between {MIN_WORKERS} and {MAX_WORKERS}")]
    InvalidWorkers {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Chunk size of zero.
    #[error("invalid chunk size 0: must be at least 1 byte")]
    InvalidChunkSize,
}

/// Lifecycle callbacks raised while a run progresses.
///
/// All methods default to no-ops. Callbacks for one object may come from
/// any worker task, so implementations must be thread-safe.
#[allow(unused_variables)]
pub trait TransferObserver: Send + Sync {
    /// A wave (1-indexed) of `total` is about to start.
    fn wave_started(&self, wave: usize, total: usize, objects: &[RemoteObject]) {}

    /// A worker picked up `object`.
    fn task_started(&self, object: &RemoteObject) {}

    /// `len` more bytes of `key` reached the destination file.
    fn bytes_written(&self, key: &str, len: u64) {}

    /// The transfer of `key` ended.
    fn task_finished(&self, key: &str, succeeded: bool) {}

    /// Every task of `wave` has finished.
    fn wave_finished(&self, wave: usize) {}
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl TransferObserver for NoopObserver {}

/// An object that was downloaded and verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletedObject {
    /// Object key.
    pub key: String,
    /// Local file it was written to.
    pub path: PathBuf,
    /// Bytes written, equal to the listed size.
    pub bytes: u64,
}

/// An object whose transfer failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedObject {
    /// Object key.
    pub key: String,
    /// Human-readable failure reason.
    pub reason: String,
}

/// Outcome of a scheduler run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Verified objects, in completion order.
    pub completed: Vec<CompletedObject>,
    /// Failed objects, in completion order.
    pub failed: Vec<FailedObject>,
    /// Waves that ran.
    pub waves: usize,
    /// Keys never started because the run was interrupted.
    pub not_started: Vec<String>,
    /// True when the run stopped at a wave boundary on request.
    pub interrupted: bool,
}

impl RunReport {
    /// Total bytes written across completed objects.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.completed.iter().map(|object| object.bytes).sum()
    }

    /// True when at least one object failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Runs object downloads in bounded, strictly ordered waves.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use objdl_core::download::WaveScheduler;
/// use objdl_core::resolver::PathResolver;
/// use objdl_core::store::{ObjectStore, RemoteObject};
///
/// # async fn example(store: Arc<dyn ObjectStore>) -> Result<(), Box<dyn std::error::Error>> {
/// let resolver = Arc::new(PathResolver::new("./out"));
/// let scheduler = WaveScheduler::new(store, "dataset", resolver, 4, 2 * 1024 * 1024)?;
/// let report = scheduler
///     .run(vec![RemoteObject::new("raster/A_48N.tif", 5_000_000)])
///     .await;
/// println!("completed {}, failed {}", report.completed.len(), report.failed.len());
/// # Ok(())
/// # }
/// ```
pub struct WaveScheduler {
    store: Arc<dyn ObjectStore>,
    bucket: Arc<str>,
    resolver: Arc<PathResolver>,
    num_workers: usize,
    chunk_size: u64,
    observer: Arc<dyn TransferObserver>,
}

impl std::fmt::Debug for WaveScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaveScheduler")
            .field("bucket", &self.bucket)
            .field("root", &self.resolver.root())
            .field("num_workers", &self.num_workers)
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}

impl WaveScheduler {
    /// Creates a scheduler.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidWorkers`] if `num_workers` is outside
    /// `1..=64`, and [`SchedulerError::InvalidChunkSize`] if `chunk_size` is 0.
    #[instrument(level = "debug", skip(store, resolver))]
    pub fn new(
        store: Arc<dyn ObjectStore>,
        bucket: &str,
        resolver: Arc<PathResolver>,
        num_workers: usize,
        chunk_size: u64,
    ) -> Result<Self, SchedulerError> {
        if !(MIN_WORKERS..=MAX_WORKERS).contains(&num_workers) {
            return Err(SchedulerError::InvalidWorkers { value: num_workers });
        }
        if chunk_size == 0 {
            return Err(SchedulerError::InvalidChunkSize);
        }

        Ok(Self {
            store,
            bucket: Arc::from(bucket),
            resolver,
            num_workers,
            chunk_size,
            observer: Arc::new(NoopObserver),
        })
    }

    /// Reports lifecycle events to `observer`.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn TransferObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Configured wave width.
    #[must_use]
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Configured range length.
    #[must_use]
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Downloads every object, wave by wave.
    pub async fn run(&self, objects: Vec<RemoteObject>) -> RunReport {
        self.run_interruptible(objects, &AtomicBool::new(false))
            .await
    }

    /// Downloads every object, stopping at the next wave boundary once
    /// `interrupted` is set.
    ///
    /// Individual object failures never end the run; they are recorded in
    /// the returned report.
    #[instrument(skip_all, fields(objects = objects.len(), workers = self.num_workers))]
    pub async fn run_interruptible(
        &self,
        objects: Vec<RemoteObject>,
        interrupted: &AtomicBool,
    ) -> RunReport {
        let total_waves = objects.len().div_ceil(self.num_workers);
        let taken = self.claim_destinations(&objects);
        let mut report = RunReport::default();

        info!(
            objects = objects.len(),
            waves = total_waves,
            chunk_size = self.chunk_size,
            "starting download run"
        );

        for (index, wave) in objects.chunks(self.num_workers).enumerate() {
            if interrupted.load(Ordering::SeqCst) {
                let done = index * self.num_workers;
                report.not_started = objects[done..]
                    .iter()
                    .map(|object| object.key.clone())
                    .collect();
                report.interrupted = true;
                warn!(
                    wave = index + 1,
                    remaining = report.not_started.len(),
                    "run interrupted at wave boundary"
                );
                break;
            }

            let number = index + 1;
            self.observer.wave_started(number, total_waves, wave);
            debug!(wave = number, size = wave.len(), "starting wave");

            self.run_wave(wave, &taken, &mut report).await;

            report.waves = number;
            self.observer.wave_finished(number);
            debug!(wave = number, "wave drained");
        }

        info!(
            completed = report.completed.len(),
            failed = report.failed.len(),
            not_started = report.not_started.len(),
            bytes = report.total_bytes(),
            "download run complete"
        );
        report
    }

    /// Spawns one task per object of `wave` and waits for all of them.
    async fn run_wave(
        &self,
        wave: &[RemoteObject],
        taken: &HashMap<String, (PathBuf, String)>,
        report: &mut RunReport,
    ) {
        let mut set = JoinSet::new();
        let mut keys = HashMap::new();

        for object in wave {
            if let Some((path, claimed_by)) = taken.get(&object.key) {
                let error = ObjectError::Resolve(ResolveError::DestinationTaken {
                    key: object.key.clone(),
                    path: path.clone(),
                    claimed_by: claimed_by.clone(),
                });
                warn!(key = %object.key, error = %error, "object skipped");
                self.observer.task_finished(&object.key, false);
                report.failed.push(FailedObject {
                    key: object.key.clone(),
                    reason: error.to_string(),
                });
                continue;
            }

            let store = Arc::clone(&self.store);
            let bucket = Arc::clone(&self.bucket);
            let resolver = Arc::clone(&self.resolver);
            let observer = Arc::clone(&self.observer);
            let object = object.clone();
            let chunk_size = self.chunk_size;
            let key = object.key.clone();

            let handle = set.spawn(async move {
                observer.task_started(&object);
                let outcome = transfer(
                    store.as_ref(),
                    &bucket,
                    &resolver,
                    &object,
                    chunk_size,
                    observer.as_ref(),
                )
                .await;
                observer.task_finished(&object.key, outcome.is_ok());
                (object, outcome)
            });
            keys.insert(handle.id(), key);
        }

        while let Some(joined) = set.join_next_with_id().await {
            match joined {
                Ok((id, (object, Ok(completed)))) => {
                    keys.remove(&id);
                    info!(
                        key = %object.key,
                        path = %completed.path.display(),
                        bytes = completed.bytes,
                        "object downloaded"
                    );
                    report.completed.push(completed);
                }
                Ok((id, (object, Err(error)))) => {
                    keys.remove(&id);
                    warn!(key = %object.key, error = %error, "object failed");
                    report.failed.push(FailedObject {
                        key: object.key,
                        reason: error.to_string(),
                    });
                }
                Err(join_error) => {
                    let key = keys
                        .remove(&join_error.id())
                        .unwrap_or_else(|| "<unknown>".to_string());
                    warn!(key = %key, error = %join_error, "download task panicked");
                    self.observer.task_finished(&key, false);
                    report.failed.push(FailedObject {
                        key,
                        reason: format!("worker task failed: {join_error}"),
                    });
                }
            }
        }
    }

    /// Maps each key that shares a destination with an earlier key to that
    /// destination and the earlier key.
    fn claim_destinations(&self, objects: &[RemoteObject]) -> HashMap<String, (PathBuf, String)> {
        let mut owners: HashMap<PathBuf, &str> = HashMap::new();
        let mut taken = HashMap::new();

        for object in objects {
            let Ok(path) = self.resolver.destination(&object.key) else {
                continue;
            };
            match owners.get(&path) {
                Some(owner) => {
                    taken.insert(object.key.clone(), (path, (*owner).to_string()));
                }
                None => {
                    owners.insert(path, &object.key);
                }
            }
        }

        if !taken.is_empty() {
            warn!(
                conflicts = taken.len(),
                "some objects map to an already used destination"
            );
        }
        taken
    }
}

/// Resolves, downloads and verifies one object.
async fn transfer(
    store: &dyn ObjectStore,
    bucket: &str,
    resolver: &PathResolver,
    object: &RemoteObject,
    chunk_size: u64,
    observer: &dyn TransferObserver,
) -> Result<CompletedObject, ObjectError> {
    let destination = resolver.resolve(&object.key).await?;
    let task = DownloadTask::new(object.clone(), destination);
    let writer = ChunkedObjectWriter::new(store, bucket, chunk_size);

    let state = writer
        .download(&task, &|len| observer.bytes_written(&object.key, len))
        .await?;

    Ok(CompletedObject {
        key: task.object.key,
        path: task.destination,
        bytes: state.bytes_written(),
    })
}
