//! Chunked object download engine.
//!
//! This module turns a listing of remote objects into verified local files.
//!
//! # Features
//!
//! - Bounded ranged reads (2 MiB by default) streamed straight to disk
//! - Byte-count verification against the listed size; partial files removed
//! - Wave scheduling: at most `num_workers` transfers open at once, strict
//!   barrier between waves
//! - Optional retry wrapper for transient range failures
//! - Structured error types with full context
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use objdl_core::download::{RetryPolicy, RetryingStore, WaveScheduler};
//! use objdl_core::resolver::PathResolver;
//! use objdl_core::store::{ObjectStore, S3Config, S3Store, StoreLocation};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let location = StoreLocation::parse("https://storage.example.com/dataset/raster/")?;
//! let s3 = S3Store::new(&S3Config::new(&location, "access", "secret", "ru-1"))?;
//! let store: Arc<dyn ObjectStore> = Arc::new(RetryingStore::new(s3, RetryPolicy::from_retries(2)));
//!
//! let objects = store.list_objects(location.bucket(), location.prefix(), true).await?;
//! let scheduler = WaveScheduler::new(
//!     store,
//!     location.bucket(),
//!     Arc::new(PathResolver::new("./out")),
//!     4,
//!     2 * 1024 * 1024,
//! )?;
//! let report = scheduler.run(objects).await;
//! println!("downloaded {} bytes", report.total_bytes());
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod error;
mod retry;
mod scheduler;
mod state;
mod writer;

pub use client::HttpClient;
pub use constants::{
    DEFAULT_CHUNK_SIZE, DEFAULT_REGION, DEFAULT_WORKERS, MAX_WORKERS, MIN_WORKERS,
};
pub use error::ObjectError;
pub use retry::{
    DEFAULT_MAX_ATTEMPTS, FailureType, MAX_RETRIES_LIMIT, RetryDecision, RetryPolicy,
    RetryingStore, classify_error,
};
pub use scheduler::{
    CompletedObject, FailedObject, NoopObserver, RunReport, SchedulerError, TransferObserver,
    WaveScheduler,
};
pub use state::{Overflow, TransferPhase, TransferState};
pub use writer::{ChunkedObjectWriter, DownloadTask};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, ObjectError>` explicitly in function signatures.
