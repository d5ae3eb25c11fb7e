//! Object Downloader Core Library
//!
//! This library provides the core functionality for `objdl`, which copies
//! large objects out of an S3-compatible store in bounded byte-range chunks,
//! verifies each file by size, and lays the results out locally grouped by
//! entity.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`store`] - Object-store capability and the S3 implementation
//! - [`lister`] - Listing with manifest filtering
//! - [`resolver`] - Key to local path mapping
//! - [`download`] - Chunked writer, wave scheduler, retry wrapper
//! - [`manifest`] - Stem allow-list loading
//! - [`naming`] - Entity naming convention

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
pub mod lister;
pub mod manifest;
pub mod naming;
pub mod resolver;
pub mod store;

// Re-export commonly used types
pub use download::{
    ChunkedObjectWriter, DownloadTask, HttpClient, ObjectError, RetryPolicy, RetryingStore,
    RunReport, SchedulerError, TransferObserver, WaveScheduler,
};
pub use lister::ObjectLister;
pub use manifest::{Manifest, ManifestError};
pub use naming::EntityGrouping;
pub use resolver::{PathResolver, ResolveError};
pub use store::{
    ByteRange, FetchError, ListingError, ObjectStore, RemoteObject, S3Config, S3Store,
    StoreLocation,
};
