//! Object-store capability consumed by the downloader.
//!
//! The downloader only needs two operations from a store: a listing of
//! `(key, size)` pairs under a prefix, and a ranged read of one object.
//! Both are expressed by the [`ObjectStore`] trait so the scheduler and
//! writer can run against the production [`S3Store`] or any other
//! implementation (tests use an in-memory store).
//!
//! # Example
//!
//! ```no_run
//! use objdl_core::store::{ByteRange, ObjectStore, S3Config, S3Store, StoreLocation};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let location = StoreLocation::parse("https://storage.example.com/dataset/raster/")?;
//! let store = S3Store::new(&S3Config::new(&location, "access", "secret", "ru-1"))?;
//! let objects = store
//!     .list_objects(location.bucket(), location.prefix(), true)
//!     .await?;
//! for object in &objects {
//!     println!("{} ({} bytes)", object.key, object.size);
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod location;
mod s3;

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use serde::Serialize;

pub use error::{FetchError, ListingError};
pub use location::{LocationError, StoreLocation};
pub use s3::{S3Config, S3Store};

/// Byte stream returned for one ranged read.
pub type ChunkStream = BoxStream<'static, Result<Bytes, FetchError>>;

/// A single object reported by a store listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RemoteObject {
    /// Full object key within the bucket.
    pub key: String,
    /// Object size in bytes as reported by the listing.
    pub size: u64,
}

impl RemoteObject {
    /// Creates a remote object descriptor.
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size,
        }
    }

    /// Returns the final `/`-separated component of the key.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

/// A non-empty window of bytes within an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    offset: u64,
    length: u64,
}

impl ByteRange {
    /// Creates a range of `length` bytes starting at `offset`.
    ///
    /// Returns `None` for empty ranges or ranges whose end overflows `u64`.
    #[must_use]
    pub fn new(offset: u64, length: u64) -> Option<Self> {
        if length == 0 || offset.checked_add(length).is_none() {
            return None;
        }
        Some(Self { offset, length })
    }

    /// First byte of the range.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Number of bytes in the range.
    #[must_use]
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Last byte of the range (inclusive).
    #[must_use]
    pub fn last_byte(&self) -> u64 {
        self.offset + self.length - 1
    }

    /// Renders the HTTP `Range` header value, e.g. `bytes=0-1023`.
    #[must_use]
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.offset, self.last_byte())
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "offset {} length {}", self.offset, self.length)
    }
}

/// Capability required from an S3-compatible object store.
///
/// Implementations must be shareable across worker tasks; each task holds
/// an `Arc<dyn ObjectStore>` handle rather than reaching for global state.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Lists every object under `prefix`.
    ///
    /// When `recursive` is false only objects directly under the prefix are
    /// returned. Directory markers (keys ending in `/`) are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ListingError`] when the store is unreachable or returns
    /// malformed entries. No partial listing is returned.
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        recursive: bool,
    ) -> Result<Vec<RemoteObject>, ListingError>;

    /// Opens a ranged read of `key`.
    ///
    /// The caller must not request bytes past the object's known size and
    /// must consume the stream fully before requesting the next range.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] carrying the failed range.
    async fn get_range(
        &self,
        bucket: &str,
        key: &str,
        range: ByteRange,
    ) -> Result<ChunkStream, FetchError>;
}
