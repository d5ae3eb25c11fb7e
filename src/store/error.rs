//! Error types for store listing and ranged reads.

use thiserror::Error;

use super::ByteRange;

/// Errors raised while listing objects. Always fatal for a run.
#[derive(Debug, Error)]
pub enum ListingError {
    /// The store could not be reached or rejected the listing request.
    #[error("listing s3://{bucket}/{prefix} failed: {message}")]
    Unreachable {
        /// Bucket being listed.
        bucket: String,
        /// Prefix being listed.
        prefix: String,
        /// Description of the underlying failure.
        message: String,
    },

    /// The store returned an entry the downloader cannot act on.
    #[error("malformed listing entry in bucket {bucket}: {reason}")]
    Malformed {
        /// Bucket being listed.
        bucket: String,
        /// What was wrong with the entry.
        reason: String,
    },
}

impl ListingError {
    /// Creates an unreachable-store error.
    pub fn unreachable(
        bucket: impl Into<String>,
        prefix: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Unreachable {
            bucket: bucket.into(),
            prefix: prefix.into(),
            message: message.into(),
        }
    }

    /// Creates a malformed-entry error.
    pub fn malformed(bucket: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            bucket: bucket.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by a single ranged read. Recorded against one object.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (connection refused, reset, TLS, body read).
    #[error("network error fetching {key} ({range}): {source}")]
    Network {
        /// Object key.
        key: String,
        /// Range that failed.
        range: ByteRange,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out.
    #[error("timeout fetching {key} ({range})")]
    Timeout {
        /// Object key.
        key: String,
        /// Range that failed.
        range: ByteRange,
    },

    /// Store answered with something other than `206 Partial Content`.
    #[error("HTTP {status} fetching {key} ({range})")]
    HttpStatus {
        /// Object key.
        key: String,
        /// Range that failed.
        range: ByteRange,
        /// The HTTP status code.
        status: u16,
    },

    /// A signed request URL could not be produced for the object.
    #[error("cannot presign request for {key} ({range}): {message}")]
    Presign {
        /// Object key.
        key: String,
        /// Range that failed.
        range: ByteRange,
        /// Description of the signing failure.
        message: String,
    },

    /// The stream yielded more bytes than the range asked for.
    #[error("store sent {received} bytes for {key} ({range})")]
    Overrun {
        /// Object key.
        key: String,
        /// Range that was requested.
        range: ByteRange,
        /// Bytes received before the overrun was detected.
        received: u64,
    },

    /// Any other store-side failure.
    #[error("store error fetching {key} ({range}): {message}")]
    Store {
        /// Object key.
        key: String,
        /// Range that failed.
        range: ByteRange,
        /// Description of the failure.
        message: String,
    },
}

impl FetchError {
    /// Creates a network error from a reqwest error.
    pub fn network(key: impl Into<String>, range: ByteRange, source: reqwest::Error) -> Self {
        Self::Network {
            key: key.into(),
            range,
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(key: impl Into<String>, range: ByteRange) -> Self {
        Self::Timeout {
            key: key.into(),
            range,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(key: impl Into<String>, range: ByteRange, status: u16) -> Self {
        Self::HttpStatus {
            key: key.into(),
            range,
            status,
        }
    }

    /// Creates a presign error.
    pub fn presign(key: impl Into<String>, range: ByteRange, message: impl Into<String>) -> Self {
        Self::Presign {
            key: key.into(),
            range,
            message: message.into(),
        }
    }

    /// Creates an overrun error.
    pub fn overrun(key: impl Into<String>, range: ByteRange, received: u64) -> Self {
        Self::Overrun {
            key: key.into(),
            range,
            received,
        }
    }

    /// Creates a generic store error.
    pub fn store(key: impl Into<String>, range: ByteRange, message: impl Into<String>) -> Self {
        Self::Store {
            key: key.into(),
            range,
            message: message.into(),
        }
    }

    /// Returns the range that failed.
    #[must_use]
    pub fn range(&self) -> ByteRange {
        match self {
            Self::Network { range, .. }
            | Self::Timeout { range, .. }
            | Self::HttpStatus { range, .. }
            | Self::Presign { range, .. }
            | Self::Overrun { range, .. }
            | Self::Store { range, .. } => *range,
        }
    }

    /// Returns the key of the object being fetched.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Network { key, .. }
            | Self::Timeout { key, .. }
            | Self::HttpStatus { key, .. }
            | Self::Presign { key, .. }
            | Self::Overrun { key, .. }
            | Self::Store { key, .. } => key,
        }
    }
}
