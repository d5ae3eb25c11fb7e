//! Per-object error types for the download module.
//!
//! Every variant is isolated to one object: the scheduler records it against
//! the object's key and keeps going.

use std::path::PathBuf;

use thiserror::Error;

use crate::resolver::ResolveError;
use crate::store::FetchError;

/// Errors that end a single object's transfer.
#[derive(Debug, Error)]
pub enum ObjectError {
    /// Bytes written do not match the size reported by the listing.
    #[error("size mismatch for {path}: got {got} bytes, expected {want} bytes")]
    SizeMismatch {
        /// Destination that was removed.
        path: PathBuf,
        /// Bytes written before the transfer stopped.
        got: u64,
        /// Size reported by the listing.
        want: u64,
    },

    /// A ranged read failed part-way through the object.
    #[error("transfer to {path} stopped after {written} bytes: {source}")]
    Fetch {
        /// Destination that was removed.
        path: PathBuf,
        /// Bytes written before the failure.
        written: u64,
        /// The failed range request.
        #[source]
        source: FetchError,
    },

    /// Local file system error (create, write, flush).
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The key could not be mapped to a destination path.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl ObjectError {
    /// Creates a size mismatch error.
    pub fn size_mismatch(path: impl Into<PathBuf>, got: u64, want: u64) -> Self {
        Self::SizeMismatch {
            path: path.into(),
            got,
            want,
        }
    }

    /// Creates a fetch failure error.
    pub fn fetch(path: impl Into<PathBuf>, written: u64, source: FetchError) -> Self {
        Self::Fetch {
            path: path.into(),
            written,
            source,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// Note: `From<FetchError>` and `From<std::io::Error>` are intentionally absent.
// Both variants need the destination path (and bytes written) that the
// source errors do not carry; use the helper constructors instead.
