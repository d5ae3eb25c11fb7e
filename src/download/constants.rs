//! Constants for the download module (timeouts, chunking, worker bounds).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large chunks).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Default lifetime of a presigned object URL (1 hour).
pub const PRESIGN_TTL_SECS: u64 = 3600;

/// Default ranged-read size (2 MiB).
pub const DEFAULT_CHUNK_SIZE: u64 = 2 * 1024 * 1024;

/// Default number of concurrent workers per wave.
pub const DEFAULT_WORKERS: usize = 4;

/// Minimum allowed worker count.
pub const MIN_WORKERS: usize = 1;

/// Maximum allowed worker count.
pub const MAX_WORKERS: usize = 64;

/// Default signing region for the store.
pub const DEFAULT_REGION: &str = "ru-1";
