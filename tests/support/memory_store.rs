//! In-memory [`ObjectStore`] with per-key fault injection.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream;
use objdl_core::store::{ByteRange, ChunkStream, FetchError, ListingError, ObjectStore, RemoteObject};

/// Size of the pieces a range body is split into.
const PIECE: usize = 64 * 1024;

/// Misbehaviour injected for one key.
#[derive(Debug, Clone, Copy)]
pub enum Fault {
    /// Bytes at or beyond this offset are never served; ranges past it are empty.
    TruncateAt(u64),
    /// Every range carries at most this many bytes.
    ShortRanges(u64),
    /// Every range answers with this HTTP status.
    Status(u16),
    /// Every range carries this many bytes more than requested.
    Overrun(u64),
    /// The first `times` requests answer with `status`, later ones succeed.
    FailTimes { status: u16, times: u32 },
    /// The request panics.
    Panic,
}

/// Deterministic object body of `size` bytes.
pub fn pattern(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

#[derive(Default)]
pub struct MemoryStore {
    objects: BTreeMap<String, Bytes>,
    faults: HashMap<String, Fault>,
    listing_error: Option<String>,
    latency: Duration,
    fetches: Mutex<Vec<(String, ByteRange)>>,
    failures: Mutex<HashMap<String, u32>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an object with a patterned body.
    pub fn with_object(mut self, key: &str, size: usize) -> Self {
        self.objects.insert(key.to_string(), Bytes::from(pattern(size)));
        self
    }

    pub fn with_fault(mut self, key: &str, fault: Fault) -> Self {
        self.faults.insert(key.to_string(), fault);
        self
    }

    /// Makes every listing fail.
    pub fn with_listing_error(mut self, message: &str) -> Self {
        self.listing_error = Some(message.to_string());
        self
    }

    /// Delays every range request so overlapping requests can be observed.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn body(&self, key: &str) -> &[u8] {
        &self.objects[key]
    }

    /// Every range requested, in request order.
    pub fn fetches(&self) -> Vec<(String, ByteRange)> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn fetches_for(&self, key: &str) -> Vec<(u64, u64)> {
        self.fetches()
            .into_iter()
            .filter(|(fetched, _)| fetched == key)
            .map(|(_, range)| (range.offset(), range.length()))
            .collect()
    }

    /// Highest number of range requests that were open at the same time.
    pub fn max_concurrent_requests(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn serve(&self, key: &str, range: ByteRange) -> Result<Bytes, FetchError> {
        let Some(body) = self.objects.get(key) else {
            return Err(FetchError::http_status(key, range, 404));
        };
        let len = body.len() as u64;
        let start = range.offset().min(len);
        let mut end = (range.offset() + range.length()).min(len);

        match self.faults.get(key) {
            Some(Fault::TruncateAt(limit)) => end = end.min(*limit).max(start),
            Some(Fault::ShortRanges(max)) => end = end.min(start + max),
            Some(Fault::Status(status)) => {
                return Err(FetchError::http_status(key, range, *status));
            }
            Some(Fault::Overrun(extra)) => {
                let mut padded = body.slice(start as usize..end as usize).to_vec();
                padded.extend(std::iter::repeat_n(0u8, *extra as usize));
                return Ok(Bytes::from(padded));
            }
            Some(Fault::FailTimes { status, times }) => {
                let mut failures = self.failures.lock().unwrap();
                let failed = failures.entry(key.to_string()).or_insert(0);
                if *failed < *times {
                    *failed += 1;
                    return Err(FetchError::http_status(key, range, *status));
                }
            }
            Some(Fault::Panic) => panic!("injected panic for {key}"),
            None => {}
        }

        Ok(body.slice(start as usize..end as usize))
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        recursive: bool,
    ) -> Result<Vec<RemoteObject>, ListingError> {
        if let Some(message) = &self.listing_error {
            return Err(ListingError::unreachable(bucket, prefix, message.as_str()));
        }
        Ok(self
            .objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .filter(|(key, _)| recursive || !key[prefix.len()..].contains('/'))
            .map(|(key, body)| RemoteObject::new(key.as_str(), body.len() as u64))
            .collect())
    }

    async fn get_range(
        &self,
        _bucket: &str,
        key: &str,
        range: ByteRange,
    ) -> Result<ChunkStream, FetchError> {
        self.fetches
            .lock()
            .unwrap()
            .push((key.to_string(), range));

        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let served = self.serve(key, range);
        self.active.fetch_sub(1, Ordering::SeqCst);

        let body = served?;
        let pieces: Vec<Result<Bytes, FetchError>> = (0..body.len())
            .step_by(PIECE)
            .map(|start| Ok(body.slice(start..(start + PIECE).min(body.len()))))
            .collect();
        Ok(stream::iter(pieces).boxed())
    }
}
