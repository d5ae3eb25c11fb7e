//! Chunked object writer: drives ranged reads for one object into a file.
//!
//! The writer owns the destination file for the lifetime of one task. Ranges
//! are requested strictly in offset order and each stream is consumed fully
//! before the next request. A transfer either ends `Verified` with the file
//! in place, or `Corrupt` with the file removed.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};

use super::error::ObjectError;
use super::state::{TransferPhase, TransferState};
use crate::store::{ByteRange, FetchError, ObjectStore, RemoteObject};

/// One object assigned to one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    /// Object to fetch.
    pub object: RemoteObject,
    /// Local file the object is written to.
    pub destination: PathBuf,
}

impl DownloadTask {
    /// Creates a task.
    pub fn new(object: RemoteObject, destination: impl Into<PathBuf>) -> Self {
        Self {
            object,
            destination: destination.into(),
        }
    }
}

/// Downloads one object in bounded ranges and verifies its size.
///
/// # Example
///
/// ```no_run
/// use objdl_core::download::{ChunkedObjectWriter, DownloadTask};
/// use objdl_core::store::{ObjectStore, RemoteObject};
///
/// # async fn example(store: &dyn ObjectStore) -> Result<(), Box<dyn std::error::Error>> {
/// let writer = ChunkedObjectWriter::new(store, "dataset", 2 * 1024 * 1024);
/// let task = DownloadTask::new(RemoteObject::new("raster/A_48N.tif", 5_000_000), "out/A/A_48N.tif");
/// let state = writer.download(&task, &|_bytes| {}).await?;
/// assert_eq!(state.bytes_written(), 5_000_000);
/// # Ok(())
/// # }
/// ```
pub struct ChunkedObjectWriter<'a> {
    store: &'a dyn ObjectStore,
    bucket: &'a str,
    chunk_size: u64,
}

impl<'a> ChunkedObjectWriter<'a> {
    /// Creates a writer that reads from `bucket` in `chunk_size` ranges.
    #[must_use]
    pub fn new(store: &'a dyn ObjectStore, bucket: &'a str, chunk_size: u64) -> Self {
        Self {
            store,
            bucket,
            chunk_size,
        }
    }

    /// Downloads `task.object` into `task.destination`.
    ///
    /// `on_progress` is called with the size of every chunk appended.
    ///
    /// # Returns
    ///
    /// The final transfer state, always in [`TransferPhase::Verified`].
    ///
    /// # Errors
    ///
    /// On any failure the destination file is removed and:
    /// - [`ObjectError::Fetch`] is returned when a range request or its
    ///   stream fails (including overruns),
    /// - [`ObjectError::SizeMismatch`] when a range yields no data before the
    ///   expected size is reached,
    /// - [`ObjectError::Io`] when the file cannot be created or written.
    #[instrument(
        skip_all,
        fields(key = %task.object.key, size = task.object.size, path = %task.destination.display())
    )]
    pub async fn download(
        &self,
        task: &DownloadTask,
        on_progress: &(dyn Fn(u64) + Send + Sync),
    ) -> Result<TransferState, ObjectError> {
        let path = task.destination.as_path();
        let mut state = TransferState::new(task.object.size);

        let file = File::create(path)
            .await
            .map_err(|e| ObjectError::io(path, e))?;
        let mut writer = BufWriter::new(file);

        let mut outcome = self
            .fill(&mut writer, task, &mut state, on_progress)
            .await;
        if outcome.is_ok() {
            outcome = writer.flush().await.map_err(|e| ObjectError::io(path, e));
        }
        drop(writer);

        if let Err(error) = outcome {
            state.mark_corrupt();
            discard(path).await;
            return Err(error);
        }

        match state.finish() {
            TransferPhase::Verified => {
                info!(bytes = state.bytes_written(), "object verified");
                Ok(state)
            }
            _ => {
                discard(path).await;
                Err(ObjectError::size_mismatch(
                    path,
                    state.bytes_written(),
                    state.expected_size(),
                ))
            }
        }
    }

    /// Runs the `Fetching → Writing` loop until the object is complete or a
    /// range yields nothing.
    async fn fill(
        &self,
        writer: &mut BufWriter<File>,
        task: &DownloadTask,
        state: &mut TransferState,
        on_progress: &(dyn Fn(u64) + Send + Sync),
    ) -> Result<(), ObjectError> {
        let key = task.object.key.as_str();
        let path = task.destination.as_path();

        while let Some(range) = state.next_range(self.chunk_size) {
            debug!(range = %range.header_value(), "fetching range");

            let mut stream = self
                .store
                .get_range(self.bucket, key, range)
                .await
                .map_err(|e| ObjectError::fetch(path, state.bytes_written(), e))?;

            let mut received: u64 = 0;
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|e| ObjectError::fetch(path, state.bytes_written(), e))?;
                let len = chunk.len() as u64;
                if received + len > range.length() {
                    return Err(overrun(path, key, range, state, received + len));
                }

                writer
                    .write_all(&chunk)
                    .await
                    .map_err(|e| ObjectError::io(path, e))?;
                state
                    .record_written(len)
                    .map_err(|_| overrun(path, key, range, state, received + len))?;
                received += len;
                on_progress(len);
            }

            if received == 0 {
                warn!(
                    range = %range.header_value(),
                    written = state.bytes_written(),
                    expected = state.expected_size(),
                    "range returned no data, stopping transfer"
                );
                break;
            }
            if received < range.length() {
                debug!(
                    requested = range.length(),
                    received, "short range, continuing from new offset"
                );
            }
        }

        Ok(())
    }
}

fn overrun(
    path: &Path,
    key: &str,
    range: ByteRange,
    state: &TransferState,
    received: u64,
) -> ObjectError {
    ObjectError::fetch(
        path,
        state.bytes_written(),
        FetchError::overrun(key, range, received),
    )
}

/// Removes a partial destination file. A missing file is not an error.
async fn discard(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "removed partial file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove partial file"),
    }
}
