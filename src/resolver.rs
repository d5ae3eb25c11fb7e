//! Destination path resolution.
//!
//! Maps an object key to `root/<entity>/<file name>` and creates the
//! directories on first use. Resolution is a pure function of the key, so
//! two distinct keys never share a destination unless they share a file name
//! and entity.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::{debug, instrument};

use crate::naming::EntityGrouping;

/// Errors produced while resolving a destination path.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The key has no usable file name or would escape the root.
    #[error("cannot derive a local path from key {key}: {reason}")]
    InvalidKey {
        /// The rejected key.
        key: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Another key of the same run already maps to this destination.
    #[error("destination {path} for {key} is already used by {claimed_by}")]
    DestinationTaken {
        /// The key that lost the destination.
        key: String,
        /// The shared destination path.
        path: PathBuf,
        /// The key that claimed it first.
        claimed_by: String,
    },

    /// Creating the destination directory failed.
    #[error("cannot create directory {path}: {source}")]
    CreateDir {
        /// Directory being created.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Maps object keys to local destination paths.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
    grouping: EntityGrouping,
}

impl PathResolver {
    /// Creates a resolver rooted at `root` using the default grouping.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_grouping(root, EntityGrouping::default())
    }

    /// Creates a resolver with an explicit grouping function.
    pub fn with_grouping(root: impl Into<PathBuf>, grouping: EntityGrouping) -> Self {
        Self {
            root: root.into(),
            grouping,
        }
    }

    /// Destination root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Computes the destination for `key` without touching the filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidKey`] when the key has no file name or
    /// the derived entity folder is not a plain directory name.
    pub fn destination(&self, key: &str) -> Result<PathBuf, ResolveError> {
        let file_name = key.rsplit('/').next().unwrap_or(key);
        if !is_plain_component(file_name) {
            return Err(ResolveError::InvalidKey {
                key: key.to_string(),
                reason: "key has no file name",
            });
        }

        let entity = self.grouping.entity_key(file_name);
        if entity.is_empty() {
            return Ok(self.root.join(file_name));
        }
        if !is_plain_component(&entity) {
            return Err(ResolveError::InvalidKey {
                key: key.to_string(),
                reason: "entity prefix is not a plain directory name",
            });
        }

        Ok(self.root.join(entity).join(file_name))
    }

    /// Resolves the destination for `key`, creating its parent directories.
    ///
    /// Directory creation is idempotent and safe to run concurrently for the
    /// same entity from several workers.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] if the key is unusable or the directory
    /// cannot be created.
    #[instrument(level = "debug", skip(self), fields(root = %self.root.display()))]
    pub async fn resolve(&self, key: &str) -> Result<PathBuf, ResolveError> {
        let path = self.destination(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ResolveError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        debug!(path = %path.display(), "resolved destination");
        Ok(path)
    }
}

/// True when `name` is a single normal path component.
fn is_plain_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}
