//! Manifest of object stems to download.
//!
//! A manifest is a newline-delimited plain-text file listing object-name
//! stems. Blank lines are ignored and surrounding whitespace is trimmed. It
//! is read once at startup and never modified afterwards.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, instrument};

use crate::naming::{DEFAULT_DELIMITER, manifest_stem};

/// Errors produced while loading a manifest.
#[derive(Debug, Error)]
#[error("cannot read manifest {path}: {source}")]
pub struct ManifestError {
    /// Manifest file path.
    pub path: PathBuf,
    /// The underlying IO error.
    #[source]
    pub source: std::io::Error,
}

/// Allow-list of object stems.
#[derive(Debug, Clone)]
pub struct Manifest {
    stems: HashSet<String>,
    delimiter: char,
}

impl Manifest {
    /// Builds a manifest from an iterator of stems.
    pub fn from_stems<I, S>(stems: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            stems: stems
                .into_iter()
                .map(Into::into)
                .filter(|stem: &String| !stem.is_empty())
                .collect(),
            delimiter: DEFAULT_DELIMITER,
        }
    }

    /// Parses manifest text (one stem per line).
    #[must_use]
    pub fn parse(text: &str) -> Self {
        Self::from_stems(text.lines().map(str::trim).filter(|line| !line.is_empty()))
    }

    /// Reads and parses a manifest file.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] if the file cannot be read.
    #[instrument(level = "debug", skip_all, fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ManifestError {
                path: path.to_path_buf(),
                source,
            })?;
        let manifest = Self::parse(&text);
        debug!(stems = manifest.len(), "manifest loaded");
        Ok(manifest)
    }

    /// Uses `delimiter` instead of `_` to strip the trailing marker.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Number of distinct stems.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stems.len()
    }

    /// True when the manifest lists no stems.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stems.is_empty()
    }

    /// True when `stem` is listed verbatim.
    #[must_use]
    pub fn contains(&self, stem: &str) -> bool {
        self.stems.contains(stem)
    }

    /// True when the object key's derived stem is listed.
    ///
    /// The derived stem is the key's file name without extension and without
    /// its trailing marker, e.g. `raster/A_48N.tif` → `A`.
    #[must_use]
    pub fn matches_key(&self, key: &str) -> bool {
        let file_name = key.rsplit('/').next().unwrap_or(key);
        self.contains(manifest_stem(file_name, self.delimiter))
    }
}
