//! Object listing with optional manifest filtering.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::manifest::Manifest;
use crate::store::{ListingError, ObjectStore, RemoteObject};

/// Lists objects under a prefix and applies the manifest allow-list.
///
/// Listing is all-or-nothing: any store failure or malformed entry aborts
/// with [`ListingError`] and no partial result is returned.
pub struct ObjectLister {
    store: Arc<dyn ObjectStore>,
    manifest: Option<Manifest>,
}

impl ObjectLister {
    /// Creates a lister without a manifest.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            manifest: None,
        }
    }

    /// Keeps only objects whose derived stem is listed in `manifest`.
    #[must_use]
    pub fn with_manifest(mut self, manifest: Manifest) -> Self {
        self.manifest = Some(manifest);
        self
    }

    /// The active manifest, if any.
    #[must_use]
    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    /// Lists `(key, size)` pairs under `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`ListingError`] if the store is unreachable or returns
    /// malformed entries.
    #[instrument(skip(self), fields(manifest = self.manifest.is_some()))]
    pub async fn list(
        &self,
        bucket: &str,
        prefix: &str,
        recursive: bool,
    ) -> Result<Vec<RemoteObject>, ListingError> {
        let mut objects = self.store.list_objects(bucket, prefix, recursive).await?;
        let listed = objects.len();

        if let Some(manifest) = &self.manifest {
            objects.retain(|object| manifest.matches_key(&object.key));
        }

        info!(
            listed,
            selected = objects.len(),
            bytes = objects.iter().map(|object| object.size).sum::<u64>(),
            "listing complete"
        );
        Ok(objects)
    }
}
