//! S3-compatible store backed by the AWS SDK.
//!
//! Listing goes through `ListObjectsV2`; ranged reads presign a `GetObject`
//! URL with the SDK and stream it with [`HttpClient`] using a `Range`
//! header. Path-style addressing is always used so that self-hosted stores
//! (MinIO and friends) work without DNS bucket routing.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::Region;
use aws_credential_types::Credentials;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use tracing::{debug, instrument};

use super::location::StoreLocation;
use super::{ByteRange, ChunkStream, FetchError, ListingError, ObjectStore, RemoteObject};
use crate::download::HttpClient;
use crate::download::constants::{CONNECT_TIMEOUT_SECS, PRESIGN_TTL_SECS, READ_TIMEOUT_SECS};

/// Page size requested from `ListObjectsV2`.
const LIST_PAGE_SIZE: i32 = 1000;

/// Connection settings for [`S3Store`].
#[derive(Clone)]
pub struct S3Config {
    endpoint: String,
    access_key_id: String,
    secret_access_key: String,
    region: String,
    connect_timeout_secs: u64,
    read_timeout_secs: u64,
    presign_ttl: Duration,
}

// Credentials stay out of debug output.
impl std::fmt::Debug for S3Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Config")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("read_timeout_secs", &self.read_timeout_secs)
            .field("presign_ttl", &self.presign_ttl)
            .finish_non_exhaustive()
    }
}

impl S3Config {
    /// Creates settings for the endpoint of `location` with default timeouts.
    pub fn new(
        location: &StoreLocation,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: location.endpoint().to_string(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: region.into(),
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
            presign_ttl: Duration::from_secs(PRESIGN_TTL_SECS),
        }
    }

    /// Overrides the HTTP connect and read timeouts used for ranged reads.
    #[must_use]
    pub fn with_timeouts(mut self, connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        self.connect_timeout_secs = connect_timeout_secs;
        self.read_timeout_secs = read_timeout_secs;
        self
    }

    /// Overrides the lifetime of presigned object URLs.
    #[must_use]
    pub fn with_presign_ttl(mut self, ttl: Duration) -> Self {
        self.presign_ttl = ttl;
        self
    }

    /// Endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Signing region.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }
}

/// [`ObjectStore`] for S3-compatible endpoints.
///
/// Both inner clients pool connections and are cheap to clone; the store is
/// shared between workers behind an `Arc`.
#[derive(Debug, Clone)]
pub struct S3Store {
    sdk: Client,
    http: HttpClient,
    presign_ttl: Duration,
}

impl S3Store {
    /// Builds the SDK and HTTP clients for `config`.
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error if the HTTP client cannot be built.
    pub fn new(config: &S3Config) -> Result<Self, reqwest::Error> {
        let credentials = Credentials::new(
            config.access_key_id.as_str(),
            config.secret_access_key.as_str(),
            None,
            None,
            "objdl",
        );

        let sdk_config = S3ConfigBuilder::new()
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .endpoint_url(config.endpoint.as_str())
            .force_path_style(true)
            .build();

        let http =
            HttpClient::new_with_timeouts(config.connect_timeout_secs, config.read_timeout_secs)?;

        debug!(
            endpoint = %config.endpoint,
            region = %config.region,
            "created S3 store client"
        );

        Ok(Self {
            sdk: Client::from_conf(sdk_config),
            http,
            presign_ttl: config.presign_ttl,
        })
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        range: ByteRange,
    ) -> Result<String, FetchError> {
        let presigning = PresigningConfig::expires_in(self.presign_ttl)
            .map_err(|e| FetchError::presign(key, range, e.to_string()))?;
        let request = self
            .sdk
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| FetchError::presign(key, range, DisplayErrorContext(&e).to_string()))?;
        Ok(request.uri().to_string())
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    #[instrument(skip(self))]
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        recursive: bool,
    ) -> Result<Vec<RemoteObject>, ListingError> {
        let mut objects = Vec::new();
        let mut seen = HashSet::new();
        let mut continuation_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let mut request = self
                .sdk
                .list_objects_v2()
                .bucket(bucket)
                .max_keys(LIST_PAGE_SIZE);
            if !prefix.is_empty() {
                request = request.prefix(prefix);
            }
            if !recursive {
                request = request.delimiter("/");
            }
            if let Some(token) = &continuation_token {
                request = request.continuation_token(token);
            }

            let response = request.send().await.map_err(|e| {
                ListingError::unreachable(bucket, prefix, DisplayErrorContext(&e).to_string())
            })?;
            pages += 1;

            for entry in response.contents() {
                let Some(key) = entry.key() else {
                    return Err(ListingError::malformed(bucket, "entry without a key"));
                };
                if key.ends_with('/') {
                    continue;
                }
                let size = entry.size().ok_or_else(|| {
                    ListingError::malformed(bucket, format!("{key}: missing size"))
                })?;
                let size = u64::try_from(size).map_err(|_| {
                    ListingError::malformed(bucket, format!("{key}: negative size {size}"))
                })?;
                if !seen.insert(key.to_string()) {
                    return Err(ListingError::malformed(
                        bucket,
                        format!("{key}: listed more than once"),
                    ));
                }
                objects.push(RemoteObject::new(key, size));
            }

            if !response.is_truncated().unwrap_or(false) {
                break;
            }
            match response.next_continuation_token() {
                Some(token) => continuation_token = Some(token.to_string()),
                None => {
                    return Err(ListingError::malformed(
                        bucket,
                        "truncated listing without a continuation token",
                    ));
                }
            }
        }

        debug!(objects = objects.len(), pages, "listing complete");
        Ok(objects)
    }

    #[instrument(skip(self, range), fields(range = %range.header_value()))]
    async fn get_range(
        &self,
        bucket: &str,
        key: &str,
        range: ByteRange,
    ) -> Result<ChunkStream, FetchError> {
        let url = self.presign_get(bucket, key, range).await?;
        self.http.get_range(&url, key, range).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn location() -> StoreLocation {
        StoreLocation::parse("http://127.0.0.1:9000/dataset/raster/").unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config = S3Config::new(&location(), "ak", "sk", "ru-1");
        assert_eq!(config.endpoint(), "http://127.0.0.1:9000");
        assert_eq!(config.region(), "ru-1");
        assert_eq!(config.connect_timeout_secs, CONNECT_TIMEOUT_SECS);
        assert_eq!(config.presign_ttl, Duration::from_secs(PRESIGN_TTL_SECS));
    }

    #[test]
    fn test_config_debug_hides_credentials() {
        let config = S3Config::new(&location(), "AKIDSECRETVALUE", "very-secret", "ru-1");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("AKIDSECRETVALUE"), "access key leaked: {rendered}");
        assert!(!rendered.contains("very-secret"), "secret leaked: {rendered}");
    }

    #[tokio::test]
    async fn test_presign_targets_path_style_url() {
        let config = S3Config::new(&location(), "ak", "sk", "ru-1");
        let store = S3Store::new(&config).unwrap();
        let range = ByteRange::new(0, 10).unwrap();

        let url = store
            .presign_get("dataset", "raster/A_48N.tif", range)
            .await
            .unwrap();

        assert!(
            url.starts_with("http://127.0.0.1:9000/dataset/raster/A_48N.tif?"),
            "unexpected presigned URL: {url}"
        );
        assert!(url.contains("X-Amz-Signature="), "missing signature: {url}");
    }
}
