//! Store URL parsing.
//!
//! A store URL embeds the endpoint, the bucket and the object prefix:
//! `https://storage.example.com:9000/<bucket>/<prefix...>`.

use thiserror::Error;
use url::Url;

/// Errors produced while parsing a store URL.
#[derive(Debug, Error)]
pub enum LocationError {
    /// The string is not a valid absolute URL.
    #[error("invalid store URL {url}: {reason}")]
    Invalid {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl LocationError {
    fn invalid(url: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}

/// Endpoint, bucket and prefix addressed by a store URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLocation {
    endpoint: String,
    bucket: String,
    prefix: String,
}

impl StoreLocation {
    /// Parses a store URL.
    ///
    /// The first path segment is the bucket; the remainder (possibly empty)
    /// is the object prefix, kept verbatim including any trailing slash.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::Invalid`] for non-HTTP(S) URLs, URLs without
    /// a host, or URLs without a bucket segment.
    pub fn parse(raw: &str) -> Result<Self, LocationError> {
        let url = Url::parse(raw).map_err(|e| LocationError::invalid(raw, e.to_string()))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(LocationError::invalid(
                raw,
                format!("unsupported scheme '{}', expected http or https", url.scheme()),
            ));
        }
        let Some(host) = url.host_str() else {
            return Err(LocationError::invalid(raw, "missing host"));
        };

        let endpoint = match url.port() {
            Some(port) => format!("{}://{host}:{port}", url.scheme()),
            None => format!("{}://{host}", url.scheme()),
        };

        let path = url.path().trim_start_matches('/');
        let (bucket, prefix) = match path.split_once('/') {
            Some((bucket, prefix)) => (bucket, prefix),
            None => (path, ""),
        };
        if bucket.is_empty() {
            return Err(LocationError::invalid(raw, "missing bucket in URL path"));
        }

        let prefix = urlencoding::decode(prefix)
            .map_err(|e| LocationError::invalid(raw, format!("undecodable prefix: {e}")))?
            .into_owned();

        Ok(Self {
            endpoint,
            bucket: bucket.to_string(),
            prefix,
        })
    }

    /// Endpoint URL without path, e.g. `https://storage.example.com:9000`.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Bucket name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Object prefix within the bucket (may be empty).
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}
