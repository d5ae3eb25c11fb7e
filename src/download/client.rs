//! HTTP client wrapper for ranged object reads.
//!
//! This module provides the `HttpClient` struct which issues `Range` GETs
//! against (presigned) object URLs with proper timeout configuration and
//! error mapping.

use std::time::Duration;

use futures_util::{StreamExt, TryStreamExt};
use reqwest::header::RANGE;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use crate::store::{ByteRange, ChunkStream, FetchError};

/// HTTP client for ranged reads with streaming support.
///
/// This client is designed to be created once and shared by every worker,
/// taking advantage of connection pooling.
///
/// # Example
///
/// ```no_run
/// use objdl_core::download::HttpClient;
/// use objdl_core::store::ByteRange;
/// use futures_util::StreamExt;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new()?;
/// let range = ByteRange::new(0, 1024).ok_or("empty range")?;
/// let mut stream = client
///     .get_range("https://example.com/dataset/A_48N.tif", "A_48N.tif", range)
///     .await?;
/// while let Some(chunk) = stream.next().await {
///     println!("received {} bytes", chunk?.len());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Read timeout: 5 minutes (for large chunks over slow links)
    ///
    /// # Errors
    ///
    /// Returns the builder error if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// # Errors
    ///
    /// Returns the builder error if the TLS backend cannot be initialised.
    pub fn new_with_timeouts(
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .read_timeout(Duration::from_secs(read_timeout_secs))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Requests `range` of the object at `url` and returns its body stream.
    ///
    /// `key` is only used to give errors their context. The server must
    /// answer `206 Partial Content`; any other status is a
    /// [`FetchError::HttpStatus`] since a full-body `200` would not match the
    /// requested window.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Timeout`] or [`FetchError::Network`] when the
    /// request cannot be sent, and [`FetchError::HttpStatus`] for non-206
    /// responses. Errors while reading the body surface as stream items.
    #[instrument(skip_all, fields(key = %key, range = %range.header_value()))]
    pub async fn get_range(
        &self,
        url: &str,
        key: &str,
        range: ByteRange,
    ) -> Result<ChunkStream, FetchError> {
        debug!("sending ranged request");

        let response = self
            .client
            .get(url)
            .header(RANGE, range.header_value())
            .send()
            .await
            .map_err(|e| map_reqwest_error(key, range, e))?;

        let status = response.status();
        if status != StatusCode::PARTIAL_CONTENT {
            return Err(FetchError::http_status(key, range, status.as_u16()));
        }

        let key = key.to_string();
        let stream = response
            .bytes_stream()
            .map_err(move |e| map_reqwest_error(&key, range, e));
        Ok(stream.boxed())
    }

    /// Returns a reference to the underlying reqwest client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

fn map_reqwest_error(key: &str, range: ByteRange, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::timeout(key, range)
    } else {
        FetchError::network(key, range, error)
    }
}
