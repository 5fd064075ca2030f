//! The fetch primitive: "GET a URL, return bytes or fail".
//!
//! Every network access of the pipeline goes through the [`Fetch`] trait so
//! that registries, variant documents, and remote JSON Schemas can be served
//! from a stub in tests. [`HttpFetcher`] is the `reqwest` implementation.
//!
//! No retries happen here: any non-2xx response or connection failure is
//! returned to the caller as a transport error.

use crate::error::{CoreError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Rejects anything that is not an absolute `http(s)` URL before a request
/// is made.
#[inline]
fn ensure_http(url: &str) -> Result<()> {
    let parsed = Url::parse(url).map_err(|e| CoreError::invalid_url(url, e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(CoreError::invalid_url(
            url,
            format!("scheme `{}` is not supported", other),
        )),
    }
}

/// Joins `path` onto `base`, treating `base` as a directory.
///
/// A missing trailing slash on `base` is added first, so
/// `https://host/simple` and `https://host/simple/` resolve identically.
///
/// # Examples
///
/// ```
/// use vindex_core::fetch::join_url;
///
/// assert_eq!(
///     join_url("https://host/simple", "numpy/").unwrap(),
///     "https://host/simple/numpy/"
/// );
/// assert_eq!(
///     join_url("https://host/simple/numpy/", "../../files/numpy-2.0-py3-none-any.whl").unwrap(),
///     "https://host/files/numpy-2.0-py3-none-any.whl"
/// );
/// ```
pub fn join_url(base: &str, path: &str) -> Result<String> {
    let mut base = base.to_string();
    if !base.ends_with('/') {
        base.push('/');
    }

    let base_url = Url::parse(&base).map_err(|e| CoreError::invalid_url(&base, e.to_string()))?;
    let joined = base_url
        .join(path)
        .map_err(|e| CoreError::invalid_url(path, e.to_string()))?;

    Ok(joined.into())
}

/// Source of remote bytes.
///
/// Implementations must treat any non-2xx response as an error and must not
/// retry internally.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetches `url` and returns the response body.
    async fn get(&self, url: &str) -> Result<Bytes>;
}

/// HTTP implementation of [`Fetch`] backed by `reqwest`.
///
/// # Examples
///
/// ```no_run
/// use vindex_core::fetch::{Fetch, HttpFetcher, DEFAULT_TIMEOUT};
///
/// # async fn example() -> vindex_core::error::Result<()> {
/// let fetcher = HttpFetcher::new(DEFAULT_TIMEOUT)?;
/// let page = fetcher.get("https://pypi.org/simple/numpy/").await?;
/// println!("Fetched {} bytes", page.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher whose requests time out after `timeout`.
    ///
    /// The client identifies itself with a `vindex/<version>` user agent.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("vindex/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(CoreError::Client)?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn get(&self, url: &str) -> Result<Bytes> {
        ensure_http(url)?;
        tracing::debug!("fetching: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CoreError::Transport {
                url: url.to_string(),
                source: e,
            })?;

        if !response.status().is_success() {
            return Err(CoreError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        response.bytes().await.map_err(|e| CoreError::Transport {
            url: url.to_string(),
            source: e,
        })
    }
}
