//! Read-through disk cache of normalized variant documents.
//!
//! Documents live at `<cache-root>/<package>/<filename>`, where `filename` is
//! the last path segment of the document URL. A cached file is trusted as-is;
//! a missing one is fetched, normalized to the current schema and written in
//! canonical form, so re-running a build produces byte-identical files.

use crate::error::{IndexError, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use vindex_core::{CoreError, Fetch};
use vindex_schema::{Normalizer, SchemaError, VariantsJson};

/// A normalized document and the digest of its cached bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub document: VariantsJson,
    /// Lowercase hex SHA-256 of the cached file.
    pub sha256: String,
    pub path: PathBuf,
}

/// Variant document cache backed by a directory.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use vindex::store::VariantStore;
/// use vindex_core::{HttpFetcher, DEFAULT_TIMEOUT};
/// use vindex_schema::Normalizer;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = Arc::new(HttpFetcher::new(DEFAULT_TIMEOUT)?);
/// let normalizer = Arc::new(Normalizer::new(fetcher.clone()));
/// let store = VariantStore::new("build", fetcher, normalizer);
///
/// let stored = store
///     .get("https://files.example/numpy-2.0-variants.json", "numpy")
///     .await?;
/// println!("{} variants", stored.document.variants.len());
/// # Ok(())
/// # }
/// ```
pub struct VariantStore {
    cache_root: PathBuf,
    fetcher: Arc<dyn Fetch>,
    normalizer: Arc<Normalizer>,
}

impl VariantStore {
    pub fn new(
        cache_root: impl Into<PathBuf>,
        fetcher: Arc<dyn Fetch>,
        normalizer: Arc<Normalizer>,
    ) -> Self {
        Self {
            cache_root: cache_root.into(),
            fetcher,
            normalizer,
        }
    }

    /// Returns the document at `url`, from the cache when present.
    ///
    /// # Errors
    ///
    /// - [`IndexError::VariantDocument`] when the downloaded document cannot
    ///   be normalized; recoverable for unsupported schema revisions, which
    ///   are never cached
    /// - [`IndexError::MalformedDocument`] when a cached file is not a
    ///   canonical document
    /// - [`IndexError::Transport`] when the document cannot be downloaded
    /// - [`IndexError::Artifact`] when `url` names no file to cache under
    pub async fn get(&self, url: &str, package: &str) -> Result<StoredDocument> {
        let path = self.cache_path(url, package)?;

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                tracing::debug!("variant document cache hit: {}", path.display());
                decode_cached(path, &bytes)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("variant document cache miss: {}", path.display());
                self.fetch_and_store(url, package, path).await
            }
            Err(e) => Err(IndexError::Io(e)),
        }
    }

    fn cache_path(&self, url: &str, package: &str) -> Result<PathBuf> {
        let filename = document_filename(url).ok_or_else(|| IndexError::Artifact {
            package: package.to_string(),
            source: CoreError::invalid_url(url, "no file name in URL path"),
        })?;

        Ok(self.cache_root.join(package).join(filename))
    }

    async fn fetch_and_store(&self, url: &str, package: &str, path: PathBuf) -> Result<StoredDocument> {
        let body = self
            .fetcher
            .get(url)
            .await
            .map_err(|e| IndexError::Transport {
                package: package.to_string(),
                url: url.to_string(),
                source: e,
            })?;

        let rejected = |source: SchemaError| IndexError::VariantDocument {
            package: package.to_string(),
            url: url.to_string(),
            source,
        };

        let raw: Value = serde_json::from_slice(&body)
            .map_err(|e| rejected(SchemaError::Malformed(e.to_string())))?;
        let document = self.normalizer.normalize(raw).await.map_err(rejected)?;
        let bytes = document.to_canonical_json().map_err(rejected)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &bytes).await?;
        tracing::debug!("cached variant document: {}", path.display());

        decode_cached(path, &bytes)
    }
}

/// Last non-empty path segment of `url`, if it is a plain file name.
fn document_filename(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.next_back()?;
    let filename = urlencoding::decode(segment).ok()?.into_owned();

    let is_plain = !filename.is_empty()
        && filename != "."
        && filename != ".."
        && !filename.contains(['/', '\\']);
    is_plain.then_some(filename)
}

fn decode_cached(path: PathBuf, bytes: &[u8]) -> Result<StoredDocument> {
    let malformed = |reason: String| IndexError::MalformedDocument {
        path: path.clone(),
        reason,
    };

    let value: Value = serde_json::from_slice(bytes).map_err(|e| malformed(e.to_string()))?;
    if value.get("variants").is_none() {
        return Err(malformed("missing `variants`".to_string()));
    }
    let document: VariantsJson =
        serde_json::from_value(value).map_err(|e| malformed(e.to_string()))?;

    Ok(StoredDocument {
        document,
        sha256: hex::encode(Sha256::digest(bytes)),
        path,
    })
}
