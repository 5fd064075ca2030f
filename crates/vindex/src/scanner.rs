//! Registry listing scanner.
//!
//! Fetches a package's PEP 503 listing page, extracts its anchors and
//! classifies every `.whl` / `.json` link into an artifact. The package's own
//! registry is authoritative; a public fallback index fills in versions the
//! registry does not publish.

use crate::config::PackageConfig;
use crate::error::{IndexError, Result};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::cmp::Ordering;
use std::sync::Arc;
use vindex_core::{Artifact, Checksum, ClassifiedArtifact, CoreError, Fetch, join_url};

static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("valid anchor selector"));

/// Link suffixes that can carry wheel or variant-document artifacts.
const CANDIDATE_SUFFIXES: [&str; 2] = [".whl", ".json"];

/// An `<a href>` element from a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub href: String,
    pub text: String,
    pub integrity: Option<String>,
}

/// Extracts every `<a href>` element from `html`, in document order.
pub fn extract_anchors(html: &str) -> Vec<Anchor> {
    let document = Html::parse_document(html);

    document
        .select(&ANCHOR_SELECTOR)
        .filter_map(|element| {
            let href = element.value().attr("href")?;
            Some(Anchor {
                href: href.to_string(),
                text: element.text().collect::<String>().trim().to_string(),
                integrity: element.value().attr("integrity").map(str::to_string),
            })
        })
        .collect()
}

/// Returns the listing page URL of `package` on `registry`.
///
/// # Examples
///
/// ```
/// use vindex::scanner::listing_url;
///
/// assert_eq!(
///     listing_url("https://variants-index.example/simple", "numpy").unwrap(),
///     "https://variants-index.example/simple/numpy/"
/// );
/// ```
pub fn listing_url(registry: &str, package: &str) -> vindex_core::Result<String> {
    join_url(registry, &format!("{}/", urlencoding::encode(package)))
}

/// Classifies one anchor of the listing page at `page_url`.
///
/// Returns `Ok(None)` for links that are neither wheels nor JSON documents.
fn classify_anchor(page_url: &str, anchor: &Anchor) -> vindex_core::Result<Option<ClassifiedArtifact>> {
    let (link, fragment) = match anchor.href.split_once('#') {
        Some((link, fragment)) => (link, Some(fragment)),
        None => (anchor.href.as_str(), None),
    };

    if !CANDIDATE_SUFFIXES.iter().any(|suffix| link.ends_with(suffix)) {
        return Ok(None);
    }

    let checksum = fragment
        .and_then(Checksum::from_fragment)
        .or_else(|| anchor.integrity.as_deref().and_then(Checksum::from_integrity));

    let artifact = Artifact {
        name: anchor.text.clone(),
        link: join_url(page_url, link)?,
        checksum,
    };

    ClassifiedArtifact::classify(artifact).map(Some)
}

/// Parses a listing page into classified artifacts.
///
/// Any candidate link whose displayed filename is unknown or unparsable fails
/// the whole page.
pub fn parse_listing(page_url: &str, html: &str) -> vindex_core::Result<Vec<ClassifiedArtifact>> {
    extract_anchors(html)
        .iter()
        .filter_map(|anchor| classify_anchor(page_url, anchor).transpose())
        .collect()
}

/// Two versions are the same if their strings match or they are equal
/// PEP 440 versions (`1.0` == `1.0.0`).
fn same_version(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    match (vindex_core::parse_version(a), vindex_core::parse_version(b)) {
        (Some(a), Some(b)) => a.cmp(&b) == Ordering::Equal,
        _ => false,
    }
}

/// Appends the fallback wheels whose version the authoritative registry
/// does not publish a wheel for.
///
/// Variant documents on the fallback registry are ignored, and authoritative
/// documents never shadow a fallback wheel.
pub fn merge_fallback(
    mut authoritative: Vec<ClassifiedArtifact>,
    fallback: Vec<ClassifiedArtifact>,
) -> Vec<ClassifiedArtifact> {
    let published: Vec<String> = authoritative
        .iter()
        .filter_map(|artifact| match artifact {
            ClassifiedArtifact::Wheel(wheel) => Some(wheel.version().to_string()),
            ClassifiedArtifact::VariantDocument(_) => None,
        })
        .collect();

    let mut dropped = 0usize;
    for artifact in fallback {
        let ClassifiedArtifact::Wheel(wheel) = artifact else {
            dropped += 1;
            continue;
        };
        if published.iter().any(|version| same_version(version, wheel.version())) {
            dropped += 1;
        } else {
            authoritative.push(ClassifiedArtifact::Wheel(wheel));
        }
    }

    if dropped > 0 {
        tracing::debug!(
            "dropped {} fallback artifacts shadowed by the authoritative registry",
            dropped
        );
    }

    authoritative
}

/// Scans registries for the artifacts of a package.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use vindex::config::PackageConfig;
/// use vindex::scanner::RegistryScanner;
/// use vindex_core::{HttpFetcher, DEFAULT_TIMEOUT};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = Arc::new(HttpFetcher::new(DEFAULT_TIMEOUT)?);
/// let scanner = RegistryScanner::new(fetcher, Some("https://pypi.org/simple/".into()));
///
/// let package = PackageConfig {
///     name: "numpy".into(),
///     registry: "https://variants-index.example/simple/".into(),
/// };
/// let artifacts = scanner.scan_package(&package).await?;
/// println!("{} artifacts", artifacts.len());
/// # Ok(())
/// # }
/// ```
pub struct RegistryScanner {
    fetcher: Arc<dyn Fetch>,
    fallback_index: Option<String>,
}

impl RegistryScanner {
    pub fn new(fetcher: Arc<dyn Fetch>, fallback_index: Option<String>) -> Self {
        Self {
            fetcher,
            fallback_index,
        }
    }

    /// Returns all artifacts of `package`.
    ///
    /// # Errors
    ///
    /// - [`IndexError::Transport`] if the authoritative registry cannot be
    ///   fetched (fallback failures are logged and ignored)
    /// - [`IndexError::Artifact`] if any listed filename cannot be classified,
    ///   on either registry
    pub async fn scan_package(&self, package: &PackageConfig) -> Result<Vec<ClassifiedArtifact>> {
        let url = listing_url(&package.registry, &package.name).map_err(|e| IndexError::Transport {
            package: package.name.clone(),
            url: package.registry.clone(),
            source: e,
        })?;

        let html = self
            .fetch_page(&url)
            .await
            .map_err(|e| IndexError::Transport {
                package: package.name.clone(),
                url: url.clone(),
                source: e,
            })?;
        let artifacts = parse_listing(&url, &html).map_err(|e| artifact_error(package, e))?;
        tracing::debug!("{} artifacts listed for `{}` at {}", artifacts.len(), package.name, url);

        let Some(fallback_index) = self.fallback_index.as_deref() else {
            return Ok(artifacts);
        };

        let fallback_url = match listing_url(fallback_index, &package.name) {
            Ok(fallback_url) if fallback_url != url => fallback_url,
            Ok(_) => return Ok(artifacts),
            Err(e) => {
                tracing::warn!("skipping fallback index for `{}`: {}", package.name, e);
                return Ok(artifacts);
            }
        };

        match self.fetch_page(&fallback_url).await {
            Ok(html) => {
                let fallback =
                    parse_listing(&fallback_url, &html).map_err(|e| artifact_error(package, e))?;
                Ok(merge_fallback(artifacts, fallback))
            }
            Err(e) => {
                tracing::warn!(
                    "fallback index unavailable for `{}`: {}",
                    package.name,
                    e
                );
                Ok(artifacts)
            }
        }
    }

    async fn fetch_page(&self, url: &str) -> vindex_core::Result<String> {
        let body = self.fetcher.get(url).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

fn artifact_error(package: &PackageConfig, source: CoreError) -> IndexError {
    IndexError::Artifact {
        package: package.name.clone(),
        source,
    }
}
