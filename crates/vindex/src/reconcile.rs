//! Joins wheel artifacts with their variant documents.
//!
//! The output of this module is the render-ready [`PackageIndex`]: every wheel
//! that can be served, with the flattened variant properties it stands for,
//! ordered newest first.

use crate::error::{IndexError, Result};
use crate::store::VariantStore;
use futures::stream::{self, StreamExt};
use indexmap::IndexMap;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use vindex_core::{Checksum, ClassifiedArtifact, WheelArtifact, compare_versions};

/// Variant documents of one package loaded at the same time.
const DOCUMENT_CONCURRENCY: usize = 8;

/// A wheel with the variant properties of its label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WheelRecord {
    pub name: String,
    pub link: String,
    pub checksum: Option<Checksum>,
    pub version: String,
    pub variant_label: Option<String>,
    /// `"<namespace> :: <feature> :: <value>"` entries; empty for plain wheels.
    pub vprops: Vec<String>,
}

impl WheelRecord {
    fn new(wheel: WheelArtifact, vprops: Vec<String>) -> Self {
        Self {
            version: wheel.filename.version,
            variant_label: wheel.filename.variant_label,
            name: wheel.artifact.name,
            link: wheel.artifact.link,
            checksum: wheel.artifact.checksum,
            vprops,
        }
    }
}

/// A loaded variant document as listed on the package page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantDocumentSummary {
    pub name: String,
    pub link: String,
    pub version: String,
    pub checksum: Option<Checksum>,
    /// Digest of the normalized copy in the cache.
    pub cached_sha256: String,
}

/// Everything needed to render one package page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageIndex {
    pub project_name: String,
    /// Newest version first.
    pub variant_documents: Vec<VariantDocumentSummary>,
    /// Newest version first, ties broken by file name.
    pub wheels: Vec<WheelRecord>,
}

/// Label -> flattened properties, per document version.
type VariantMap = HashMap<String, IndexMap<String, Vec<String>>>;

/// File name without the `.whl` extension, used as the ordering tie-break.
fn wheel_stem(name: &str) -> &str {
    name.strip_suffix(".whl").unwrap_or(name)
}

fn compare_wheels(a: &WheelRecord, b: &WheelRecord) -> Ordering {
    compare_versions(&a.version, &b.version)
        .then_with(|| wheel_stem(&a.name).cmp(wheel_stem(&b.name)))
}

/// Builds the index of `package` from its artifacts.
///
/// Returns `Ok(None)` when no wheel survives reconciliation.
///
/// # Errors
///
/// - [`IndexError::DuplicateVariantDocument`] when two loaded documents share
///   a version; a document skipped for its schema does not claim its version
/// - any non-recoverable error from [`VariantStore::get`]; documents with an
///   unsupported schema are skipped instead
pub async fn reconcile(
    package: &str,
    artifacts: Vec<ClassifiedArtifact>,
    store: &VariantStore,
) -> Result<Option<PackageIndex>> {
    let mut documents = Vec::new();
    let mut wheels = Vec::new();
    for artifact in artifacts {
        match artifact {
            ClassifiedArtifact::VariantDocument(document) => documents.push(document),
            ClassifiedArtifact::Wheel(wheel) => wheels.push(wheel),
        }
    }

    // File-name order decides which of two same-version documents is reported.
    documents.sort_by(|a, b| a.artifact.name.cmp(&b.artifact.name));

    let loaded: Vec<_> = stream::iter(&documents)
        .map(|document| async move {
            let stored = store.get(&document.artifact.link, package).await;
            (document, stored)
        })
        .buffered(DOCUMENT_CONCURRENCY)
        .collect()
        .await;

    let mut variant_map = VariantMap::new();
    let mut loaded_by: HashMap<&str, &str> = HashMap::new();
    let mut summaries = Vec::with_capacity(loaded.len());
    for (document, stored) in loaded {
        let stored = match stored {
            Ok(stored) => stored,
            Err(e) if e.is_recoverable() => {
                tracing::warn!("skipping variant document `{}`: {}", document.artifact.name, e);
                continue;
            }
            Err(e) => return Err(e),
        };

        if let Some(first) = loaded_by.insert(&document.version, &document.artifact.name) {
            return Err(IndexError::DuplicateVariantDocument {
                package: package.to_string(),
                version: document.version.clone(),
                first: first.to_string(),
                second: document.artifact.name.clone(),
            });
        }

        variant_map.insert(
            document.version.clone(),
            stored.document.flattened_properties(),
        );
        summaries.push(VariantDocumentSummary {
            name: document.artifact.name.clone(),
            link: document.artifact.link.clone(),
            version: document.version.clone(),
            checksum: document.artifact.checksum.clone(),
            cached_sha256: stored.sha256,
        });
    }

    let mut records: Vec<WheelRecord> = wheels
        .into_iter()
        .filter_map(|wheel| resolve_wheel(package, wheel, &variant_map))
        .collect();

    if records.is_empty() {
        tracing::warn!("no wheels to index for `{}`", package);
        return Ok(None);
    }

    records.sort_by(|a, b| compare_wheels(b, a));
    summaries.sort_by(|a, b| {
        compare_versions(&b.version, &a.version).then_with(|| b.name.cmp(&a.name))
    });

    Ok(Some(PackageIndex {
        project_name: package.to_string(),
        variant_documents: summaries,
        wheels: records,
    }))
}

fn resolve_wheel(package: &str, wheel: WheelArtifact, variant_map: &VariantMap) -> Option<WheelRecord> {
    let Some(label) = wheel.variant_label() else {
        return Some(WheelRecord::new(wheel, Vec::new()));
    };

    let Some(labels) = variant_map.get(wheel.version()) else {
        tracing::debug!(
            "dropping `{}`: no variant document for version {} of `{}`",
            wheel.artifact.name,
            wheel.version(),
            package
        );
        return None;
    };

    match labels.get(label) {
        Some(vprops) => Some(WheelRecord::new(wheel, vprops.clone())),
        None => {
            tracing::warn!(
                "dropping `{}`: variant `{}` is not described for version {} of `{}`",
                wheel.artifact.name,
                label,
                wheel.version(),
                package
            );
            None
        }
    }
}
