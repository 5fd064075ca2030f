//! Supported variant-document schema revisions.
//!
//! Each revision has its own typed model. [`SchemaRevision`] is the closed set
//! of revisions this build understands; everything else resolves to
//! [`SchemaError::Unsupported`].

pub mod v0_0_2;
pub mod v0_0_3;

use crate::error::{Result, SchemaError};
use indexmap::IndexMap;
use std::fmt;

/// Root of the variant schema site. Used bare, it is a legacy alias for
/// v0.0.2.
pub const SCHEMA_ROOT: &str = "https://variants-schema.wheelnext.dev/";

/// Feature name -> ordered values.
pub type FeatureMap = IndexMap<String, Vec<String>>;

/// Namespace -> feature -> ordered values.
pub type PropertyMap = IndexMap<String, FeatureMap>;

/// Variant label -> namespace -> feature -> ordered values.
pub type Variants = IndexMap<String, PropertyMap>;

/// A variant-document schema revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaRevision {
    /// Legacy revision, migrated on load
    V0_0_2,
    /// Current canonical revision
    V0_0_3,
}

impl SchemaRevision {
    /// The revision every document is normalized to.
    pub const CURRENT: Self = Self::V0_0_3;

    /// Canonical `$schema` URL of this revision.
    pub fn url(self) -> &'static str {
        match self {
            Self::V0_0_2 => "https://variants-schema.wheelnext.dev/v0.0.2.json",
            Self::V0_0_3 => "https://variants-schema.wheelnext.dev/v0.0.3.json",
        }
    }

    /// Resolves a `$schema` URL to a revision.
    ///
    /// The bare schema root (with or without trailing slash) is the earliest
    /// revision. Unknown revisions and foreign hosts are
    /// [`SchemaError::Unsupported`].
    ///
    /// # Examples
    ///
    /// ```
    /// use vindex_schema::SchemaRevision;
    ///
    /// assert_eq!(
    ///     SchemaRevision::resolve("https://variants-schema.wheelnext.dev/").unwrap(),
    ///     SchemaRevision::V0_0_2
    /// );
    /// assert_eq!(
    ///     SchemaRevision::resolve("https://variants-schema.wheelnext.dev/v0.0.3.json").unwrap(),
    ///     SchemaRevision::V0_0_3
    /// );
    /// assert!(
    ///     SchemaRevision::resolve("https://variants-schema.wheelnext.dev/v0.1.0.json")
    ///         .unwrap_err()
    ///         .is_unsupported()
    /// );
    /// ```
    pub fn resolve(url: &str) -> Result<Self> {
        let unsupported = || SchemaError::Unsupported {
            url: url.to_string(),
        };

        let trimmed = url.trim();
        if trimmed == SCHEMA_ROOT.trim_end_matches('/') {
            return Ok(Self::V0_0_2);
        }

        match trimmed.strip_prefix(SCHEMA_ROOT).ok_or_else(unsupported)? {
            "" => Ok(Self::V0_0_2),
            "v0.0.2.json" => Ok(Self::V0_0_2),
            "v0.0.3.json" => Ok(Self::V0_0_3),
            _ => Err(unsupported()),
        }
    }
}

impl fmt::Display for SchemaRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V0_0_2 => write!(f, "v0.0.2"),
            Self::V0_0_3 => write!(f, "v0.0.3"),
        }
    }
}

/// Rejects an empty `default-priorities.namespace` list.
pub(crate) fn ensure_namespaces(revision: SchemaRevision, namespaces: &[String]) -> Result<()> {
    if namespaces.is_empty() {
        return Err(SchemaError::local(
            revision,
            "`default-priorities.namespace` must list at least one namespace",
        ));
    }
    Ok(())
}
