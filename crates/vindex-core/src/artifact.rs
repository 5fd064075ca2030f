//! Artifact records discovered on a registry listing page.

use crate::error::Result;
use crate::filename::{ParsedFilename, WheelFilename, parse_filename};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use std::fmt;

/// SHA-256 digest of an artifact, stored as lowercase hex.
///
/// Registry pages publish digests either as a `#sha256=<hex>` href fragment
/// (PEP 503) or as an `integrity="sha256-<base64>"` attribute; both are
/// normalized to hex.
///
/// # Examples
///
/// ```
/// use vindex_core::artifact::Checksum;
///
/// let from_fragment = Checksum::from_fragment("sha256=ABCDEF0123").unwrap();
/// assert_eq!(from_fragment.as_str(), "abcdef0123");
///
/// let from_integrity = Checksum::from_integrity("sha256-q80=").unwrap();
/// assert_eq!(from_integrity.as_str(), "abcd");
///
/// assert!(Checksum::from_fragment("md5=abcd").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Checksum(String);

impl Checksum {
    /// Parses an href fragment of the form `sha256=<hex>`.
    pub fn from_fragment(fragment: &str) -> Option<Self> {
        let digest = fragment.strip_prefix("sha256=")?;
        if digest.is_empty() || hex::decode(digest).is_err() {
            tracing::warn!("ignoring malformed sha256 fragment: {}", fragment);
            return None;
        }
        Some(Self(digest.to_ascii_lowercase()))
    }

    /// Parses an `integrity` attribute of the form `sha256-<base64>`.
    pub fn from_integrity(integrity: &str) -> Option<Self> {
        let encoded = integrity.strip_prefix("sha256-")?;
        match STANDARD.decode(encoded) {
            Ok(bytes) if !bytes.is_empty() => Some(Self(hex::encode(bytes))),
            _ => {
                tracing::warn!("ignoring malformed integrity attribute: {}", integrity);
                None
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{}", self.0)
    }
}

/// A file linked from a registry listing page.
///
/// `name` is the displayed anchor text, which is authoritative for the
/// filename; `link` is the absolute download URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub name: String,
    pub link: String,
    pub checksum: Option<Checksum>,
}

/// A `<name>-<version>-variants.json` artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantDocumentArtifact {
    #[serde(flatten)]
    pub artifact: Artifact,
    pub version: String,
}

/// A `.whl` artifact with its parsed filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WheelArtifact {
    pub artifact: Artifact,
    pub filename: WheelFilename,
}

impl WheelArtifact {
    pub fn version(&self) -> &str {
        &self.filename.version
    }

    pub fn variant_label(&self) -> Option<&str> {
        self.filename.variant_label.as_deref()
    }
}

/// An artifact classified by its filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedArtifact {
    VariantDocument(VariantDocumentArtifact),
    Wheel(WheelArtifact),
}

impl ClassifiedArtifact {
    /// Classifies `artifact` by its displayed filename.
    ///
    /// Fails on unknown extensions and on filenames that do not follow the
    /// wheel or variant-document grammar.
    pub fn classify(artifact: Artifact) -> Result<Self> {
        match parse_filename(&artifact.name)? {
            ParsedFilename::VariantDocument(doc) => {
                Ok(Self::VariantDocument(VariantDocumentArtifact {
                    artifact,
                    version: doc.version,
                }))
            }
            ParsedFilename::Wheel(filename) => Ok(Self::Wheel(WheelArtifact { artifact, filename })),
        }
    }

    pub fn artifact(&self) -> &Artifact {
        match self {
            Self::VariantDocument(doc) => &doc.artifact,
            Self::Wheel(wheel) => &wheel.artifact,
        }
    }

    pub fn name(&self) -> &str {
        &self.artifact().name
    }

    pub fn version(&self) -> &str {
        match self {
            Self::VariantDocument(doc) => &doc.version,
            Self::Wheel(wheel) => wheel.version(),
        }
    }
}
