//! Wheel and variant-document filename parsing.
//!
//! Wheel grammar:
//!
//! ```text
//! <name>-<version>[-<build>]-<python tag>-<abi tag>-<platform tag>[-<variant label>].whl
//! ```
//!
//! The five base groups are matched first. A sixth group is read as a build
//! tag when the third group starts with a digit; only a trailing group made of
//! 1-16 characters of `[0-9a-z._]` is read as a variant label.
//!
//! Variant document grammar: `<anything>-<version>-variants.json`.

use crate::error::{CoreError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Suffix shared by every variant document filename.
pub const VARIANT_DOCUMENT_SUFFIX: &str = "-variants.json";

/// Maximum length of a variant label.
pub const MAX_VARIANT_LABEL_LENGTH: usize = 16;

static WHEEL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        ^
        (?P<name>[^\s-]+?)
        -(?P<version>[^\s-]+?)
        (?:-(?P<build>\d[^\s-]*?))?
        -(?P<python_tag>[^\s-]+?)
        -(?P<abi_tag>[^\s-]+?)
        -(?P<platform_tag>[^\s-]+?)
        (?:-(?P<variant_label>[0-9a-z._]{1,16}))?
        \.whl
        $",
    )
    .expect("wheel filename regex is valid")
});

static VARIANT_DOCUMENT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\S*-(?P<version>[^\s-]+)-variants\.json$")
        .expect("variant document filename regex is valid")
});

/// Structured form of a wheel filename.
///
/// # Examples
///
/// ```
/// use vindex_core::filename::WheelFilename;
///
/// let wheel: WheelFilename = "numpy-2.1.0-cp312-cp312-manylinux_2_28_x86_64-x8664v3.whl"
///     .parse()
///     .unwrap();
///
/// assert_eq!(wheel.name, "numpy");
/// assert_eq!(wheel.version, "2.1.0");
/// assert_eq!(wheel.variant_label.as_deref(), Some("x8664v3"));
/// assert_eq!(
///     wheel.to_string(),
///     "numpy-2.1.0-cp312-cp312-manylinux_2_28_x86_64-x8664v3.whl"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct WheelFilename {
    pub name: String,
    pub version: String,
    pub build: Option<String>,
    pub python_tag: String,
    pub abi_tag: String,
    pub platform_tag: String,
    pub variant_label: Option<String>,
}

impl WheelFilename {
    /// Returns `true` for a plain wheel (no variant label).
    pub fn is_plain(&self) -> bool {
        self.variant_label.is_none()
    }

    /// The filename without its variant label and `.whl` suffix.
    pub fn base_name(&self) -> String {
        let mut base = format!("{}-{}", self.name, self.version);
        if let Some(build) = &self.build {
            base.push('-');
            base.push_str(build);
        }
        base.push_str(&format!(
            "-{}-{}-{}",
            self.python_tag, self.abi_tag, self.platform_tag
        ));
        base
    }
}

impl fmt::Display for WheelFilename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base_name())?;
        if let Some(label) = &self.variant_label {
            write!(f, "-{}", label)?;
        }
        write!(f, ".whl")
    }
}

impl FromStr for WheelFilename {
    type Err = CoreError;

    fn from_str(filename: &str) -> Result<Self> {
        let caps = WHEEL_REGEX.captures(filename).ok_or_else(|| {
            CoreError::invalid_filename(filename, "does not match the wheel filename grammar")
        })?;

        let group = |name: &str| caps.name(name).map(|m| m.as_str().to_string());

        Ok(Self {
            name: group("name").unwrap_or_default(),
            version: group("version").unwrap_or_default(),
            build: group("build"),
            python_tag: group("python_tag").unwrap_or_default(),
            abi_tag: group("abi_tag").unwrap_or_default(),
            platform_tag: group("platform_tag").unwrap_or_default(),
            variant_label: group("variant_label"),
        })
    }
}

/// Identity of a variant document: the version it describes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct VariantDocumentName {
    pub version: String,
}

impl FromStr for VariantDocumentName {
    type Err = CoreError;

    fn from_str(filename: &str) -> Result<Self> {
        let caps = VARIANT_DOCUMENT_REGEX.captures(filename).ok_or_else(|| {
            CoreError::invalid_filename(
                filename,
                format!("expected `<name>-<version>{}`", VARIANT_DOCUMENT_SUFFIX),
            )
        })?;

        Ok(Self {
            version: caps["version"].to_string(),
        })
    }
}

/// Either kind of filename the registry scanner understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedFilename {
    VariantDocument(VariantDocumentName),
    Wheel(WheelFilename),
}

impl ParsedFilename {
    pub fn version(&self) -> &str {
        match self {
            Self::VariantDocument(doc) => &doc.version,
            Self::Wheel(wheel) => &wheel.version,
        }
    }
}

/// Parses a filename by its extension.
///
/// `.json` files must follow the variant document grammar and `.whl` files
/// the wheel grammar. Any other extension is an [`CoreError::UnknownExtension`].
///
/// # Examples
///
/// ```
/// use vindex_core::filename::{parse_filename, ParsedFilename};
///
/// let parsed = parse_filename("torch-2.5.0-variants.json").unwrap();
/// assert!(matches!(parsed, ParsedFilename::VariantDocument(_)));
/// assert_eq!(parsed.version(), "2.5.0");
///
/// assert!(parse_filename("torch-2.5.0.tar.gz").is_err());
/// ```
pub fn parse_filename(filename: &str) -> Result<ParsedFilename> {
    if filename.ends_with(".json") {
        filename
            .parse::<VariantDocumentName>()
            .map(ParsedFilename::VariantDocument)
    } else if filename.ends_with(".whl") {
        filename.parse::<WheelFilename>().map(ParsedFilename::Wheel)
    } else {
        Err(CoreError::UnknownExtension {
            filename: filename.to_string(),
        })
    }
}
