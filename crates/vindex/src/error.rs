use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use vindex_core::CoreError;
use vindex_schema::SchemaError;

/// Two `[[index]]` entries that declare the same package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageConflict {
    pub package: String,
    pub first: String,
    pub second: String,
}

impl fmt::Display for PackageConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "package `{}` is declared for two indexes:\n\t- {}\n\t- {}",
            self.package, self.first, self.second
        )
    }
}

/// Errors raised while building the index.
///
/// Per-package errors abort only the package they belong to; the pipeline
/// logs them and continues with the remaining packages.
///
/// # Examples
///
/// ```
/// use vindex::error::IndexError;
/// use vindex_schema::SchemaError;
///
/// let err = IndexError::VariantDocument {
///     package: "dummy-project".into(),
///     url: "https://example.com/dummy_project-1.0-variants.json".into(),
///     source: SchemaError::Unsupported { url: "https://elsewhere/v9.json".into() },
/// };
/// assert!(err.is_recoverable());
/// ```
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{}", format_conflicts(.0))]
    ConflictingPackages(Vec<PackageConflict>),

    #[error("failed to fetch {url} for `{package}`: {source}")]
    Transport {
        package: String,
        url: String,
        #[source]
        source: CoreError,
    },

    #[error("invalid artifact listed for `{package}`: {source}")]
    Artifact {
        package: String,
        #[source]
        source: CoreError,
    },

    #[error(
        "variant document for version `{version}` of `{package}` is listed twice: `{first}` and `{second}`"
    )]
    DuplicateVariantDocument {
        package: String,
        version: String,
        first: String,
        second: String,
    },

    #[error("variant document {url} for `{package}` was rejected: {source}")]
    VariantDocument {
        package: String,
        url: String,
        #[source]
        source: SchemaError,
    },

    #[error("malformed cached variant document {}: {reason}", .path.display())]
    MalformedDocument { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn format_conflicts(conflicts: &[PackageConflict]) -> String {
    conflicts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl IndexError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Returns `true` when the error only affects a single variant document
    /// and the package can still be indexed without it.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::VariantDocument { source, .. } if source.is_unsupported())
    }
}

/// Convenience type alias for `Result<T, IndexError>`.
pub type Result<T> = std::result::Result<T, IndexError>;
