use thiserror::Error;

/// Core error types for vindex.
///
/// Covers the failure modes shared by every stage of the pipeline: transport
/// failures from the fetch primitive, filenames that do not follow the wheel
/// or variant-document grammar, and local I/O.
///
/// # Examples
///
/// ```
/// use vindex_core::error::{CoreError, Result};
///
/// fn check(name: &str) -> Result<()> {
///     if !name.ends_with(".whl") {
///         return Err(CoreError::invalid_filename(name, "missing `.whl` suffix"));
///     }
///     Ok(())
/// }
///
/// assert!(check("pkg-1.0.tar.gz").is_err());
/// ```
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("request failed for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("unsupported URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("invalid filename `{filename}`: {reason}")]
    InvalidFilename { filename: String, reason: String },

    #[error("unknown file extension: `{filename}`")]
    UnknownExtension { filename: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for `Result<T, CoreError>`.
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Helper for creating filename parse errors
    pub fn invalid_filename(filename: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFilename {
            filename: filename.into(),
            reason: reason.into(),
        }
    }

    /// Helper for creating URL errors
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if the error came from the fetch primitive rather than
    /// from the data it returned.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::HttpStatus { .. } | Self::InvalidUrl { .. }
        )
    }
}
