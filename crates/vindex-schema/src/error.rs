//! Errors raised while normalizing variant documents.

use crate::schema::SchemaRevision;
use thiserror::Error;

/// Errors that can occur while resolving, validating, or migrating a variant
/// document.
///
/// Only [`SchemaError::Unsupported`] is recoverable: callers skip the
/// document and continue. Every other variant is fatal for the document.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// `$schema` names a revision this build does not know about
    #[error("unsupported variant schema version `{url}`")]
    Unsupported { url: String },

    /// Document is not a JSON object, lacks `$schema`, or lacks `variants`
    #[error("malformed variant document: {0}")]
    Malformed(String),

    /// Document does not follow the structural rules of its revision
    #[error("document does not follow schema {revision}: {message}")]
    LocalValidation {
        revision: SchemaRevision,
        message: String,
    },

    /// Remote JSON Schema could not be parsed or compiled
    #[error("failed to load JSON schema {url}: {message}")]
    RemoteSchema { url: String, message: String },

    /// Canonical document does not validate against its remote JSON Schema
    #[error("document does not validate against {url}: {}", .errors.join("; "))]
    RemoteValidation { url: String, errors: Vec<String> },

    /// Fetching the remote schema failed
    #[error(transparent)]
    Core(#[from] vindex_core::CoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;

impl SchemaError {
    /// Helper for creating local validation errors
    pub fn local(revision: SchemaRevision, message: impl Into<String>) -> Self {
        Self::LocalValidation {
            revision,
            message: message.into(),
        }
    }

    /// Returns `true` for the recoverable "unsupported schema version" case.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}
