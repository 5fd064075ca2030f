//! Normalization of variant documents to the canonical revision.
//!
//! Normalization happens in two stages:
//!
//! 1. [`normalize_local`] resolves `$schema`, validates the document against
//!    the structural rules of its revision, and migrates legacy revisions.
//! 2. [`Normalizer::normalize`] additionally validates the canonical document
//!    against the JSON Schema published at its own `$schema` URL.
//!
//! Remote schemas are fetched once per URL and kept compiled for the rest of
//! the run.

use crate::error::{Result, SchemaError};
use crate::schema::{SchemaRevision, v0_0_2, v0_0_3};
use dashmap::DashMap;
use jsonschema::Validator;
use serde_json::Value;
use std::sync::Arc;
use vindex_core::Fetch;

/// Reads the declared `$schema` URL of a raw document.
pub fn declared_schema(raw: &Value) -> Result<&str> {
    let object = raw
        .as_object()
        .ok_or_else(|| SchemaError::Malformed("document is not a JSON object".into()))?;

    object
        .get("$schema")
        .ok_or_else(|| SchemaError::Malformed("document has no `$schema` key".into()))?
        .as_str()
        .ok_or_else(|| SchemaError::Malformed("`$schema` is not a string".into()))
}

/// Validates `raw` against its declared revision and migrates it to the
/// canonical revision. Does no I/O.
///
/// # Examples
///
/// ```
/// use vindex_schema::{normalize_local, SchemaRevision};
///
/// let canonical = normalize_local(serde_json::json!({
///     "$schema": "https://variants-schema.wheelnext.dev/",
///     "default-priorities": {"namespace": ["cpu"]},
///     "providers": {"cpu": {"plugin-use": "build"}},
///     "variants": {}
/// }))
/// .unwrap();
///
/// assert_eq!(canonical.schema, SchemaRevision::CURRENT.url());
/// assert_eq!(canonical.providers["cpu"].install_time, Some(false));
/// ```
pub fn normalize_local(mut raw: Value) -> Result<v0_0_3::VariantsJson> {
    let revision = SchemaRevision::resolve(declared_schema(&raw)?)?;

    // Legacy aliases (the bare schema root) are stored under the canonical URL
    // of the revision they resolve to.
    raw["$schema"] = Value::String(revision.url().to_string());

    match revision {
        SchemaRevision::V0_0_2 => {
            tracing::debug!("migrating variant document from {}", revision);
            v0_0_2::VariantsJson::from_value(raw)?.into_v0_0_3()
        }
        SchemaRevision::V0_0_3 => v0_0_3::VariantsJson::from_value(raw),
    }
}

/// Normalizer with remote JSON Schema validation.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use vindex_core::{HttpFetcher, DEFAULT_TIMEOUT};
/// use vindex_schema::Normalizer;
///
/// # async fn example() -> vindex_schema::Result<()> {
/// let fetcher = Arc::new(HttpFetcher::new(DEFAULT_TIMEOUT)?);
/// let normalizer = Normalizer::new(fetcher);
///
/// let raw = serde_json::json!({
///     "$schema": "https://variants-schema.wheelnext.dev/v0.0.3.json",
///     "default-priorities": {"namespace": ["cpu"]},
///     "providers": {},
///     "variants": {}
/// });
/// let canonical = normalizer.normalize(raw).await?;
/// # Ok(())
/// # }
/// ```
pub struct Normalizer {
    fetcher: Arc<dyn Fetch>,
    validate_remote: bool,
    remote_schemas: DashMap<String, Arc<Validator>>,
}

impl Normalizer {
    /// Creates a normalizer that validates against remote schemas.
    pub fn new(fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            fetcher,
            validate_remote: true,
            remote_schemas: DashMap::new(),
        }
    }

    /// Enables or disables validation against the remote JSON Schema.
    #[must_use]
    pub fn with_remote_validation(mut self, enabled: bool) -> Self {
        self.validate_remote = enabled;
        self
    }

    /// Returns the canonical form of `raw`.
    ///
    /// # Errors
    ///
    /// - [`SchemaError::Unsupported`] for unknown revisions (recoverable)
    /// - [`SchemaError::LocalValidation`] / [`SchemaError::Malformed`] for
    ///   structurally invalid documents
    /// - [`SchemaError::RemoteValidation`] when the canonical document does not
    ///   validate against its published schema
    pub async fn normalize(&self, raw: Value) -> Result<v0_0_3::VariantsJson> {
        let canonical = normalize_local(raw)?;

        if self.validate_remote {
            self.validate_against_remote(&canonical).await?;
        }

        Ok(canonical)
    }

    async fn validate_against_remote(&self, doc: &v0_0_3::VariantsJson) -> Result<()> {
        let validator = self.remote_validator(&doc.schema).await?;
        let instance = serde_json::to_value(doc)?;

        let errors: Vec<String> = validator
            .iter_errors(&instance)
            .map(|e| {
                let path = e.instance_path().to_string();
                if path.is_empty() {
                    e.to_string()
                } else {
                    format!("{}: {}", path, e)
                }
            })
            .collect();

        if !errors.is_empty() {
            return Err(SchemaError::RemoteValidation {
                url: doc.schema.clone(),
                errors,
            });
        }

        Ok(())
    }

    async fn remote_validator(&self, url: &str) -> Result<Arc<Validator>> {
        let cached = self
            .remote_schemas
            .get(url)
            .map(|entry| Arc::clone(entry.value()));
        if let Some(validator) = cached {
            return Ok(validator);
        }

        tracing::debug!("loading remote JSON schema: {}", url);
        let bytes = self.fetcher.get(url).await?;
        let schema: Value = serde_json::from_slice(&bytes).map_err(|e| SchemaError::RemoteSchema {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let validator =
            Arc::new(
                jsonschema::validator_for(&schema).map_err(|e| SchemaError::RemoteSchema {
                    url: url.to_string(),
                    message: e.to_string(),
                })?,
            );

        self.remote_schemas
            .insert(url.to_string(), Arc::clone(&validator));
        Ok(validator)
    }
}
