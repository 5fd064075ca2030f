//! Variant-metadata document support for vindex.
//!
//! Variant documents (`<package>-<version>-variants.json`) describe, for one
//! release, which variant labels exist and which namespace/feature/value
//! properties each label stands for. Several schema revisions are in the
//! wild; this crate reads all supported revisions and normalizes them to the
//! canonical one so that nothing downstream needs to know about legacy
//! shapes.
//!
//! # Architecture
//!
//! - **Models**: one typed module per revision (`schema::v0_0_2`,
//!   `schema::v0_0_3`), closed over by [`SchemaRevision`]
//! - **Migration**: v0.0.2 → v0.0.3, see [`schema::v0_0_2::VariantsJson::into_v0_0_3`]
//! - **Normalizer**: local validation + migration + remote JSON Schema validation
//! - **Error Handling**: typed errors with `thiserror`; only
//!   [`SchemaError::Unsupported`] is recoverable
//!
//! # Examples
//!
//! ```
//! use vindex_schema::normalize_local;
//!
//! let canonical = normalize_local(serde_json::json!({
//!     "$schema": "https://variants-schema.wheelnext.dev/v0.0.2.json",
//!     "default-priorities": {
//!         "namespace": ["x86_64"],
//!         "property": {"x86_64": {"level": ["v1", "v2", "v3"]}}
//!     },
//!     "providers": {"x86_64": {"plugin-api": "provider_variant_x86_64.plugin:X8664Plugin"}},
//!     "variants": {"x8664v3": {"x86_64": {"level": ["v3"]}}}
//! }))
//! .unwrap();
//!
//! assert!(canonical.default_priorities.property.is_empty());
//! assert!(canonical.static_properties.is_some());
//! assert_eq!(
//!     canonical.flattened_properties()["x8664v3"],
//!     vec!["x86_64 :: level :: v3"]
//! );
//! ```

pub mod error;
pub mod normalize;
pub mod schema;

// Re-export commonly used types
pub use error::{Result, SchemaError};
pub use normalize::{Normalizer, declared_schema, normalize_local};
pub use schema::v0_0_3::VariantsJson;
pub use schema::{SCHEMA_ROOT, SchemaRevision};
