//! Variant document schema v0.0.3, the canonical shape.
//!
//! Field names are kebab-case on the wire; the snake_case spellings are
//! accepted as aliases on input. Unknown fields are rejected.
//!
//! Struct fields are declared in alphabetical wire order so serialization is
//! key-sorted at the struct level, while user-keyed maps keep their source
//! order.

use super::{FeatureMap, PropertyMap, SchemaRevision, Variants, ensure_namespaces};
use crate::error::{Result, SchemaError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::ser::{PrettyFormatter, Serializer};

/// Indentation of persisted canonical documents.
const CANONICAL_INDENT: &[u8] = b"    ";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultPriorities {
    #[serde(default)]
    pub feature: FeatureMap,
    pub namespace: Vec<String>,
    /// Kept distinct from the top-level `static-properties`.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub property: PropertyMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Provider {
    #[serde(
        rename = "enable-if",
        alias = "enable_if",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub enable_if: Option<String>,
    #[serde(
        rename = "install-time",
        alias = "install_time",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub install_time: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
    #[serde(
        rename = "plugin-api",
        alias = "plugin_api",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub plugin_api: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires: Option<Vec<String>>,
}

/// A canonical (v0.0.3) variant document.
///
/// # Examples
///
/// ```
/// use vindex_schema::VariantsJson;
///
/// let doc = VariantsJson::from_value(serde_json::json!({
///     "$schema": "https://variants-schema.wheelnext.dev/v0.0.3.json",
///     "default-priorities": {"namespace": ["x86_64"]},
///     "providers": {"x86_64": {"requires": ["provider-variant-x86-64"]}},
///     "variants": {"x8664v3": {"x86_64": {"level": ["v3"]}}}
/// }))
/// .unwrap();
///
/// assert_eq!(doc.variants["x8664v3"]["x86_64"]["level"], vec!["v3"]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantsJson {
    #[serde(rename = "$schema")]
    pub schema: String,
    #[serde(rename = "default-priorities", alias = "default_priorities")]
    pub default_priorities: DefaultPriorities,
    pub providers: IndexMap<String, Provider>,
    #[serde(
        rename = "static-properties",
        alias = "static_properties",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub static_properties: Option<PropertyMap>,
    pub variants: Variants,
}

impl VariantsJson {
    /// Decodes and validates a v0.0.3 document.
    pub fn from_value(value: Value) -> Result<Self> {
        let doc: Self = serde_json::from_value(value)
            .map_err(|e| SchemaError::local(SchemaRevision::V0_0_3, e.to_string()))?;
        doc.validate()?;
        Ok(doc)
    }

    /// Checks the rules serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.schema != SchemaRevision::V0_0_3.url() {
            return Err(SchemaError::local(
                SchemaRevision::V0_0_3,
                format!(
                    "`$schema` must be `{}`, found `{}`",
                    SchemaRevision::V0_0_3.url(),
                    self.schema
                ),
            ));
        }
        ensure_namespaces(SchemaRevision::V0_0_3, &self.default_priorities.namespace)
    }

    /// Serializes the document the way it is persisted: four-space
    /// indentation, fixed struct key order, trailing newline.
    pub fn to_canonical_json(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let mut serializer =
            Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(CANONICAL_INDENT));
        self.serialize(&mut serializer)?;
        buf.push(b'\n');
        Ok(buf)
    }

    /// Flattens every variant into `"<namespace> :: <feature> :: <value>"`
    /// strings, in source order.
    pub fn flattened_properties(&self) -> IndexMap<String, Vec<String>> {
        self.variants
            .iter()
            .map(|(label, namespaces)| {
                let props: Vec<String> = namespaces
                    .iter()
                    .flat_map(|(namespace, features)| {
                        features.iter().flat_map(move |(feature, values)| {
                            values
                                .iter()
                                .map(move |value| format!("{namespace} :: {feature} :: {value}"))
                        })
                    })
                    .collect();
                (label.clone(), props)
            })
            .collect()
    }
}
