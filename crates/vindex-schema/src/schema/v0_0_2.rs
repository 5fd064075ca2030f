//! Variant document schema v0.0.2 (legacy).
//!
//! Differences from v0.0.3:
//! - providers carry a `plugin-use` string instead of a boolean `install-time`
//! - static property values live in `default-priorities.property`

use super::{FeatureMap, PropertyMap, SchemaRevision, Variants, ensure_namespaces, v0_0_3};
use crate::error::{Result, SchemaError};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

/// `plugin-use` value that maps to `install-time = true`.
const PLUGIN_USE_ALL: &str = "all";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultPriorities {
    pub namespace: Vec<String>,
    #[serde(default)]
    pub feature: FeatureMap,
    #[serde(default)]
    pub property: PropertyMap,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Provider {
    #[serde(rename = "plugin-api", alias = "plugin_api", default)]
    pub plugin_api: Option<String>,
    #[serde(rename = "enable-if", alias = "enable_if", default)]
    pub enable_if: Option<String>,
    #[serde(default)]
    pub optional: Option<bool>,
    #[serde(rename = "plugin-use", alias = "plugin_use", default)]
    pub plugin_use: Option<String>,
    #[serde(default)]
    pub requires: Option<Vec<String>>,
}

impl Provider {
    fn into_v0_0_3(self) -> v0_0_3::Provider {
        let plugin_use = self.plugin_use.as_deref().unwrap_or(PLUGIN_USE_ALL);

        v0_0_3::Provider {
            enable_if: self.enable_if,
            install_time: Some(plugin_use == PLUGIN_USE_ALL),
            optional: self.optional,
            plugin_api: self.plugin_api,
            requires: self.requires,
        }
    }
}

/// A v0.0.2 variant document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantsJson {
    #[serde(rename = "$schema")]
    pub schema: String,
    #[serde(rename = "default-priorities", alias = "default_priorities")]
    pub default_priorities: DefaultPriorities,
    pub providers: IndexMap<String, Provider>,
    pub variants: Variants,
}

impl VariantsJson {
    /// Decodes and validates a v0.0.2 document.
    ///
    /// The caller is expected to have rewritten a bare schema-root `$schema`
    /// to the v0.0.2 URL.
    pub fn from_value(value: Value) -> Result<Self> {
        let doc: Self = serde_json::from_value(value)
            .map_err(|e| SchemaError::local(SchemaRevision::V0_0_2, e.to_string()))?;

        if doc.schema != SchemaRevision::V0_0_2.url() {
            return Err(SchemaError::local(
                SchemaRevision::V0_0_2,
                format!(
                    "`$schema` must be `{}`, found `{}`",
                    SchemaRevision::V0_0_2.url(),
                    doc.schema
                ),
            ));
        }
        ensure_namespaces(SchemaRevision::V0_0_2, &doc.default_priorities.namespace)?;

        Ok(doc)
    }

    /// Migrates to v0.0.3 and validates the result against v0.0.3 rules.
    ///
    /// `default-priorities.property` moves to the top-level
    /// `static-properties` and is not kept in `default-priorities`.
    pub fn into_v0_0_3(self) -> Result<v0_0_3::VariantsJson> {
        let DefaultPriorities {
            namespace,
            feature,
            property,
        } = self.default_priorities;

        let migrated = v0_0_3::VariantsJson {
            schema: SchemaRevision::V0_0_3.url().to_string(),
            default_priorities: v0_0_3::DefaultPriorities {
                feature,
                namespace,
                property: PropertyMap::new(),
            },
            providers: self
                .providers
                .into_iter()
                .map(|(name, provider)| (name, provider.into_v0_0_3()))
                .collect(),
            static_properties: Some(property),
            variants: self.variants,
        };

        migrated.validate()?;
        Ok(migrated)
    }
}
