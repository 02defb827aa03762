use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

fn default_enabled() -> bool {
    true
}

/// One configured field mapping, as it appears in a transform profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    /// Record kind this mapping applies to, matched against the record's `type`
    #[serde(default)]
    pub entity_type: Option<String>,

    /// Source field expression (plain path or macro)
    #[serde(default)]
    pub source: Option<String>,

    /// Destination field expression, may contain `%d` and `{context}`
    #[serde(default)]
    pub destination: Option<String>,

    /// Field type: `collection`, `localizable`, `hasUOM`, `referenceTypeData`,
    /// `nested`, or any other name for a plain value
    #[serde(rename = "type", default)]
    pub field_type: Option<String>,

    #[serde(default)]
    pub is_collection: bool,

    #[serde(default)]
    pub is_localizable: bool,

    #[serde(rename = "hasUOM", default)]
    pub has_uom: bool,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Source context keys this mapping should be evaluated for.
    /// `self` stands for the unscoped data.
    #[serde(default)]
    pub context_keys: Option<Vec<String>>,
}

impl FieldMapping {
    pub fn new(
        entity_type: impl Into<String>,
        source: impl Into<String>,
        destination: impl Into<String>,
        field_type: impl Into<String>,
    ) -> Self {
        FieldMapping {
            entity_type: Some(entity_type.into()),
            source: Some(source.into()),
            destination: Some(destination.into()),
            field_type: Some(field_type.into()),
            is_collection: false,
            is_localizable: false,
            has_uom: false,
            enabled: true,
            context_keys: None,
        }
    }

    pub fn with_context_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.context_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn collection(mut self) -> Self {
        self.is_collection = true;
        self
    }

    pub fn localizable(mut self) -> Self {
        self.is_localizable = true;
        self
    }

    pub fn with_uom(mut self) -> Self {
        self.has_uom = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Data format of one side of the connector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Format {
    #[serde(rename = "type", default)]
    pub format_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    #[serde(default)]
    pub format: Format,
}

/// Inbound and outbound format names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatPair {
    pub collect: String,
    pub publish: String,
}

/// Transform behaviour switches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformSettings {
    /// Separator used to join and split multi-valued fields
    pub collection_separator: String,

    /// Also populate unscoped data when the record had context data
    #[serde(default)]
    pub manage_self_data_in_context: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipConfig {
    #[serde(default)]
    pub field_map: Vec<FieldMapping>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformConfig {
    pub settings: TransformSettings,

    #[serde(default)]
    pub field_map: Vec<FieldMapping>,

    #[serde(default)]
    pub relationships: RelationshipConfig,

    /// Source context key to destination context key. Empty means identity.
    #[serde(default)]
    pub context_map: BTreeMap<String, String>,
}

/// Connector profile: formats on both sides plus the transform section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformProfile {
    #[serde(default)]
    pub collect: Endpoint,

    #[serde(default)]
    pub publish: Endpoint,

    pub transform: TransformConfig,
}

impl TransformProfile {
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile: {}", path.display()))?;
        Self::from_json_str(&content)
            .with_context(|| format!("Failed to parse profile: {}", path.display()))
    }

    pub fn format_pair(&self) -> FormatPair {
        FormatPair {
            collect: self.collect.format.format_type.clone(),
            publish: self.publish.format.format_type.clone(),
        }
    }
}

/// Per-tenant settings resolved outside of the transformer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantSettings {
    /// Joins the parts of a composite context key
    pub context_delimiter: String,
}

impl TenantSettings {
    pub fn new(context_delimiter: impl Into<String>) -> Self {
        TenantSettings {
            context_delimiter: context_delimiter.into(),
        }
    }
}
