//! Context partitions of a source record
//!
//! A record may carry data scoped to contexts (markets, locales) next to
//! its unscoped data. Discovery enumerates the context regions, each region
//! is initialized into a `ContextMapping` that knows its source key and how
//! that key translates to a destination key.

use crate::mapping::{FormatPair, SELF_CONTEXT};
use crate::record::path;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Array holding the context regions of a record
pub const CONTEXTS_FIELD: &str = "contexts";

/// Object inside a region naming its context dimensions
pub const CONTEXT_FIELD: &str = "context";

/// Attribute map inside a region
pub const ATTRIBUTES_FIELD: &str = "attributes";

/// Finds the context regions present in a source record
pub trait ContextDiscovery: Send + Sync {
    fn discover(&self, source: &Value, formats: &FormatPair, delimiter: &str) -> Vec<ContextRegion>;
}

/// A context region found in a source record, not yet initialized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextRegion {
    /// Position in the record's context array
    pub index: usize,
    /// Dimension values making up the region's key, in dimension order
    pub key_parts: Vec<String>,
}

impl ContextRegion {
    pub fn new(index: usize, key_parts: Vec<String>) -> Self {
        ContextRegion { index, key_parts }
    }

    /// Resolve the region's key and destination translation
    pub fn initialize(
        self,
        delimiter: &str,
        formats: &FormatPair,
        context_map: &BTreeMap<String, String>,
    ) -> ContextMapping {
        let source_key = (!self.key_parts.is_empty()).then(|| self.key_parts.join(delimiter));

        ContextMapping {
            index: self.index,
            source_key,
            destinations: context_map.clone(),
            formats: formats.clone(),
        }
    }
}

/// One initialized context partition of the record being transformed
#[derive(Debug, Clone)]
pub struct ContextMapping {
    index: usize,
    source_key: Option<String>,
    destinations: BTreeMap<String, String>,
    formats: FormatPair,
}

impl ContextMapping {
    /// Path prefix of the region's data in the source record
    pub fn root(&self) -> String {
        format!("{}[{}]", CONTEXTS_FIELD, self.index)
    }

    /// The region's source key, or `None` when the region carries no key or
    /// no attribute data for this record
    pub fn key_from_source(&self, source: &Value) -> Option<String> {
        let key = self.source_key.as_ref()?;
        let attributes = path::find_object(source, &format!("{}.{}", self.root(), ATTRIBUTES_FIELD))?;
        (!attributes.is_empty()).then(|| key.clone())
    }

    /// Destination key for `source_key`. Without a configured context map
    /// keys pass through unchanged; with one, unmapped keys have no
    /// destination.
    pub fn destination_key_for(&self, source_key: &str) -> Option<String> {
        if source_key.is_empty() {
            return None;
        }
        if self.destinations.is_empty() {
            return Some(source_key.to_string());
        }
        self.destinations
            .get(source_key)
            .filter(|key| !key.is_empty())
            .cloned()
    }
}

impl fmt::Display for ContextMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} -> {})",
            self.source_key.as_deref().unwrap_or("<none>"),
            self.formats.collect,
            self.formats.publish
        )
    }
}

/// Drop the `self` sentinel: it means "write without a context"
pub fn normalize_destination_key(key: Option<String>) -> Option<String> {
    key.filter(|k| !k.is_empty() && !k.eq_ignore_ascii_case(SELF_CONTEXT))
}

/// Discovers regions stored inline under `contexts[]`, each carrying a
/// `context` object of dimension values and its own `attributes`
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedContexts;

impl ContextDiscovery for EmbeddedContexts {
    fn discover(&self, source: &Value, _formats: &FormatPair, _delimiter: &str) -> Vec<ContextRegion> {
        let Some(regions) = path::find_array(source, CONTEXTS_FIELD) else {
            return Vec::new();
        };

        regions
            .iter()
            .enumerate()
            .map(|(index, region)| {
                let key_parts = region
                    .get(CONTEXT_FIELD)
                    .and_then(Value::as_object)
                    .map(|dimensions| dimensions.values().filter_map(path::scalar_string).collect())
                    .unwrap_or_default();
                ContextRegion::new(index, key_parts)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn formats() -> FormatPair {
        FormatPair {
            collect: "RSJSON".to_string(),
            publish: "GDSN".to_string(),
        }
    }

    fn record() -> Value {
        json!({
            "type": "product",
            "contexts": [
                {"context": {"country": "US", "locale": "en-US"}, "attributes": {"price": {"values": [{"value": "10"}]}}},
                {"context": {"country": "DE"}, "attributes": {}},
                {"attributes": {"price": {"values": [{"value": "12"}]}}}
            ]
        })
    }

    #[test]
    fn test_discover_regions() {
        let regions = EmbeddedContexts.discover(&record(), &formats(), "_");
        assert_eq!(regions.len(), 3);
        assert_eq!(regions[0].key_parts, vec!["US".to_string(), "en-US".to_string()]);
        assert!(regions[2].key_parts.is_empty());

        assert!(EmbeddedContexts.discover(&json!({"type": "product"}), &formats(), "_").is_empty());
    }

    #[test]
    fn test_key_from_source() {
        let source = record();
        let keys: Vec<Option<String>> = EmbeddedContexts
            .discover(&source, &formats(), "_")
            .into_iter()
            .map(|region| region.initialize("_", &formats(), &BTreeMap::new()).key_from_source(&source))
            .collect();

        // region 1 has no attribute data, region 2 has no key
        assert_eq!(keys, vec![Some("US_en-US".to_string()), None, None]);
    }

    #[test]
    fn test_destination_key_for() {
        let identity = ContextRegion::new(0, vec!["US".to_string()]).initialize("_", &formats(), &BTreeMap::new());
        assert_eq!(identity.destination_key_for("US"), Some("US".to_string()));
        assert_eq!(identity.destination_key_for(""), None);

        let map = BTreeMap::from([
            ("US".to_string(), "840".to_string()),
            ("GLOBAL".to_string(), "self".to_string()),
        ]);
        let mapped = ContextRegion::new(0, vec!["US".to_string()]).initialize("_", &formats(), &map);
        assert_eq!(mapped.destination_key_for("US"), Some("840".to_string()));
        assert_eq!(mapped.destination_key_for("DE"), None);
        assert_eq!(
            normalize_destination_key(mapped.destination_key_for("GLOBAL")),
            None
        );
        assert_eq!(mapped.to_string(), "US (RSJSON -> GDSN)");
    }
}
