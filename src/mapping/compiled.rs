//! Validated mappings and the per-transform pending set

use crate::error::{Result, TransformError};
use crate::mapping::field::{DestinationField, SourceField};
use crate::mapping::types::FieldMapping;
use std::collections::{BTreeMap, BTreeSet};

/// Context key standing for the unscoped (self) data
pub const SELF_CONTEXT: &str = "self";

/// How a mapping's value is read and written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldShape {
    pub collection: bool,
    pub localizable: bool,
    pub uom: bool,
    pub reference: bool,
    pub nested: bool,
}

impl FieldShape {
    fn from_config(field_type: &str, config: &FieldMapping) -> Self {
        let named = |name: &str| field_type.eq_ignore_ascii_case(name);

        FieldShape {
            collection: config.is_collection || named("collection"),
            localizable: config.is_localizable || named("localizable"),
            uom: config.has_uom || named("hasUOM"),
            reference: named("referenceTypeData"),
            nested: named("nested"),
        }
    }

    /// Values are read as every occurrence, joined with the separator
    pub fn is_multi_valued(&self) -> bool {
        self.collection || self.localizable
    }

    /// Destination templates take the occurrence index
    pub fn is_indexed(&self) -> bool {
        self.is_multi_valued() || self.reference
    }
}

/// A field mapping validated and parsed for use by the engine
#[derive(Debug, Clone, PartialEq)]
pub struct Mapping {
    /// Position in its mapping list
    pub id: usize,
    pub entity_type: Option<String>,
    /// Source expression as configured, for diagnostics
    pub source_expr: String,
    pub source: SourceField,
    pub destination: DestinationField,
    pub shape: FieldShape,
    pub enabled: bool,
    pub context_keys: Option<BTreeSet<String>>,
}

impl Mapping {
    pub fn compile(id: usize, config: &FieldMapping) -> Result<Self> {
        let source_expr = config
            .source
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(TransformError::MissingSource { index: id })?;

        let destination = config
            .destination
            .as_deref()
            .filter(|d| !d.is_empty())
            .ok_or_else(|| TransformError::MissingDestination {
                index: id,
                source_field: source_expr.to_string(),
            })?;

        let field_type = config
            .field_type
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| TransformError::MissingFieldType {
                index: id,
                source_field: source_expr.to_string(),
            })?;

        let shape = FieldShape::from_config(field_type, config);
        if shape.nested && (shape.collection || shape.localizable || shape.uom) {
            return Err(TransformError::ConflictingFieldType {
                index: id,
                source_field: source_expr.to_string(),
            });
        }

        Ok(Mapping {
            id,
            entity_type: config.entity_type.clone(),
            source_expr: source_expr.to_string(),
            source: SourceField::parse(source_expr),
            destination: DestinationField::parse(destination),
            shape,
            enabled: config.enabled,
            context_keys: config
                .context_keys
                .as_ref()
                .map(|keys| keys.iter().cloned().collect()),
        })
    }

    /// Enabled and configured for records of `entity_type`
    pub fn applies_to(&self, entity_type: &str) -> bool {
        self.enabled && self.entity_type.as_deref() == Some(entity_type)
    }
}

pub fn compile_mappings(configs: &[FieldMapping]) -> Result<Vec<Mapping>> {
    configs
        .iter()
        .enumerate()
        .map(|(id, config)| Mapping::compile(id, config))
        .collect()
}

/// One mapping having been evaluated for one context key.
/// `key == None` consumes the self context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consumption {
    pub mapping: usize,
    pub key: Option<String>,
}

/// Mappings still to be evaluated in the current transform, with the
/// context keys each one is still waiting for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSet {
    remaining: BTreeMap<usize, Option<BTreeSet<String>>>,
}

impl PendingSet {
    pub fn new(mappings: &[Mapping]) -> Self {
        PendingSet {
            remaining: mappings
                .iter()
                .map(|m| (m.id, m.context_keys.clone()))
                .collect(),
        }
    }

    pub fn contains(&self, mapping: usize) -> bool {
        self.remaining.contains_key(&mapping)
    }

    /// Whether `mapping` is still pending for the source context `key`
    pub fn awaits(&self, mapping: usize, key: &str) -> bool {
        matches!(self.remaining.get(&mapping), Some(Some(keys)) if keys.contains(key))
    }

    pub fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }

    pub fn len(&self) -> usize {
        self.remaining.len()
    }

    /// Pending set left after `consumed`; mappings with nothing left to
    /// wait for drop out
    pub fn residual(&self, consumed: &[Consumption]) -> Self {
        let mut remaining = self.remaining.clone();

        for consumption in consumed {
            let exhausted = match remaining.get_mut(&consumption.mapping) {
                Some(Some(keys)) => {
                    keys.remove(consumption.key.as_deref().unwrap_or(SELF_CONTEXT));
                    keys.is_empty()
                }
                Some(None) => true,
                None => false,
            };
            if exhausted {
                remaining.remove(&consumption.mapping);
            }
        }

        PendingSet { remaining }
    }
}
