use crate::context::{normalize_destination_key, ContextDiscovery, ContextMapping, EmbeddedContexts};
use crate::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::error::{Result, TransformError};
use crate::mapping::{
    compile_mappings, Consumption, FormatPair, Mapping, PendingSet, TenantSettings, TransformProfile,
};
use crate::record::{OutboundRecord, TYPE_FIELD};
use crate::transform::getter::ValueGetter;
use crate::transform::relationships::{self, RelationshipTransformer};
use crate::transform::setter::ValueSetter;
use crate::transform::Scope;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Transforms source records into the publish format of a profile.
///
/// Holds only validated configuration and shared handles, so one instance
/// can serve any number of records and threads.
#[derive(Clone)]
pub struct GdsnTransformer {
    mappings: Vec<Mapping>,
    relationship_mappings: Vec<Mapping>,
    collection_separator: String,
    context_delimiter: String,
    manage_self_data_in_context: bool,
    formats: FormatPair,
    context_map: BTreeMap<String, String>,
    discovery: Arc<dyn ContextDiscovery>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl GdsnTransformer {
    pub fn new(profile: &TransformProfile, tenant: &TenantSettings) -> Result<Self> {
        let config = &profile.transform;
        if config.field_map.is_empty() {
            return Err(TransformError::EmptyFieldMap);
        }
        if config.settings.collection_separator.is_empty() {
            return Err(TransformError::EmptySetting {
                name: "collectionSeparator",
            });
        }
        if tenant.context_delimiter.is_empty() {
            return Err(TransformError::EmptySetting {
                name: "contextDelimiter",
            });
        }

        Ok(GdsnTransformer {
            mappings: compile_mappings(&config.field_map)?,
            relationship_mappings: compile_mappings(&config.relationships.field_map)?,
            collection_separator: config.settings.collection_separator.clone(),
            context_delimiter: tenant.context_delimiter.clone(),
            manage_self_data_in_context: config.settings.manage_self_data_in_context,
            formats: profile.format_pair(),
            context_map: config.context_map.clone(),
            discovery: Arc::new(EmbeddedContexts),
            diagnostics: Arc::new(TracingDiagnostics),
        })
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_context_discovery(mut self, discovery: Arc<dyn ContextDiscovery>) -> Self {
        self.discovery = discovery;
        self
    }

    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    /// Transform one record.
    ///
    /// Fails on input that is not a JSON object or has no entity type. A
    /// failing relationship pass is reported to the diagnostics sink and the
    /// record is returned without it.
    pub fn transform(&self, inbound: &Value) -> Result<Value> {
        if !inbound.is_object() {
            return Err(TransformError::UnsupportedRecord {
                kind: kind_name(inbound),
            });
        }

        let entity_type = inbound
            .get(TYPE_FIELD)
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| TransformError::MissingEntityType {
                record: inbound.to_string(),
            })?;

        let outbound = self.transform_record(inbound, entity_type);
        let outbound = self.with_relationships(inbound, entity_type, outbound);

        Ok(outbound.into_value())
    }

    /// `outbound` with the relationship arrays attached, or unchanged when
    /// there are none or the relationship pass failed
    fn with_relationships(&self, inbound: &Value, entity_type: &str, outbound: OutboundRecord) -> OutboundRecord {
        let pass = RelationshipTransformer::new(&self.relationship_mappings, self.setter());
        let attached = pass.transform(entity_type, inbound).and_then(|children| {
            if children.is_empty() {
                Ok(None)
            } else {
                relationships::attach(&outbound, children).map(Some)
            }
        });

        match attached {
            Ok(Some(attached)) => attached,
            Ok(None) => outbound,
            Err(e) => {
                self.diagnostics
                    .error(&format!("Relationship transformation failed: {}", e));
                outbound
            }
        }
    }

    fn setter(&self) -> ValueSetter<'_> {
        ValueSetter::new(&self.collection_separator, self.diagnostics.as_ref())
    }

    fn transform_record(&self, inbound: &Value, entity_type: &str) -> OutboundRecord {
        let mut outbound = OutboundRecord::new();
        let mut pending = PendingSet::new(&self.mappings);
        let mut is_context_record = false;

        let regions = self
            .discovery
            .discover(inbound, &self.formats, &self.context_delimiter);

        for region in regions {
            let context = region.initialize(&self.context_delimiter, &self.formats, &self.context_map);
            // the record may hold data for contexts other than this one
            let Some(source_key) = context.key_from_source(inbound) else {
                continue;
            };

            is_context_record = true;
            self.diagnostics
                .debug(&format!("Applying mappings for context {}", context));

            let consumed = self.apply_mappings(
                inbound,
                &mut outbound,
                entity_type,
                Some((&context, source_key.as_str())),
                &pending,
            );
            pending = pending.residual(&consumed);
        }

        if (!is_context_record || self.manage_self_data_in_context) && !pending.is_empty() {
            self.apply_mappings(inbound, &mut outbound, entity_type, None, &pending);
        }

        outbound
    }

    /// One pass over the pending mappings in a single scope. Returns the
    /// context keys each considered mapping consumed.
    fn apply_mappings(
        &self,
        inbound: &Value,
        outbound: &mut OutboundRecord,
        entity_type: &str,
        context: Option<(&ContextMapping, &str)>,
        pending: &PendingSet,
    ) -> Vec<Consumption> {
        let getter = ValueGetter::new(&self.collection_separator);
        let setter = self.setter();
        let mut consumed = Vec::new();

        for mapping in self.mappings.iter().filter(|m| pending.contains(m.id)) {
            if !mapping.applies_to(entity_type) {
                continue;
            }

            let destination_key = context.and_then(|(context, source_key)| {
                pending
                    .awaits(mapping.id, source_key)
                    .then(|| context.destination_key_for(source_key))
                    .flatten()
            });
            if context.is_some() && destination_key.is_none() {
                continue;
            }

            let destination_key = normalize_destination_key(destination_key);
            let scope = Scope {
                source_key: context.map(|(_, key)| key.to_string()),
                source_root: context.map(|(context, _)| context.root()),
                destination_key,
            };

            if mapping.shape.nested {
                self.diagnostics.debug(&format!(
                    "Nested mapping {} is not projected",
                    mapping.source_expr
                ));
            } else {
                self.apply_mapping(inbound, outbound, mapping, &scope, &getter, &setter);
            }

            let key = match (&scope.source_key, &scope.destination_key) {
                (Some(source_key), Some(_)) => Some(source_key.clone()),
                _ => None,
            };
            consumed.push(Consumption {
                mapping: mapping.id,
                key,
            });
        }

        consumed
    }

    fn apply_mapping(
        &self,
        inbound: &Value,
        outbound: &mut OutboundRecord,
        mapping: &Mapping,
        scope: &Scope,
        getter: &ValueGetter<'_>,
        setter: &ValueSetter<'_>,
    ) {
        let Some(value) = getter.get(inbound, mapping, scope, 0) else {
            self.diagnostics
                .debug(&format!("No value found for {}", mapping.source_expr));
            return;
        };

        let uom = if mapping.shape.uom {
            getter.uom(inbound, mapping, scope, &value)
        } else {
            None
        };

        if let Err(e) = setter.set(outbound, mapping, &value, scope, uom.as_deref(), inbound) {
            self.diagnostics.error(&format!(
                "Failed to set {} from {}: {}",
                mapping.destination, mapping.source_expr, e
            ));
        }
    }
}

impl fmt::Display for GdsnTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GdsnTransformer: inboundFormat = {}, outboundFormat = {}",
            self.formats.collect, self.formats.publish
        )
    }
}

impl fmt::Debug for GdsnTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GdsnTransformer")
            .field("mappings", &self.mappings.len())
            .field("relationship_mappings", &self.relationship_mappings.len())
            .field("formats", &self.formats)
            .finish()
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
