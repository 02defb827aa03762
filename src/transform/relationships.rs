//! Relationship pass: attribute mapping over the children listed under a
//! record's relationships
//!
//! Each relationship type found under `data.searchRelationships` is turned
//! into an array of child records. A child record gets the values of the
//! relationship mappings (first value of each attribute, no collection
//! expansion) plus a copy of its related-to attributes, which win over
//! mapped values. The arrays are attached at
//! `nextLowerLevelTradeItemInformation.<relationshipType>` only once every
//! relationship type transformed cleanly.

use crate::context::ATTRIBUTES_FIELD;
use crate::error::Result;
use crate::mapping::Mapping;
use crate::record::{path, OutboundRecord, Owner};
use crate::transform::setter::ValueSetter;
use crate::transform::Scope;
use serde_json::{Map, Value};

/// Relationship blocks of a source record, keyed by relationship type
pub const RELATIONSHIPS_PATH: &str = "data.searchRelationships";

/// Attributes of the record a relationship child points to
pub const RELATED_TO_ATTRIBUTES_PATH: &str = "relTo.data.attributes";

/// Destination of the per-relationship child arrays
pub const LOWER_LEVEL_PATH: &str = "nextLowerLevelTradeItemInformation";

/// First value below an attribute entry
pub const FIRST_VALUE_PATH: &str = "values[0].value";

pub struct RelationshipTransformer<'a> {
    mappings: &'a [Mapping],
    setter: ValueSetter<'a>,
}

impl<'a> RelationshipTransformer<'a> {
    pub fn new(mappings: &'a [Mapping], setter: ValueSetter<'a>) -> Self {
        RelationshipTransformer { mappings, setter }
    }

    /// Transformed child arrays of `inbound`, keyed by relationship type.
    ///
    /// A missing or non-object relationship block yields nothing, as do
    /// relationship types whose value is not an array.
    pub fn transform(&self, entity_type: &str, inbound: &Value) -> Result<Map<String, Value>> {
        let mut transformed = Map::new();
        if self.mappings.is_empty() {
            return Ok(transformed);
        }
        let Some(relationships) = path::find_object(inbound, RELATIONSHIPS_PATH) else {
            return Ok(transformed);
        };

        let mappings: Vec<&Mapping> = self
            .mappings
            .iter()
            .filter(|m| m.applies_to(entity_type))
            .collect();

        for (relationship_type, children) in relationships {
            let Some(children) = children.as_array() else {
                continue;
            };

            let records = children
                .iter()
                .filter(|child| child.is_object())
                .map(|child| self.transform_child(&mappings, child))
                .collect::<Result<Vec<_>>>()?;
            transformed.insert(relationship_type.clone(), Value::Array(records));
        }

        Ok(transformed)
    }

    fn transform_child(&self, mappings: &[&Mapping], child: &Value) -> Result<Value> {
        let mut outbound = OutboundRecord::new();
        let scope = Scope::self_context();

        for mapping in mappings {
            let Some(attribute) = mapping.source.attribute_name() else {
                continue;
            };
            let expr = format!("{}.{}.{}", ATTRIBUTES_FIELD, attribute, FIRST_VALUE_PATH);
            if let Some(value) = path::value_at(child, &expr) {
                self.setter.set(&mut outbound, mapping, &value, &scope, None, child)?;
            }
        }

        copy_related_to_attributes(child, &mut outbound)?;
        Ok(outbound.into_value())
    }
}

/// Copy of `outbound` with the child arrays attached. `outbound` itself is
/// left untouched, so a failure attaches nothing.
pub fn attach(outbound: &OutboundRecord, relationships: Map<String, Value>) -> Result<OutboundRecord> {
    let mut attached = outbound.clone();
    for (relationship_type, children) in relationships {
        let destination = format!("{}.{}", LOWER_LEVEL_PATH, relationship_type);
        attached.write(&destination, children, Owner::Relationships)?;
    }
    Ok(attached)
}

/// Copy `relTo.data.attributes.<k>.values[0].value` onto key `<k>`,
/// replacing what a mapping wrote there
fn copy_related_to_attributes(child: &Value, outbound: &mut OutboundRecord) -> Result<()> {
    let empty = Map::new();
    let attributes = path::find_object(child, RELATED_TO_ATTRIBUTES_PATH).unwrap_or(&empty);

    for (key, attribute) in attributes {
        if let Some(value) = path::value_at(attribute, FIRST_VALUE_PATH) {
            outbound.overwrite(key, Value::String(value), Owner::RelatedTo)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingDiagnostics;
    use crate::mapping::{compile_mappings, FieldMapping};
    use serde_json::json;

    fn relationship_mappings() -> Vec<Mapping> {
        compile_mappings(&[
            FieldMapping::new("product", "@attr(netContent)", "netContent", "string"),
            FieldMapping::new("product", "@relAttr(isChildOf.quantity)", "quantityOfChildren", "string"),
            FieldMapping::new("product", "@relToAttr(hasChild.gtin)", "gtin", "string"),
            FieldMapping::new("product", "data.id", "id", "string"),
            FieldMapping::new("sku", "@attr(netContent)", "skuContent", "string"),
            FieldMapping::new("product", "@attr(netContent)", "hiddenContent", "string").disabled(),
        ])
        .unwrap()
    }

    fn run(inbound: &Value) -> Value {
        let mappings = relationship_mappings();
        let sink = CollectingDiagnostics::new();
        let transformer = RelationshipTransformer::new(&mappings, ValueSetter::new("|", &sink));
        let relationships = transformer.transform("product", inbound).unwrap();
        attach(&OutboundRecord::new(), relationships).unwrap().into_value()
    }

    #[test]
    fn test_child_gets_attributes_and_related_to_attributes() {
        let inbound = json!({
            "type": "product",
            "data": {"searchRelationships": {"hasChild": [{
                "attributes": {
                    "netContent": {"values": [{"value": "500"}, {"value": "750"}]},
                    "quantity": {"values": [{"value": "6"}]},
                    "gtin": {"values": [{"value": "0001"}]}
                },
                "data": {"id": "REL-1"},
                "relTo": {"data": {"attributes": {"itemId": {"values": [{"value": "SKU-1"}]}}}}
            }]}}
        });

        assert_eq!(
            run(&inbound),
            json!({"nextLowerLevelTradeItemInformation": {"hasChild": [
                {"netContent": "500", "quantityOfChildren": "6", "gtin": "0001", "itemId": "SKU-1"}
            ]}})
        );
    }

    #[test]
    fn test_each_relationship_type_gets_its_array() {
        let inbound = json!({
            "data": {"searchRelationships": {
                "hasChild": [
                    {"attributes": {"netContent": {"values": [{"value": "1"}]}}},
                    {"attributes": {}},
                    "not a child"
                ],
                "isChildOf": [{"relTo": {"data": {"attributes": {"itemId": {"values": [{"value": "P-0"}]}}}}}],
                "broken": {"attributes": {}}
            }}
        });

        assert_eq!(
            run(&inbound),
            json!({"nextLowerLevelTradeItemInformation": {
                "hasChild": [{"netContent": "1"}, {}],
                "isChildOf": [{"itemId": "P-0"}]
            }})
        );
    }

    #[test]
    fn test_absent_or_malformed_block_is_noop() {
        assert_eq!(run(&json!({"type": "product"})), json!({}));
        assert_eq!(run(&json!({"data": {"searchRelationships": "nope"}})), json!({}));
        assert_eq!(run(&json!({"data": {"searchRelationships": []}})), json!({}));
    }

    #[test]
    fn test_related_to_attribute_wins_over_mapping() {
        let mappings = compile_mappings(&[FieldMapping::new("product", "@attr(code)", "itemId", "string")]).unwrap();
        let sink = CollectingDiagnostics::new();
        let transformer = RelationshipTransformer::new(&mappings, ValueSetter::new("|", &sink));
        let inbound = json!({"data": {"searchRelationships": {"hasChild": [{
            "attributes": {"code": {"values": [{"value": "OWN"}]}},
            "relTo": {"data": {"attributes": {"itemId": {"values": [{"value": "REL"}]}}}}
        }]}}});

        let relationships = transformer.transform("product", &inbound).unwrap();
        assert_eq!(Value::Object(relationships), json!({"hasChild": [{"itemId": "REL"}]}));
    }

    #[test]
    fn test_without_mappings_nothing_runs() {
        let sink = CollectingDiagnostics::new();
        let transformer = RelationshipTransformer::new(&[], ValueSetter::new("|", &sink));
        let inbound = json!({"data": {"searchRelationships": {"hasChild": [{}]}}});

        assert!(transformer.transform("product", &inbound).unwrap().is_empty());
    }

    #[test]
    fn test_failing_child_fails_the_whole_pass() {
        let mappings = compile_mappings(&[
            FieldMapping::new("product", "@attr(x)", "x", "string"),
            FieldMapping::new("product", "@attr(y)", "x.y", "string"),
        ])
        .unwrap();
        let sink = CollectingDiagnostics::new();
        let transformer = RelationshipTransformer::new(&mappings, ValueSetter::new("|", &sink));
        let inbound = json!({"data": {"searchRelationships": {
            "a": [{"attributes": {"y": {"values": [{"value": "1"}]}}}],
            "b": [{"attributes": {"x": {"values": [{"value": "flat"}]}, "y": {"values": [{"value": "2"}]}}}]
        }}});

        assert!(transformer.transform("product", &inbound).is_err());
    }

    #[test]
    fn test_attach_conflict_leaves_outbound_untouched() {
        let mut outbound = OutboundRecord::new();
        outbound
            .write_str(LOWER_LEVEL_PATH, "flat", Owner::Field(0))
            .unwrap();
        let relationships = Map::from_iter([("hasChild".to_string(), json!([{}]))]);

        assert!(attach(&outbound, relationships).is_err());
        assert_eq!(outbound.into_value(), json!({"nextLowerLevelTradeItemInformation": "flat"}));
    }
}
