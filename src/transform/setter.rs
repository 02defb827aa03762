//! Writing mapped values into the outbound record

use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::mapping::Mapping;
use crate::record::{OutboundRecord, Owner};
use crate::transform::getter::{ValueGetter, LOCALE_KEY, REFERENCE_DATA_IDENTIFIER_KEY};
use crate::transform::Scope;
use serde_json::Value;

/// Splits a reference-type destination into its value and identifier fields
pub const REFERENCE_FIELD_SEPARATOR: &str = "#@#";

pub const LANGUAGE_CODE_FIELD: &str = "languageCode";
pub const MEASUREMENT_UNIT_CODE_FIELD: &str = "measurementUnitCode";
pub const VALUE_FIELD: &str = "__value__";

/// Projects resolved values onto destination fields
#[derive(Clone, Copy)]
pub struct ValueSetter<'a> {
    getter: ValueGetter<'a>,
    diagnostics: &'a dyn Diagnostics,
}

impl<'a> ValueSetter<'a> {
    pub fn new(separator: &'a str, diagnostics: &'a dyn Diagnostics) -> Self {
        ValueSetter {
            getter: ValueGetter::new(separator),
            diagnostics,
        }
    }

    /// Write `value` for `mapping`.
    ///
    /// Multi-valued mappings split `value` (and `uom`) by the separator and
    /// write each part at its own destination index. Destinations that
    /// resolve empty are skipped.
    pub fn set(
        &self,
        outbound: &mut OutboundRecord,
        mapping: &Mapping,
        value: &str,
        scope: &Scope,
        uom: Option<&str>,
        source: &Value,
    ) -> Result<()> {
        if !mapping.shape.is_multi_valued() {
            if let Some(field) = self.destination_field(mapping, 0, scope) {
                self.set_field_value(outbound, mapping, scope, source, 0, value, &field, uom)?;
            }
            return Ok(());
        }

        let separator = self.getter.separator();
        let units: Option<Vec<&str>> = uom
            .filter(|_| mapping.shape.uom)
            .filter(|units| !units.is_empty())
            .map(|units| units.split(separator).collect());

        let mut index = 0;
        for sub_value in value.split(separator) {
            let Some(field) = self.destination_field(mapping, index, scope) else {
                continue;
            };
            let unit = units.as_ref().and_then(|units| units.get(index).copied());
            self.set_field_value(outbound, mapping, scope, source, index, sub_value, &field, unit)?;
            index += 1;
        }

        Ok(())
    }

    fn destination_field(&self, mapping: &Mapping, index: usize, scope: &Scope) -> Option<String> {
        mapping
            .destination
            .resolve(index, mapping.shape.is_indexed(), scope.destination_key.as_deref())
    }

    #[allow(clippy::too_many_arguments)]
    fn set_field_value(
        &self,
        outbound: &mut OutboundRecord,
        mapping: &Mapping,
        scope: &Scope,
        source: &Value,
        index: usize,
        value: &str,
        field: &str,
        unit: Option<&str>,
    ) -> Result<()> {
        let shape = mapping.shape;

        if shape.reference {
            let parts: Vec<&str> = field.split(REFERENCE_FIELD_SEPARATOR).collect();
            let [value_field, identifier_field] = parts.as_slice() else {
                self.diagnostics.debug(&format!(
                    "reference destination {} does not name two fields",
                    field
                ));
                return Ok(());
            };

            self.write(outbound, mapping, value_field, value)?;
            let identifier = self
                .getter
                .companion(source, mapping, scope, REFERENCE_DATA_IDENTIFIER_KEY, index);
            if let Some(identifier) = identifier {
                self.write(outbound, mapping, identifier_field, &identifier)?;
            }
        } else if shape.localizable {
            if let Some(locale) = self.getter.companion(source, mapping, scope, LOCALE_KEY, index) {
                self.write(outbound, mapping, &format!("{}.{}", field, LANGUAGE_CODE_FIELD), &locale)?;
            }
            self.write(outbound, mapping, &format!("{}.{}", field, VALUE_FIELD), value)?;
        } else if shape.uom {
            if let Some(unit) = unit.filter(|unit| !unit.is_empty()) {
                self.write(outbound, mapping, &format!("{}.{}", field, MEASUREMENT_UNIT_CODE_FIELD), unit)?;
            }
            self.write(outbound, mapping, &format!("{}.{}", field, VALUE_FIELD), value)?;
        } else {
            self.write(outbound, mapping, field, value)?;
        }

        Ok(())
    }

    fn write(&self, outbound: &mut OutboundRecord, mapping: &Mapping, field: &str, value: &str) -> Result<()> {
        if !outbound.write_str(field, value, Owner::Field(mapping.id))? {
            self.diagnostics.debug(&format!(
                "{} already set by another mapping, skipping {}",
                field, mapping.source_expr
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{CollectingDiagnostics, Level};
    use crate::mapping::FieldMapping;
    use serde_json::json;

    fn compile(id: usize, config: FieldMapping) -> Mapping {
        Mapping::compile(id, &config).unwrap()
    }

    fn source() -> Value {
        json!({
            "type": "product",
            "attributes": {
                "names": {"values": [
                    {"value": "Widget", "locale": "en-US"},
                    {"value": "Bidule", "locale": "fr-FR"}
                ]},
                "packaging": {"values": [
                    {"value": "Box", "properties": {"referenceDataIdentifier": "BX"}},
                    {"value": "Pallet"}
                ]}
            }
        })
    }

    #[test]
    fn test_plain_write() {
        let sink = CollectingDiagnostics::new();
        let setter = ValueSetter::new("|", &sink);
        let mut outbound = OutboundRecord::new();
        let color = compile(0, FieldMapping::new("product", "@attr(color)", "tradeItem.color", "string"));

        setter
            .set(&mut outbound, &color, "Red", &Scope::self_context(), None, &source())
            .unwrap();
        assert_eq!(outbound.into_value(), json!({"tradeItem": {"color": "Red"}}));
    }

    #[test]
    fn test_collection_write_per_position() {
        let sink = CollectingDiagnostics::new();
        let setter = ValueSetter::new("|", &sink);
        let mut outbound = OutboundRecord::new();
        let colors = compile(0, FieldMapping::new("product", "@attr(color)", "colors[%d]", "collection"));

        setter
            .set(&mut outbound, &colors, "A|B", &Scope::self_context(), None, &source())
            .unwrap();
        assert_eq!(outbound.into_value(), json!({"colors": ["A", "B"]}));
    }

    #[test]
    fn test_uom_pair() {
        let sink = CollectingDiagnostics::new();
        let setter = ValueSetter::new("|", &sink);
        let mut outbound = OutboundRecord::new();

        let weight = compile(0, FieldMapping::new("product", "@attr(weight)", "netWeight", "hasUOM"));
        setter
            .set(&mut outbound, &weight, "5", &Scope::self_context(), Some("KGM"), &source())
            .unwrap();

        let weights = compile(1, FieldMapping::new("product", "@attr(weights)", "weights[%d]", "collection").with_uom());
        setter
            .set(&mut outbound, &weights, "1|2", &Scope::self_context(), Some("GRM|"), &source())
            .unwrap();

        assert_eq!(
            outbound.into_value(),
            json!({
                "netWeight": {"__value__": "5", "measurementUnitCode": "KGM"},
                "weights": [
                    {"__value__": "1", "measurementUnitCode": "GRM"},
                    {"__value__": "2"}
                ]
            })
        );
    }

    #[test]
    fn test_localizable_pairs_locale() {
        let sink = CollectingDiagnostics::new();
        let setter = ValueSetter::new("|", &sink);
        let mut outbound = OutboundRecord::new();
        let names = compile(0, FieldMapping::new("product", "@attr(names)", "@path(descriptions[%d])", "localizable"));

        setter
            .set(&mut outbound, &names, "Widget|Bidule", &Scope::self_context(), None, &source())
            .unwrap();
        assert_eq!(
            outbound.into_value(),
            json!({"descriptions": [
                {"languageCode": "en-US", "__value__": "Widget"},
                {"languageCode": "fr-FR", "__value__": "Bidule"}
            ]})
        );
    }

    #[test]
    fn test_reference_type_pair() {
        let sink = CollectingDiagnostics::new();
        let setter = ValueSetter::new("|", &sink);
        let mut outbound = OutboundRecord::new();
        let mut config = FieldMapping::new(
            "product",
            "@attr(packaging)",
            "packaging[%d].code#@#packaging[%d].codeList",
            "referenceTypeData",
        );
        config.is_collection = true;
        let packaging = compile(0, config);

        setter
            .set(&mut outbound, &packaging, "Box|Pallet", &Scope::self_context(), None, &source())
            .unwrap();
        assert_eq!(
            outbound.into_value(),
            json!({"packaging": [{"code": "Box", "codeList": "BX"}, {"code": "Pallet"}]})
        );
    }

    #[test]
    fn test_reference_type_needs_two_fields() {
        let sink = CollectingDiagnostics::new();
        let setter = ValueSetter::new("|", &sink);
        let mut outbound = OutboundRecord::new();
        let broken = compile(0, FieldMapping::new("product", "@attr(packaging)", "packaging.code", "referenceTypeData"));

        setter
            .set(&mut outbound, &broken, "Box", &Scope::self_context(), None, &source())
            .unwrap();
        assert_eq!(outbound.into_value(), json!({}));
        assert_eq!(sink.messages(Level::Debug).len(), 1);
    }

    #[test]
    fn test_other_mappings_values_are_kept() {
        let sink = CollectingDiagnostics::new();
        let setter = ValueSetter::new("|", &sink);
        let mut outbound = OutboundRecord::new();
        let first = compile(0, FieldMapping::new("product", "@attr(a)", "name", "string"));
        let second = compile(1, FieldMapping::new("product", "@attr(b)", "name", "string"));

        setter.set(&mut outbound, &first, "A", &Scope::self_context(), None, &source()).unwrap();
        setter.set(&mut outbound, &second, "B", &Scope::self_context(), None, &source()).unwrap();

        assert_eq!(outbound.into_value(), json!({"name": "A"}));
        assert!(sink.messages(Level::Debug)[0].contains("already set"));
    }

    #[test]
    fn test_context_destination() {
        let sink = CollectingDiagnostics::new();
        let setter = ValueSetter::new("|", &sink);
        let mut outbound = OutboundRecord::new();
        let price = compile(0, FieldMapping::new("product", "@attr(price)", "prices.{context}", "string"));
        let scope = Scope {
            source_key: Some("US".to_string()),
            source_root: Some("contexts[0]".to_string()),
            destination_key: Some("840".to_string()),
        };

        setter.set(&mut outbound, &price, "10", &scope, None, &source()).unwrap();
        setter.set(&mut outbound, &price, "9", &Scope::self_context(), None, &source()).unwrap();

        assert_eq!(outbound.into_value(), json!({"prices": {"840": "10"}}));
    }
}
