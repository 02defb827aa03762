//! Reading mapped values out of a source record

use crate::context::ATTRIBUTES_FIELD;
use crate::mapping::{Mapping, SourceField};
use crate::record::path;
use crate::transform::relationships::{RELATED_TO_ATTRIBUTES_PATH, RELATIONSHIPS_PATH};
use crate::transform::Scope;
use serde_json::Value;

/// Key of the primary value inside an attribute value object
pub const VALUE_KEY: &str = "value";
pub const LOCALE_KEY: &str = "locale";
pub const UOM_KEY: &str = "uom";
pub const REFERENCE_DATA_IDENTIFIER_KEY: &str = "properties.referenceDataIdentifier";

/// Occurrence marker accepted in plain source paths
pub const OCCURRENCE_MARKER: &str = "[%d]";

/// Source location of a mapping within one scope: the array holding its
/// occurrences, if any, and the path below each occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTemplate {
    array: Option<String>,
    leaf: String,
}

impl SourceTemplate {
    /// Template reading `key` of each occurrence. `None` when the source
    /// cannot be addressed from a record root (a relationship macro without
    /// a relationship name).
    pub fn new(source: &SourceField, scope: &Scope, key: &str) -> Option<Self> {
        match source {
            SourceField::Attribute(name) => {
                let root = scope
                    .source_root
                    .as_deref()
                    .map(|root| format!("{}.", root))
                    .unwrap_or_default();
                Some(SourceTemplate {
                    array: Some(format!("{}{}.{}.values", root, ATTRIBUTES_FIELD, name)),
                    leaf: key.to_string(),
                })
            }
            SourceField::RelationshipAttribute(decoded) => {
                let relationship = decoded.relationship.as_deref()?;
                Some(SourceTemplate {
                    array: Some(format!(
                        "{}.{}[0].{}.{}.values",
                        RELATIONSHIPS_PATH, relationship, ATTRIBUTES_FIELD, decoded.attribute
                    )),
                    leaf: key.to_string(),
                })
            }
            SourceField::RelatedToAttribute(decoded) => {
                let relationship = decoded.relationship.as_deref()?;
                Some(SourceTemplate {
                    array: Some(format!(
                        "{}.{}[0].{}.{}.values",
                        RELATIONSHIPS_PATH, relationship, RELATED_TO_ATTRIBUTES_PATH, decoded.attribute
                    )),
                    leaf: key.to_string(),
                })
            }
            SourceField::Path(source_path) => Some(Self::from_path(source_path, key)),
        }
    }

    fn from_path(source_path: &str, key: &str) -> Self {
        match source_path.split_once(OCCURRENCE_MARKER) {
            Some((array, rest)) => SourceTemplate {
                array: Some(array.to_string()),
                leaf: sibling(rest.trim_start_matches('.'), key),
            },
            None => SourceTemplate {
                array: None,
                leaf: sibling(source_path, key),
            },
        }
    }

    pub fn array_path(&self) -> Option<&str> {
        self.array.as_deref()
    }

    /// Concrete path of occurrence `index`
    pub fn at(&self, index: usize) -> String {
        match &self.array {
            Some(array) if self.leaf.is_empty() => format!("{}[{}]", array, index),
            Some(array) => format!("{}[{}].{}", array, index, self.leaf),
            None => self.leaf.clone(),
        }
    }
}

/// `key` next to the last segment of `leaf`; the value key is the leaf itself
fn sibling(leaf: &str, key: &str) -> String {
    if key == VALUE_KEY {
        return leaf.to_string();
    }
    match leaf.rsplit_once('.') {
        Some((parent, _)) => format!("{}.{}", parent, key),
        None => key.to_string(),
    }
}

/// Array position to read for the `requested` occurrence.
///
/// Single-valued mappings always read the first match. Multi-valued ones
/// walk the matches until the count reaches `requested + 1`; running off the
/// end yields the array length, which reads as absent. An absent or empty
/// array has no position at all.
pub fn occurrence_index(values: Option<&[Value]>, requested: usize, multi_valued: bool) -> Option<usize> {
    let values = values.filter(|values| !values.is_empty())?;

    let mut match_count = 0;
    for (position, _) in values.iter().enumerate() {
        match_count += 1;
        if !multi_valued || match_count == requested + 1 {
            return Some(position);
        }
    }

    Some(values.len())
}

/// Resolves mapping values from a source record
#[derive(Debug, Clone, Copy)]
pub struct ValueGetter<'a> {
    separator: &'a str,
}

impl<'a> ValueGetter<'a> {
    pub fn new(separator: &'a str) -> Self {
        ValueGetter { separator }
    }

    pub fn separator(&self) -> &'a str {
        self.separator
    }

    /// Value of `mapping` in `scope`.
    ///
    /// Collection and localizable mappings read occurrences 0, 1, 2, ... up
    /// to the first missing one and join them with the separator; the
    /// requested occurrence only matters for other mappings, and there the
    /// index rule reads the first match anyway.
    pub fn get(&self, source: &Value, mapping: &Mapping, scope: &Scope, occurrence: usize) -> Option<String> {
        let template = SourceTemplate::new(&mapping.source, scope, VALUE_KEY)?;

        if !mapping.shape.is_multi_valued() {
            return read_occurrence(source, &template, false, occurrence);
        }

        let values: Vec<String> = (0usize..)
            .map_while(|index| read_occurrence(source, &template, true, index))
            .collect();

        (!values.is_empty()).then(|| values.join(self.separator))
    }

    /// Unit of measure paired with `value`, one per occurrence for
    /// multi-valued mappings. `None` when no occurrence has a unit.
    pub fn uom(&self, source: &Value, mapping: &Mapping, scope: &Scope, value: &str) -> Option<String> {
        let template = SourceTemplate::new(&mapping.source, scope, UOM_KEY)?;
        let multi_valued = mapping.shape.is_multi_valued();
        let count = if multi_valued {
            value.split(self.separator).count()
        } else {
            1
        };

        let units: Vec<String> = (0..count)
            .map(|index| read_occurrence(source, &template, multi_valued, index).unwrap_or_default())
            .collect();

        units
            .iter()
            .any(|unit| !unit.is_empty())
            .then(|| units.join(self.separator))
    }

    /// Sibling value `key` of the occurrence at array position `index`
    pub fn companion(&self, source: &Value, mapping: &Mapping, scope: &Scope, key: &str, index: usize) -> Option<String> {
        let template = SourceTemplate::new(&mapping.source, scope, key)?;
        path::value_at(source, &template.at(index))
    }
}

fn read_occurrence(source: &Value, template: &SourceTemplate, multi_valued: bool, occurrence: usize) -> Option<String> {
    let Some(array) = template.array_path() else {
        // a plain path has a single occurrence
        return if occurrence == 0 || !multi_valued {
            path::value_at(source, &template.at(0))
        } else {
            None
        };
    };

    let index = occurrence_index(path::find_array(source, array), occurrence, multi_valued)?;
    path::value_at(source, &template.at(index))
}
