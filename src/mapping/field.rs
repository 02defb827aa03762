//! Field expression macros
//!
//! Mapping sources and destinations are either plain paths or one of:
//!
//! - `@attr(name)`: value of an entity attribute
//! - `@relAttr(relationship.attribute)`: attribute of a relationship
//! - `@relToAttr(relationship.attribute)`: attribute of the related entity
//! - `@path(literal)`: literal path override, mostly for destinations
//!
//! Expressions are parsed once when mappings are compiled.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static ATTRIBUTE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^@attr\(([^()]+)\)$").unwrap()
});

static RELATIONSHIP_ATTRIBUTE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^@relattr\((?:([^().]+)\.)?([^().]+)\)$").unwrap()
});

static RELATED_TO_ATTRIBUTE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^@reltoattr\((?:([^().]+)\.)?([^().]+)\)$").unwrap()
});

const PATH_MACRO: &str = "@path";

/// Occurrence placeholder in path templates
pub const INDEX_PLACEHOLDER: &str = "%d";

/// Destination context placeholder in destination templates
pub const CONTEXT_PLACEHOLDER: &str = "{context}";

pub fn is_attribute_ref(field: &str) -> bool {
    ATTRIBUTE_REGEX.is_match(field)
}

pub fn attribute_name(field: &str) -> Option<String> {
    ATTRIBUTE_REGEX
        .captures(field)
        .map(|caps| caps[1].trim().to_string())
}

pub fn is_relationship_attribute_ref(field: &str) -> bool {
    RELATIONSHIP_ATTRIBUTE_REGEX.is_match(field)
}

pub fn is_related_to_attribute_ref(field: &str) -> bool {
    RELATED_TO_ATTRIBUTE_REGEX.is_match(field)
}

/// Decoded arguments of `@relAttr(...)` / `@relToAttr(...)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipAttribute {
    pub relationship: Option<String>,
    pub attribute: String,
}

/// Decode either relationship macro form
pub fn relationship_attribute(field: &str) -> Option<RelationshipAttribute> {
    RELATIONSHIP_ATTRIBUTE_REGEX
        .captures(field)
        .or_else(|| RELATED_TO_ATTRIBUTE_REGEX.captures(field))
        .map(|caps| RelationshipAttribute {
            relationship: caps.get(1).map(|m| m.as_str().trim().to_string()),
            attribute: caps[2].trim().to_string(),
        })
}

pub fn is_path_ref(field: &str) -> bool {
    field.starts_with(PATH_MACRO)
}

/// Unwrap `@path(literal)`. Anything that is not a well-formed override,
/// including one missing its closing parenthesis, comes back unchanged.
pub fn path_value(field: &str) -> &str {
    field
        .strip_prefix(PATH_MACRO)
        .and_then(|rest| rest.strip_prefix('('))
        .and_then(|rest| rest.rfind(')').map(|end| &rest[..end]))
        .unwrap_or(field)
}

/// Replace every occurrence placeholder with `index`
pub fn fill_index(template: &str, index: usize) -> String {
    template.replace(INDEX_PLACEHOLDER, &index.to_string())
}

/// Where a mapping reads its value from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceField {
    /// Record path, optionally with a `[%d]` occurrence placeholder
    Path(String),
    Attribute(String),
    RelationshipAttribute(RelationshipAttribute),
    RelatedToAttribute(RelationshipAttribute),
}

impl SourceField {
    pub fn parse(field: &str) -> Self {
        if let Some(name) = attribute_name(field) {
            return SourceField::Attribute(name);
        }

        if let Some(decoded) = relationship_attribute(field) {
            return if is_related_to_attribute_ref(field) {
                SourceField::RelatedToAttribute(decoded)
            } else {
                SourceField::RelationshipAttribute(decoded)
            };
        }

        SourceField::Path(path_value(field).to_string())
    }

    /// Attribute read from a relationship child, for the macro forms
    pub fn attribute_name(&self) -> Option<&str> {
        match self {
            SourceField::Attribute(name) => Some(name),
            SourceField::RelationshipAttribute(decoded)
            | SourceField::RelatedToAttribute(decoded) => Some(&decoded.attribute),
            SourceField::Path(_) => None,
        }
    }
}

/// Where a mapping writes its value to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationField {
    template: String,
    literal: bool,
}

impl DestinationField {
    pub fn parse(field: &str) -> Self {
        if is_path_ref(field) {
            DestinationField {
                template: path_value(field).to_string(),
                literal: true,
            }
        } else {
            DestinationField {
                template: field.to_string(),
                literal: false,
            }
        }
    }

    pub fn is_literal(&self) -> bool {
        self.literal
    }

    /// Concrete destination for one occurrence.
    ///
    /// `indexed` fills the occurrence placeholder. A template that names the
    /// destination context resolves to `None` outside of a context, as does
    /// an empty template.
    pub fn resolve(&self, index: usize, indexed: bool, context: Option<&str>) -> Option<String> {
        let field = if indexed {
            fill_index(&self.template, index)
        } else {
            self.template.clone()
        };

        if field.contains(CONTEXT_PLACEHOLDER) {
            return context
                .filter(|key| !key.is_empty())
                .map(|key| field.replace(CONTEXT_PLACEHOLDER, key));
        }

        (!field.is_empty()).then_some(field)
    }
}

impl fmt::Display for DestinationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.literal {
            write!(f, "{}({})", PATH_MACRO, self.template)
        } else {
            write!(f, "{}", self.template)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_macro() {
        assert!(is_attribute_ref("@attr(color)"));
        assert!(is_attribute_ref("@ATTR(color)"));
        assert!(!is_attribute_ref("attributes.color"));
        assert_eq!(attribute_name("@attr(netContent)"), Some("netContent".to_string()));
        assert_eq!(attribute_name("@relAttr(netContent)"), None);
    }

    #[test]
    fn test_relationship_macros() {
        assert!(is_relationship_attribute_ref("@relAttr(isChildOf.quantity)"));
        assert!(!is_relationship_attribute_ref("@relToAttr(isChildOf.gtin)"));
        assert!(is_related_to_attribute_ref("@relToAttr(isChildOf.gtin)"));

        assert_eq!(
            relationship_attribute("@relAttr(isChildOf.quantity)"),
            Some(RelationshipAttribute {
                relationship: Some("isChildOf".to_string()),
                attribute: "quantity".to_string(),
            })
        );
        assert_eq!(
            relationship_attribute("@relToAttr(gtin)"),
            Some(RelationshipAttribute {
                relationship: None,
                attribute: "gtin".to_string(),
            })
        );
    }

    #[test]
    fn test_path_override() {
        assert!(is_path_ref("@path(tradeItem.names[%d])"));
        assert!(!is_path_ref("@Path(tradeItem.name)"));
        assert!(!is_path_ref("@pat"));
        assert_eq!(path_value("@path(tradeItem.names[%d])"), "tradeItem.names[%d]");
        assert_eq!(path_value("tradeItem.name"), "tradeItem.name");
        // no closing parenthesis: tolerated, returned unchanged
        assert_eq!(path_value("@path(tradeItem.name"), "@path(tradeItem.name");
        assert_eq!(path_value("@path)"), "@path)");
        assert_eq!(path_value("@pathé)"), "@pathé)");
        assert_eq!(path_value("@path(prix.é)"), "prix.é");
        assert_eq!(DestinationField::parse("@pathé)").resolve(0, false, None), Some("@pathé)".to_string()));
    }

    #[test]
    fn test_source_field_parse() {
        assert_eq!(
            SourceField::parse("@attr(color)"),
            SourceField::Attribute("color".to_string())
        );
        assert!(matches!(
            SourceField::parse("@relToAttr(isChildOf.gtin)"),
            SourceField::RelatedToAttribute(_)
        ));
        assert!(matches!(
            SourceField::parse("@relAttr(isChildOf.quantity)"),
            SourceField::RelationshipAttribute(_)
        ));
        assert_eq!(
            SourceField::parse("@path(data.id)"),
            SourceField::Path("data.id".to_string())
        );
        assert_eq!(SourceField::parse("id"), SourceField::Path("id".to_string()));
        assert_eq!(SourceField::parse("id").attribute_name(), None);
    }

    #[test]
    fn test_destination_resolve() {
        let names = DestinationField::parse("@path(names[%d].value)");
        assert!(names.is_literal());
        assert_eq!(names.resolve(2, true, None), Some("names[2].value".to_string()));
        assert_eq!(names.resolve(2, false, None), Some("names[%d].value".to_string()));

        let market = DestinationField::parse("targetMarket.{context}.price");
        assert_eq!(market.resolve(0, false, Some("840")), Some("targetMarket.840.price".to_string()));
        assert_eq!(market.resolve(0, false, None), None);

        assert_eq!(DestinationField::parse("@path()").resolve(0, true, None), None);
    }
}
