//! Mapping engine: value getter and setter, the record transformer that
//! drives them per context, and the relationship pass

pub mod getter;
pub mod relationships;
pub mod setter;
pub mod transformer;

pub use getter::{occurrence_index, SourceTemplate, ValueGetter};
pub use relationships::RelationshipTransformer;
pub use setter::ValueSetter;
pub use transformer::GdsnTransformer;

/// Context a single mapping evaluation runs in
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    /// Source context key, `None` for the self context
    pub source_key: Option<String>,
    /// Path prefix of the context's data in the source record
    pub source_root: Option<String>,
    /// Destination context key after `self` normalization
    pub destination_key: Option<String>,
}

impl Scope {
    /// Unscoped data
    pub fn self_context() -> Self {
        Scope::default()
    }
}
