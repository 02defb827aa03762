//! Field mapping configuration
//!
//! `types` holds the serde view of a transform profile, `field` the macro
//! grammar of field expressions and `compiled` the validated form the
//! engine runs on.

pub mod compiled;
pub mod field;
pub mod types;

pub use compiled::{compile_mappings, Consumption, FieldShape, Mapping, PendingSet, SELF_CONTEXT};
pub use field::{DestinationField, RelationshipAttribute, SourceField};
pub use types::{
    Endpoint, FieldMapping, Format, FormatPair, RelationshipConfig, TenantSettings,
    TransformConfig, TransformProfile, TransformSettings,
};
