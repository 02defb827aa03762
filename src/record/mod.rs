//! JSON record access
//!
//! Inbound records are plain `serde_json::Value` trees read through path
//! expressions; the outbound record tracks which mapping wrote each field.

pub mod outbound;
pub mod path;

pub use outbound::{OutboundRecord, Owner};
pub use path::{Path, Step};

/// Field holding the entity-type discriminator of a record
pub const TYPE_FIELD: &str = "type";
