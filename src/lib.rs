//! # GDSN Transform - Mapping-driven record transformation
//!
//! Transforms hierarchical attribute-value records into the shape of another
//! schema, driven by a declarative list of field mappings.
//!
//! ## Modules
//!
//! - **mapping**: Transform profile configuration and compiled field mappings
//! - **context**: Discovery of context partitions (markets, locales) in a record
//! - **transform**: Value getter and setter, the record transformer and the
//!   relationship pass
//! - **record**: Path expressions and the outbound record
//!
//! ## Quick Start
//!
//! ```rust
//! use gdsn_transform::{FieldMapping, GdsnTransformer, TenantSettings, TransformProfile};
//! use serde_json::json;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut profile = TransformProfile::from_json_str(
//!     r#"{"transform": {"settings": {"collectionSeparator": "|"}}}"#,
//! )?;
//! profile.transform.field_map = vec![
//!     FieldMapping::new("product", "@attr(color)", "color", "string"),
//!     FieldMapping::new("product", "@attr(netWeight)", "netWeight", "hasUOM"),
//! ];
//!
//! let transformer = GdsnTransformer::new(&profile, &TenantSettings::new("_"))?;
//! let output = transformer.transform(&json!({
//!     "type": "product",
//!     "attributes": {
//!         "color": {"values": [{"value": "Red"}]},
//!         "netWeight": {"values": [{"value": "5", "uom": "KGM"}]}
//!     }
//! }))?;
//!
//! assert_eq!(output, json!({
//!     "color": "Red",
//!     "netWeight": {"__value__": "5", "measurementUnitCode": "KGM"}
//! }));
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use serde_json::Value;
use std::io::{BufRead, Write};

pub mod context;
pub mod diagnostics;
pub mod error;
pub mod mapping;
pub mod record;
pub mod transform;

// Re-export commonly used types for convenience
pub use context::{ContextDiscovery, ContextMapping, ContextRegion, EmbeddedContexts};
pub use diagnostics::{CollectingDiagnostics, Diagnostics, TracingDiagnostics};
pub use error::{PathError, TransformError};
pub use mapping::{FieldMapping, TenantSettings, TransformProfile};
pub use transform::GdsnTransformer;

/// Transform a stream of newline-delimited records, writing one output
/// record per line. Blank lines are skipped. Returns the number of records
/// written.
pub fn transform_json<R: BufRead, W: Write>(
    reader: R,
    writer: &mut W,
    transformer: &GdsnTransformer,
) -> Result<usize> {
    let mut count = 0;

    for (number, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read line")?;
        if line.trim().is_empty() {
            continue;
        }

        let value: Value = serde_json::from_str(&line)
            .with_context(|| format!("Failed to parse JSON on line {}", number + 1))?;
        let output = transformer
            .transform(&value)
            .with_context(|| format!("Failed to transform record on line {}", number + 1))?;

        serde_json::to_writer(&mut *writer, &output).context("Failed to write record")?;
        writer.write_all(b"\n")?;
        count += 1;
    }

    Ok(count)
}
