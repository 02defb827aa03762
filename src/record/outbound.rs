use crate::error::PathError;
use crate::record::path::{self, Path};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Who produced a value in the outbound record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Owner {
    /// A field mapping, identified by its position in its mapping list
    Field(usize),
    /// A related-to attribute copied from a relationship child
    RelatedTo,
    /// The array of transformed relationship children
    Relationships,
}

/// Output record built incrementally during one transform.
///
/// Writes are additive: a path already holding a value written by another
/// owner is left untouched, while an owner may rewrite its own paths.
#[derive(Debug, Clone)]
pub struct OutboundRecord {
    root: Value,
    owners: HashMap<String, Owner>,
}

impl OutboundRecord {
    pub fn new() -> Self {
        OutboundRecord {
            root: Value::Object(Map::new()),
            owners: HashMap::new(),
        }
    }

    /// Write `value` at `expr`. Returns `false` when the write was skipped
    /// because another owner already set that path.
    pub fn write(&mut self, expr: &str, value: Value, owner: Owner) -> Result<bool, PathError> {
        let path = Path::parse(expr)?;
        let key = path.to_string();

        match self.owners.get(&key) {
            Some(existing) if *existing != owner => return Ok(false),
            Some(_) => {}
            None => {
                if path::get(&self.root, &path).is_some_and(|current| !current.is_null()) {
                    return Ok(false);
                }
            }
        }

        path::set(&mut self.root, &path, value)?;
        self.owners.insert(key, owner);
        Ok(true)
    }

    /// Write `value` at `expr` whoever held the path before; `owner` takes
    /// it over
    pub fn overwrite(&mut self, expr: &str, value: Value, owner: Owner) -> Result<(), PathError> {
        let path = Path::parse(expr)?;
        path::set(&mut self.root, &path, value)?;
        self.owners.insert(path.to_string(), owner);
        Ok(())
    }

    pub fn write_str(&mut self, expr: &str, value: &str, owner: Owner) -> Result<bool, PathError> {
        self.write(expr, Value::String(value.to_string()), owner)
    }

    pub fn as_value(&self) -> &Value {
        &self.root
    }

    pub fn into_value(self) -> Value {
        self.root
    }
}

impl Default for OutboundRecord {
    fn default() -> Self {
        Self::new()
    }
}
