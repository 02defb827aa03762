//! Dotted, bracket-indexed path expressions over JSON records
//!
//! A path is a `.`-separated list of segments. Each segment is a field name
//! optionally followed by array indexes, e.g. `attributes.color.values[0].value`.

use crate::error::PathError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;

static SEGMENT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^\[\]]+)((?:\[\d+\])*)$").unwrap()
});

static INDEX_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(\d+)\]").unwrap()
});

/// One step of a parsed path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Key(String),
    Index(usize),
}

/// A parsed path expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    steps: Vec<Step>,
}

impl Path {
    pub fn parse(expr: &str) -> Result<Self, PathError> {
        if expr.is_empty() {
            return Err(PathError::Empty);
        }

        let malformed = |segment: &str| PathError::MalformedSegment {
            path: expr.to_string(),
            segment: segment.to_string(),
        };

        let mut steps = Vec::new();
        for segment in expr.split('.') {
            let caps = SEGMENT_REGEX.captures(segment).ok_or_else(|| malformed(segment))?;
            steps.push(Step::Key(caps[1].to_string()));

            for index in INDEX_REGEX.captures_iter(&caps[2]) {
                let position = index[1].parse::<usize>().map_err(|_| malformed(segment))?;
                steps.push(Step::Index(position));
            }
        }

        Ok(Path { steps })
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, step) in self.steps.iter().enumerate() {
            match step {
                Step::Key(key) if position == 0 => write!(f, "{}", key)?,
                Step::Key(key) => write!(f, ".{}", key)?,
                Step::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

/// Look up the node addressed by `path`
pub fn get<'a>(root: &'a Value, path: &Path) -> Option<&'a Value> {
    path.steps.iter().try_fold(root, |current, step| match step {
        Step::Key(key) => current.as_object()?.get(key),
        Step::Index(index) => current.as_array()?.get(*index),
    })
}

/// Parse and look up in one go; an unparsable expression addresses nothing
pub fn value<'a>(root: &'a Value, expr: &str) -> Option<&'a Value> {
    let path = Path::parse(expr).ok()?;
    get(root, &path)
}

pub fn find_array<'a>(root: &'a Value, expr: &str) -> Option<&'a [Value]> {
    value(root, expr)?.as_array().map(Vec::as_slice)
}

pub fn find_object<'a>(root: &'a Value, expr: &str) -> Option<&'a Map<String, Value>> {
    value(root, expr)?.as_object()
}

/// Render a scalar as the string the mapping engine works with.
/// Empty strings, nulls and containers have no scalar value.
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Scalar value at `expr`, if any
pub fn value_at(root: &Value, expr: &str) -> Option<String> {
    value(root, expr).and_then(scalar_string)
}

/// Write `value` at `path`, creating intermediate objects and arrays.
///
/// Arrays are padded with `null`; a `null` met on the way is replaced by the
/// container the next step needs. Walking through any other scalar fails.
pub fn set(root: &mut Value, path: &Path, value: Value) -> Result<(), PathError> {
    let mut current = root;

    for step in &path.steps {
        if current.is_null() {
            *current = match step {
                Step::Key(_) => Value::Object(Map::new()),
                Step::Index(_) => Value::Array(Vec::new()),
            };
        }

        current = match step {
            Step::Key(key) => {
                let Value::Object(map) = current else {
                    return Err(conflict(path, step));
                };
                map.entry(key.clone()).or_insert(Value::Null)
            }
            Step::Index(index) => {
                let Value::Array(items) = current else {
                    return Err(conflict(path, step));
                };
                if items.len() <= *index {
                    items.resize(*index + 1, Value::Null);
                }
                &mut items[*index]
            }
        };
    }

    *current = value;
    Ok(())
}

fn conflict(path: &Path, step: &Step) -> PathError {
    let segment = match step {
        Step::Key(key) => key.clone(),
        Step::Index(index) => format!("[{}]", index),
    };
    PathError::Conflict {
        path: path.to_string(),
        segment,
    }
}
