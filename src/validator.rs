//! JsonValidator (C9): post-generation validation against a [`SchemaModel`],
//! with edit-distance-1 "key snapping" for near-miss keys (spec §4.7, §8
//! scenario 5). Runs the pipeline: locate the first top-level JSON object or
//! array in the generated text, parse it, snap unrecognized keys onto known
//! ones when unambiguous, enforce `required`/extra-key rules, and recurse
//! into nested object/array schemas.

use std::collections::BTreeSet;

use serde_json::Value;
use thiserror::Error;

use crate::schema::{SchemaModel, SchemaNode, SchemaNodeId};

/// One schema violation found while validating a value against a node.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{path}: {kind}")]
pub struct Violation {
    pub path: String,
    pub kind: ViolationKind,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViolationKind {
    #[error("missing required key {0:?}")]
    MissingRequired(String),
    #[error("unrecognized key {0:?}")]
    UnknownKey(String),
    #[error("expected {expected}, found {found}")]
    TypeMismatch { expected: &'static str, found: &'static str },
    #[error("value is not one of the allowed enum values")]
    NotInEnum,
}

/// Raised when validation fails after key snapping and recursion (spec §7).
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    pub path: String,
    pub violations: Vec<Violation>,
}

/// Maximum Levenshtein distance accepted for key snapping (spec §4.7: "edit
/// distance 1").
const MAX_SNAP_DISTANCE: usize = 1;

pub struct JsonValidator<'a> {
    model: &'a SchemaModel,
    allow_extra_keys: bool,
    enable_key_snap: bool,
}

impl<'a> JsonValidator<'a> {
    pub fn new(model: &'a SchemaModel, allow_extra_keys: bool, enable_key_snap: bool) -> Self {
        Self {
            model,
            allow_extra_keys,
            enable_key_snap,
        }
    }

    /// Locate the first top-level JSON object or array substring in `text`,
    /// parse it, repair recognizable key typos, and validate the result
    /// against the schema's root node.
    pub fn validate(&self, text: &str) -> Result<Value, ValidationError> {
        let located = locate_first_container(text).ok_or_else(|| ValidationError {
            message: "no JSON object or array found in generated text".to_string(),
            path: "$".to_string(),
            violations: Vec::new(),
        })?;

        let mut value: Value = serde_json::from_str(located).map_err(|e| ValidationError {
            message: format!("generated text is not valid JSON: {e}"),
            path: "$".to_string(),
            violations: Vec::new(),
        })?;

        if self.enable_key_snap {
            snap_keys(&mut value, self.model, self.model.root());
        }

        let mut violations = Vec::new();
        check_node(&value, self.model, self.model.root(), "$", self.allow_extra_keys, &mut violations);

        if violations.is_empty() {
            Ok(value)
        } else {
            Err(ValidationError {
                message: format!("{} schema violation(s)", violations.len()),
                path: "$".to_string(),
                violations,
            })
        }
    }
}

/// Find the first balanced `{...}` or `[...]` substring, preferring whichever
/// opens first. Models often wrap JSON in prose or code fences; this skips
/// past that without requiring the caller to strip it first.
fn locate_first_container(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = bytes
        .iter()
        .position(|&b| b == b'{' || b == b'[')?;

    let open = bytes[start];
    let close = if open == b'{' { b'}' } else { b']' };

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b if b == open => depth += 1,
            b if b == close => {
                depth -= 1;
                if depth == 0 {
                    return text.get(start..=i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Recursively snap unrecognized object keys onto the nearest known property
/// name when exactly one known key is within [`MAX_SNAP_DISTANCE`].
fn snap_keys(value: &mut Value, model: &SchemaModel, id: SchemaNodeId) {
    match (value, model.get(id)) {
        (Value::Object(map), SchemaNode::Object { properties, .. }) => {
            let known: Vec<&str> = properties.iter().map(|(k, _)| k.as_str()).collect();
            let renames: Vec<(String, String)> = map
                .keys()
                .filter(|k| !known.contains(&k.as_str()))
                .filter_map(|k| best_snap_candidate(k, &known).map(|snapped| (k.clone(), snapped)))
                .collect();
            for (old, new) in renames {
                if let Some(v) = map.remove(&old) {
                    map.insert(new, v);
                }
            }
            for (key, child_id) in properties {
                if let Some(child_value) = map.get_mut(key) {
                    snap_keys(child_value, model, *child_id);
                }
            }
        }
        (Value::Array(items), SchemaNode::Array { items: Some(item_id), .. }) => {
            for item in items {
                snap_keys(item, model, *item_id);
            }
        }
        _ => {}
    }
}

fn best_snap_candidate(key: &str, known: &[&str]) -> Option<String> {
    known
        .iter()
        .filter_map(|&candidate| {
            let distance = strsim::levenshtein(key, candidate);
            (distance <= MAX_SNAP_DISTANCE).then_some((candidate, distance))
        })
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate.to_string())
}

fn check_node(
    value: &Value,
    model: &SchemaModel,
    id: SchemaNodeId,
    path: &str,
    allow_extra_keys: bool,
    violations: &mut Vec<Violation>,
) {
    if value.is_null() && model.get(id).is_nullable() {
        return;
    }

    match model.get(id) {
        SchemaNode::Object { properties, required, .. } => {
            let Value::Object(map) = value else {
                violations.push(type_mismatch(path, "object", value));
                return;
            };

            for req in required {
                if !map.contains_key(req) {
                    violations.push(Violation {
                        path: format!("{path}.{req}"),
                        kind: ViolationKind::MissingRequired(req.clone()),
                    });
                }
            }

            if !allow_extra_keys {
                let known: BTreeSet<&str> = properties.iter().map(|(k, _)| k.as_str()).collect();
                for key in map.keys() {
                    if !known.contains(key.as_str()) {
                        violations.push(Violation {
                            path: format!("{path}.{key}"),
                            kind: ViolationKind::UnknownKey(key.clone()),
                        });
                    }
                }
            }

            for (key, child_id) in properties {
                if let Some(child_value) = map.get(key) {
                    check_node(
                        child_value,
                        model,
                        *child_id,
                        &format!("{path}.{key}"),
                        allow_extra_keys,
                        violations,
                    );
                }
            }
        }
        SchemaNode::Array { items, .. } => {
            let Value::Array(arr) = value else {
                violations.push(type_mismatch(path, "array", value));
                return;
            };
            if let Some(item_id) = items {
                for (i, item) in arr.iter().enumerate() {
                    check_node(item, model, *item_id, &format!("{path}[{i}]"), allow_extra_keys, violations);
                }
            }
        }
        SchemaNode::String { enum_values, .. } => {
            let Value::String(s) = value else {
                violations.push(type_mismatch(path, "string", value));
                return;
            };
            if let Some(allowed) = enum_values {
                if !allowed.contains(s) {
                    violations.push(Violation {
                        path: path.to_string(),
                        kind: ViolationKind::NotInEnum,
                    });
                }
            }
        }
        SchemaNode::Number { .. } => {
            if !value.is_number() {
                violations.push(type_mismatch(path, "number", value));
            }
        }
        SchemaNode::Boolean { .. } => {
            if !value.is_boolean() {
                violations.push(type_mismatch(path, "boolean", value));
            }
        }
        SchemaNode::Null => {
            if !value.is_null() {
                violations.push(type_mismatch(path, "null", value));
            }
        }
        SchemaNode::Any => {}
    }
}

fn type_mismatch(path: &str, expected: &'static str, found: &Value) -> Violation {
    Violation {
        path: path.to_string(),
        kind: ViolationKind::TypeMismatch {
            expected,
            found: value_kind_name(found),
        },
    }
}

fn value_kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
