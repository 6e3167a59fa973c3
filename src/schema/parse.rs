//! Parses the JSON Schema keyword subset spec §6 names (`type`, `properties`,
//! `required`, `items`, `enum`) into a [`SchemaModel`]. Unknown keywords are
//! ignored; `$ref` and unbounded recursion are not supported (spec §1
//! Non-goals).

use std::collections::BTreeSet;

use serde_json::Value;

use crate::error::{EngineError, Result};
use super::{SchemaModel, SchemaNode, SchemaNodeId};

/// Parse a JSON Schema document (already-decoded `serde_json::Value`) into a
/// [`SchemaModel`]. The root is expected to describe an object, but any
/// schema shape is accepted — a non-object root simply yields a model whose
/// root is not an Object node, and callers (C6) degrade to "no constraint".
pub fn parse_schema(schema: &Value) -> Result<SchemaModel> {
    let mut nodes = Vec::new();
    let root = build_node(schema, &mut nodes, 0)?;
    Ok(SchemaModel::new(nodes, root))
}

const MAX_DEPTH: usize = 64;

fn build_node(value: &Value, nodes: &mut Vec<SchemaNode>, depth: usize) -> Result<SchemaNodeId> {
    if depth > MAX_DEPTH {
        return Err(EngineError::SchemaViolation {
            reason: format!("schema nesting exceeds {MAX_DEPTH} levels"),
        });
    }

    let obj = value.as_object();
    let (type_names, nullable) = read_type(obj);

    let node = match type_names.as_deref() {
        Some(["object"]) | None if has_object_shape(obj) => {
            build_object(obj, nodes, depth, nullable)?
        }
        Some(["array"]) => build_array(obj, nodes, depth, nullable)?,
        Some(["string"]) => SchemaNode::String {
            enum_values: read_enum(obj),
            nullable,
        },
        Some(["number"]) | Some(["integer"]) => SchemaNode::Number { nullable },
        Some(["boolean"]) => SchemaNode::Boolean { nullable },
        Some(["null"]) => SchemaNode::Null,
        _ => SchemaNode::Any,
    };

    nodes.push(node);
    Ok(SchemaNodeId((nodes.len() - 1) as u32))
}

fn has_object_shape(obj: Option<&serde_json::Map<String, Value>>) -> bool {
    obj.map(|m| m.contains_key("properties") || m.contains_key("required"))
        .unwrap_or(false)
}

fn build_object(
    obj: Option<&serde_json::Map<String, Value>>,
    nodes: &mut Vec<SchemaNode>,
    depth: usize,
    nullable: bool,
) -> Result<SchemaNode> {
    let mut properties = Vec::new();
    if let Some(obj) = obj {
        if let Some(Value::Object(props)) = obj.get("properties") {
            for (key, child_schema) in props {
                let child_id = build_node(child_schema, nodes, depth + 1)?;
                properties.push((key.clone(), child_id));
            }
        }
    }

    let required: BTreeSet<String> = obj
        .and_then(|o| o.get("required"))
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let known: BTreeSet<&str> = properties.iter().map(|(k, _)| k.as_str()).collect();
    let required: BTreeSet<String> = required
        .into_iter()
        .filter(|r| known.contains(r.as_str()))
        .collect();

    Ok(SchemaNode::Object {
        properties,
        required,
        nullable,
    })
}

fn build_array(
    obj: Option<&serde_json::Map<String, Value>>,
    nodes: &mut Vec<SchemaNode>,
    depth: usize,
    nullable: bool,
) -> Result<SchemaNode> {
    let items = match obj.and_then(|o| o.get("items")) {
        Some(item_schema) => Some(build_node(item_schema, nodes, depth + 1)?),
        None => None,
    };
    Ok(SchemaNode::Array { items, nullable })
}

/// Reads `type`, which may be a string or a list of strings; `"null"` in a
/// list folds into the nullable flag rather than producing a distinct node
/// (spec §6: "`null` is treated as 'or this node may be null'").
fn read_type(obj: Option<&serde_json::Map<String, Value>>) -> (Option<Vec<&str>>, bool) {
    let Some(obj) = obj else {
        return (None, false);
    };
    match obj.get("type") {
        Some(Value::String(s)) => (Some(vec![s.as_str()]), s == "null"),
        Some(Value::Array(arr)) => {
            let names: Vec<&str> = arr.iter().filter_map(Value::as_str).collect();
            let nullable = names.contains(&"null");
            let non_null: Vec<&str> = names.into_iter().filter(|n| *n != "null").collect();
            if non_null.is_empty() {
                (None, nullable)
            } else {
                (Some(non_null), nullable)
            }
        }
        _ => (None, false),
    }
}

fn read_enum(obj: Option<&serde_json::Map<String, Value>>) -> Option<Vec<String>> {
    obj.and_then(|o| o.get("enum"))
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
}
