//! JSON Schema emission for compiled nodes.
//!
//! Scalars are inlined. Aggregates that belong to a shape are emitted once
//! under `$defs` and referenced with `$ref`, which is what keeps recursive
//! shapes finite.
use std::collections::HashSet;

use serde_json::{Map, Value, json};

use crate::compiler::CompiledModel;
use crate::ir::{NodeRef, PrimitiveKind, SchemaNode, StringFormat};

/// Standalone schema rooted at `root`, with every aggregate it reaches in `$defs`.
pub fn to_json_schema(model: &CompiledModel, root: NodeRef) -> Value {
    let mut pending = Vec::new();
    let mut doc = render_node(model, model.node(root), &mut pending);
    let defs = drain_defs(model, pending);
    if !defs.is_empty() {
        doc["$defs"] = Value::Object(defs);
    }
    doc
}

/// Every compiled shape under `$defs`, in compilation order.
pub fn model_to_json_schema(model: &CompiledModel) -> Value {
    let mut pending = Vec::new();
    let mut defs = Map::new();
    for (id, node) in model.iter() {
        defs.insert(id.to_string(), render_node(model, model.node(node), &mut pending));
    }
    json!({ "$defs": defs })
}

fn drain_defs(model: &CompiledModel, mut pending: Vec<NodeRef>) -> Map<String, Value> {
    let mut defs = Vec::new();
    let mut done = HashSet::new();
    while let Some(node) = pending.pop() {
        if !done.insert(node) {
            continue;
        }
        let Some(id) = model.shape_id(node) else { continue };
        let body = render_node(model, model.node(node), &mut pending);
        defs.push((id.to_string(), body));
    }
    defs.sort_by(|a, b| a.0.cmp(&b.0));
    defs.into_iter().collect()
}

fn render_ref(model: &CompiledModel, node: NodeRef, pending: &mut Vec<NodeRef>) -> Value {
    let target = model.node(node);
    match model.shape_id(node) {
        Some(id) if target.is_aggregate() => {
            pending.push(node);
            json!({ "$ref": def_pointer(id) })
        }
        _ => render_node(model, target, pending),
    }
}

fn render_node(model: &CompiledModel, node: &SchemaNode, pending: &mut Vec<NodeRef>) -> Value {
    match node {
        SchemaNode::Forward(_) | SchemaNode::Empty => json!({}),
        SchemaNode::Primitive(PrimitiveKind::Boolean) => json!({ "type": "boolean" }),
        SchemaNode::String { pattern, min_len, max_len, format } => {
            let mut o = json!({ "type": "string" });
            if let Some(p) = pattern {
                o["pattern"] = Value::from(p.source());
            }
            if let Some(n) = min_len {
                o["minLength"] = Value::from(*n);
            }
            if let Some(n) = max_len {
                o["maxLength"] = Value::from(*n);
            }
            match format {
                Some(StringFormat::DateTime) => o["format"] = Value::from("date-time"),
                Some(StringFormat::Base64) => o["contentEncoding"] = Value::from("base64"),
                None => {}
            }
            o
        }
        SchemaNode::Number { is_integer, min, max } => {
            let mut o = json!({ "type": if *is_integer { "integer" } else { "number" } });
            if let Some(n) = min {
                o["minimum"] = json_num_pref_i64(n.0);
            }
            if let Some(n) = max {
                o["maximum"] = json_num_pref_i64(n.0);
            }
            o
        }
        SchemaNode::Array { element, min_len, max_len } => {
            let mut o = json!({ "type": "array", "items": render_ref(model, *element, pending) });
            if let Some(n) = min_len {
                o["minItems"] = Value::from(*n);
            }
            if let Some(n) = max_len {
                o["maxItems"] = Value::from(*n);
            }
            o
        }
        SchemaNode::Object { members } => {
            let mut props = Map::new();
            let mut required = Vec::new();
            for (name, member) in members {
                props.insert(name.clone(), render_ref(model, member.node, pending));
                if member.required {
                    required.push(Value::from(name.as_str()));
                }
            }
            let mut o = json!({ "type": "object", "properties": props });
            if !required.is_empty() {
                o["required"] = Value::Array(required);
            }
            o
        }
        SchemaNode::Dictionary { key, value } => json!({
            "type": "object",
            "propertyNames": render_ref(model, *key, pending),
            "additionalProperties": render_ref(model, *value, pending),
        }),
        SchemaNode::Enumeration { values } => json!({ "type": "string", "enum": values }),
        // tagged: exactly one member set, named after the alternative
        SchemaNode::Union { alternatives } => {
            let arms: Vec<Value> = alternatives
                .iter()
                .map(|alt| {
                    json!({
                        "type": "object",
                        "properties": { alt.name.as_str(): render_ref(model, alt.node, pending) },
                        "required": [alt.name.as_str()],
                        "additionalProperties": false,
                    })
                })
                .collect();
            json!({ "oneOf": arms })
        }
    }
}

/// `com.acme#Thing` → `#/$defs/com.acme%23Thing` (JSON pointer, then URI fragment escaping).
fn def_pointer(id: &str) -> String {
    let escaped = id.replace('~', "~0").replace('/', "~1").replace('%', "%25").replace('#', "%23");
    format!("#/$defs/{escaped}")
}

// Helper: prefer emitting integers when exact
fn json_num_pref_i64(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}
