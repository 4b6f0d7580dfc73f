//! Check JSON values against compiled nodes.
//!
//! Walks the value, not the schema, so recursive schemas need no cycle guard.
//! Violations carry a JSON pointer into the value.
use serde_json::{Map, Value};

use crate::compiler::CompiledModel;
use crate::error::{CompileError, Result};
use crate::ir::{NodeRef, SchemaNode, StringFormat};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "{path}: {}", self.message)
    }
}

/// `document` shapes compile to plain strings, so a document value must be a
/// JSON string here; objects, arrays and numbers are reported as violations.
pub fn validate(model: &CompiledModel, root: NodeRef, value: &Value) -> Vec<Violation> {
    let mut v = Validator { model, out: Vec::new() };
    v.check(root, value, "");
    v.out
}

pub fn validate_shape(model: &CompiledModel, id: &str, value: &Value) -> Result<Vec<Violation>> {
    let root = model.get(id).ok_or_else(|| CompileError::ShapeNotFound(id.to_string()))?;
    Ok(validate(model, root, value))
}

struct Validator<'a> {
    model: &'a CompiledModel,
    out: Vec<Violation>,
}

impl Validator<'_> {
    fn fail(&mut self, path: &str, message: impl Into<String>) {
        self.out.push(Violation { path: path.to_string(), message: message.into() });
    }

    fn check(&mut self, node: NodeRef, value: &Value, path: &str) {
        match self.model.node(node) {
            SchemaNode::Forward(_) | SchemaNode::Empty => {}
            SchemaNode::Primitive(_) => {
                if !value.is_boolean() {
                    self.fail(path, format!("expected boolean, got {}", kind_of(value)));
                }
            }
            SchemaNode::String { pattern, min_len, max_len, format } => {
                let Some(s) = value.as_str() else {
                    return self.fail(path, format!("expected string, got {}", kind_of(value)));
                };
                // length counts Unicode scalar values
                let len = s.chars().count() as u64;
                if let Some(min) = min_len.filter(|min| len < *min) {
                    self.fail(path, format!("length {len} is below minimum {min}"));
                }
                if let Some(max) = max_len.filter(|max| len > *max) {
                    self.fail(path, format!("length {len} exceeds maximum {max}"));
                }
                if let Some(p) = pattern.as_ref().filter(|p| !p.is_match(s)) {
                    self.fail(path, format!("does not match pattern `{}`", p.source()));
                }
                if *format == Some(StringFormat::DateTime)
                    && chrono::DateTime::parse_from_rfc3339(s).is_err()
                {
                    self.fail(path, format!("`{s}` is not an RFC 3339 date-time"));
                }
            }
            SchemaNode::Number { is_integer, min, max } => {
                let Some(n) = value.as_f64() else {
                    return self.fail(path, format!("expected number, got {}", kind_of(value)));
                };
                if *is_integer && !(value.is_i64() || value.is_u64() || n.fract() == 0.0) {
                    self.fail(path, format!("expected integer, got {n}"));
                }
                if let Some(min) = min.filter(|min| n < min.0) {
                    self.fail(path, format!("{n} is below minimum {}", min.0));
                }
                if let Some(max) = max.filter(|max| n > max.0) {
                    self.fail(path, format!("{n} exceeds maximum {}", max.0));
                }
            }
            SchemaNode::Array { element, min_len, max_len } => {
                let Some(items) = value.as_array() else {
                    return self.fail(path, format!("expected array, got {}", kind_of(value)));
                };
                let len = items.len() as u64;
                if let Some(min) = min_len.filter(|min| len < *min) {
                    self.fail(path, format!("{len} items is below minimum {min}"));
                }
                if let Some(max) = max_len.filter(|max| len > *max) {
                    self.fail(path, format!("{len} items exceeds maximum {max}"));
                }
                let element = *element;
                for (i, item) in items.iter().enumerate() {
                    self.check(element, item, &format!("{path}/{i}"));
                }
            }
            SchemaNode::Object { members } => {
                let Some(obj) = value.as_object() else {
                    return self.fail(path, format!("expected object, got {}", kind_of(value)));
                };
                for (name, member) in members {
                    let child = format!("{path}/{}", escape(name));
                    match obj.get(name) {
                        None | Some(Value::Null) if member.required => {
                            self.fail(&child, "missing required member");
                        }
                        None | Some(Value::Null) => {}
                        Some(v) => self.check(member.node, v, &child),
                    }
                }
            }
            SchemaNode::Dictionary { key, value: value_node } => {
                let Some(obj) = value.as_object() else {
                    return self.fail(path, format!("expected object, got {}", kind_of(value)));
                };
                let (key, value_node) = (*key, *value_node);
                for (k, v) in obj {
                    let child = format!("{path}/{}", escape(k));
                    self.check(key, &Value::String(k.clone()), &child);
                    self.check(value_node, v, &child);
                }
            }
            SchemaNode::Enumeration { values } => match value.as_str() {
                Some(s) if values.iter().any(|allowed| allowed == s) => {}
                Some(s) => self.fail(path, format!("`{s}` is not one of {values:?}")),
                None => self.fail(path, format!("expected string, got {}", kind_of(value))),
            },
            SchemaNode::Union { alternatives } => {
                let Some(obj) = value.as_object() else {
                    return self.fail(path, format!("expected union object, got {}", kind_of(value)));
                };
                let set = set_members(obj);
                let [(tag, inner)] = set.as_slice() else {
                    return self.fail(path, format!("expected exactly one union member, found {}", set.len()));
                };
                match alternatives.iter().find(|alt| alt.name == **tag) {
                    Some(alt) => {
                        let node = alt.node;
                        self.check(node, inner, &format!("{path}/{}", escape(tag)));
                    }
                    None => self.fail(path, format!("unknown union member `{tag}`")),
                }
            }
        }
    }
}

fn set_members(obj: &Map<String, Value>) -> Vec<(&String, &Value)> {
    obj.iter().filter(|(_, v)| !v.is_null()).collect()
}

fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
