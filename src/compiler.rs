//! Shape graph → schema node compiler.
//!
//! One [`SchemaCompiler`] per model. It owns the registry and an arena of
//! nodes; `index` memoizes shape id → node. Before a shape's node is built its
//! arena slot is reserved with a [`SchemaNode::Forward`] placeholder, so a
//! member that leads back to a shape still under construction gets that slot's
//! `NodeRef` instead of recursing again. When the build finishes the slot is
//! overwritten in place, and every ref handed out meanwhile now points at the
//! finished node.
use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::Value;

use crate::constraints;
use crate::error::{CompileError, Result};
use crate::ir::{Alternative, MemberRef, NodeRef, PrimitiveKind, SchemaNode, StringFormat};
use crate::model::{Shape, ShapeKind};
use crate::registry::ShapeRegistry;

/// Something compilation recovered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub shape: String,
    pub message: String,
}

pub struct SchemaCompiler {
    registry: ShapeRegistry,
    nodes: Vec<SchemaNode>,
    index: IndexMap<String, NodeRef>,
    diagnostics: Vec<Diagnostic>,
}

impl SchemaCompiler {
    pub fn new(registry: ShapeRegistry) -> Self {
        let capacity = registry.len();
        Self {
            registry,
            nodes: Vec::with_capacity(capacity),
            index: IndexMap::with_capacity(capacity),
            diagnostics: Vec::new(),
        }
    }

    pub fn registry(&self) -> &ShapeRegistry {
        &self.registry
    }

    pub fn node(&self, node: NodeRef) -> &SchemaNode {
        &self.nodes[node.0]
    }

    pub fn compile(&mut self, id: &str) -> Result<NodeRef> {
        if let Some(&node) = self.index.get(id) {
            return Ok(node);
        }
        let shape = self.registry.resolve(id)?;
        if let ShapeKind::Unsupported(kind) = &shape.kind {
            return Err(CompileError::UnsupportedShape { id: id.to_string(), kind: kind.clone() });
        }
        let mark = (self.nodes.len(), self.index.len(), self.diagnostics.len());
        let slot = self.push(SchemaNode::Forward(id.to_string()));
        self.index.insert(id.to_string(), slot);
        match self.lower(&shape) {
            Ok(node) => {
                self.nodes[slot.0] = node;
                Ok(slot)
            }
            Err(err) => {
                // drop every slot reserved during this descent, placeholder included
                self.nodes.truncate(mark.0);
                self.index.truncate(mark.1);
                self.diagnostics.truncate(mark.2);
                Err(err)
            }
        }
    }

    pub fn finish(self) -> CompiledModel {
        debug_assert!(!self.nodes.iter().any(|n| matches!(n, SchemaNode::Forward(_))));
        let names = self.index.iter().map(|(id, node)| (*node, id.clone())).collect();
        CompiledModel {
            registry: self.registry,
            nodes: self.nodes,
            index: self.index,
            names,
            diagnostics: self.diagnostics,
        }
    }

    fn push(&mut self, node: SchemaNode) -> NodeRef {
        self.nodes.push(node);
        NodeRef(self.nodes.len() - 1)
    }

    fn lower(&mut self, shape: &Shape) -> Result<SchemaNode> {
        let id = shape.id.as_str();
        let node = match &shape.kind {
            ShapeKind::Service | ShapeKind::Operation => SchemaNode::Empty,

            ShapeKind::String | ShapeKind::Document => {
                // enum trait is strictly more specific; pattern/length are discarded
                if let Some(values) = constraints::enum_values(&shape.traits) {
                    return Ok(SchemaNode::Enumeration { values });
                }
                let c = constraints::string_constraints(id, &shape.traits)?;
                if let Some(rejected) = c.rejected_pattern {
                    tracing::warn!(
                        shape = id,
                        pattern = rejected.source.as_str(),
                        "dropping pattern constraint: {}",
                        rejected.reason
                    );
                    self.diagnostics.push(Diagnostic {
                        shape: id.to_string(),
                        message: format!("pattern `{}` dropped: {}", rejected.source, rejected.reason),
                    });
                }
                SchemaNode::String { pattern: c.pattern, min_len: c.min_len, max_len: c.max_len, format: None }
            }

            ShapeKind::Byte
            | ShapeKind::Short
            | ShapeKind::Integer
            | ShapeKind::Long
            | ShapeKind::BigInteger => {
                let c = constraints::numeric_constraints(id, &shape.traits)?;
                SchemaNode::Number { is_integer: true, min: c.min, max: c.max }
            }

            ShapeKind::Float | ShapeKind::Double | ShapeKind::BigDecimal => {
                let c = constraints::numeric_constraints(id, &shape.traits)?;
                SchemaNode::Number { is_integer: false, min: c.min, max: c.max }
            }

            ShapeKind::Boolean => SchemaNode::Primitive(PrimitiveKind::Boolean),

            ShapeKind::Timestamp => SchemaNode::String {
                pattern: None,
                min_len: None,
                max_len: None,
                format: Some(StringFormat::DateTime),
            },

            ShapeKind::Blob => SchemaNode::String {
                pattern: None,
                min_len: None,
                max_len: None,
                format: Some(StringFormat::Base64),
            },

            ShapeKind::Structure | ShapeKind::Resource => {
                let mut members = IndexMap::with_capacity(shape.members.len());
                for (name, member) in &shape.members {
                    let node = self.compile(&member.target)?;
                    members.insert(name.clone(), MemberRef { node, required: member.required });
                }
                SchemaNode::Object { members }
            }

            ShapeKind::List | ShapeKind::Set => {
                let target = shape.element.as_deref().ok_or_else(|| {
                    CompileError::model_load(format!("{id}: list has no `member` target"))
                })?;
                let element = self.compile(target)?;
                let length = constraints::length_constraints(id, &shape.traits)?;
                SchemaNode::Array { element, min_len: length.min, max_len: length.max }
            }

            ShapeKind::Map => {
                let key = match shape.key.as_deref() {
                    Some(target) => self.compile(target)?,
                    None => self.push(SchemaNode::string()),
                };
                let target = shape.value.as_deref().ok_or_else(|| {
                    CompileError::model_load(format!("{id}: map has no `value` target"))
                })?;
                let value = self.compile(target)?;
                SchemaNode::Dictionary { key, value }
            }

            // member names, not their enumValue literals
            ShapeKind::Enum => SchemaNode::Enumeration { values: shape.members.keys().cloned().collect() },

            ShapeKind::Union => {
                let mut alternatives = Vec::with_capacity(shape.members.len());
                for (name, member) in &shape.members {
                    let node = self.compile(&member.target)?;
                    alternatives.push(Alternative { name: name.clone(), node });
                }
                SchemaNode::Union { alternatives }
            }

            ShapeKind::Unsupported(kind) => {
                return Err(CompileError::UnsupportedShape { id: id.to_string(), kind: kind.clone() });
            }
        };
        Ok(node)
    }
}

/// Compile every declared shape of `document`. Any fatal error aborts the
/// whole model.
pub fn compile_model(document: &Value) -> Result<CompiledModel> {
    let registry = ShapeRegistry::load(document)?;
    let ids: Vec<String> = registry.declared_ids().map(str::to_string).collect();
    let mut compiler = SchemaCompiler::new(registry);
    for id in &ids {
        compiler.compile(id)?;
    }
    let model = compiler.finish();
    tracing::info!(
        declared = ids.len(),
        nodes = model.nodes.len(),
        diagnostics = model.diagnostics.len(),
        "compiled model"
    );
    Ok(model)
}

/// Result of one compilation: shape id → node, plus the arena those refs index.
#[derive(Debug, Clone)]
pub struct CompiledModel {
    registry: ShapeRegistry,
    nodes: Vec<SchemaNode>,
    index: IndexMap<String, NodeRef>,
    names: HashMap<NodeRef, String>,
    diagnostics: Vec<Diagnostic>,
}

impl CompiledModel {
    pub fn get(&self, id: &str) -> Option<NodeRef> {
        self.index.get(id).copied()
    }

    pub fn node(&self, node: NodeRef) -> &SchemaNode {
        &self.nodes[node.0]
    }

    pub fn schema(&self, id: &str) -> Option<&SchemaNode> {
        self.get(id).map(|node| self.node(node))
    }

    /// Shape id a node was compiled for; `None` for anonymous nodes.
    pub fn shape_id(&self, node: NodeRef) -> Option<&str> {
        self.names.get(&node).map(String::as_str)
    }

    /// Compiled shape ids, declared shapes first, then synthesized prelude shapes.
    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeRef)> {
        self.index.iter().map(|(id, node)| (id.as_str(), *node))
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn registry(&self) -> &ShapeRegistry {
        &self.registry
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}
