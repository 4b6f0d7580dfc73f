//! Shape registry: the shape table of one model, keyed by shape id.
//!
//! Declared shapes come first, in document order. Prelude shapes that are
//! referenced but never declared get synthesized on first lookup and appended,
//! so every later lookup sees the same `Arc`.
use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde_json::Value;

use crate::error::{CompileError, Result};
use crate::model::{self, PRELUDE_NAMESPACE, RawModel, Shape, ShapeKind};

/// Prelude local names, lowercased, with `Primitive*` aliases folded in.
static PRELUDE: Lazy<HashMap<&'static str, ShapeKind>> = Lazy::new(|| {
    HashMap::from([
        ("string", ShapeKind::String),
        ("blob", ShapeKind::Blob),
        ("boolean", ShapeKind::Boolean),
        ("byte", ShapeKind::Byte),
        ("short", ShapeKind::Short),
        ("integer", ShapeKind::Integer),
        ("long", ShapeKind::Long),
        ("float", ShapeKind::Float),
        ("double", ShapeKind::Double),
        ("biginteger", ShapeKind::BigInteger),
        ("bigdecimal", ShapeKind::BigDecimal),
        ("timestamp", ShapeKind::Timestamp),
        ("document", ShapeKind::Document),
        ("unit", ShapeKind::Structure),
    ])
});

pub fn builtin_kind(id: &str) -> Option<ShapeKind> {
    let local = id.strip_prefix(PRELUDE_NAMESPACE)?.to_ascii_lowercase();
    let local = local.strip_prefix("primitive").unwrap_or(&local);
    PRELUDE.get(local).cloned()
}

#[derive(Debug, Clone, Default)]
pub struct ShapeRegistry {
    shapes: IndexMap<String, Arc<Shape>>,
    declared: usize,
}

impl ShapeRegistry {
    /// Index the `shapes` mapping of an in-memory document.
    pub fn load(document: &Value) -> Result<Self> {
        Self::from_raw(model::from_value_with_path::<RawModel>(document)?)
    }

    pub fn load_str(src: &str) -> Result<Self> {
        Self::from_raw(model::from_str_with_path::<RawModel>(src)?)
    }

    fn from_raw(raw: RawModel) -> Result<Self> {
        let Some(raw_shapes) = raw.shapes else {
            return Err(CompileError::model_load("document has no `shapes` mapping"));
        };
        let mut shapes = IndexMap::with_capacity(raw_shapes.len());
        for (id, raw_shape) in &raw_shapes {
            shapes.insert(id.clone(), Arc::new(Shape::from_raw(id, raw_shape)?));
        }
        let declared = shapes.len();
        Ok(Self { shapes, declared })
    }

    pub fn resolve(&mut self, id: &str) -> Result<Arc<Shape>> {
        if let Some(shape) = self.shapes.get(id) {
            return Ok(Arc::clone(shape));
        }
        let kind = builtin_kind(id).ok_or_else(|| CompileError::ShapeNotFound(id.to_string()))?;
        tracing::debug!(shape = id, kind = kind.as_str(), "synthesized prelude shape");
        let shape = Arc::new(Shape::synthesized(id, kind));
        self.shapes.insert(id.to_string(), Arc::clone(&shape));
        Ok(shape)
    }

    pub fn get(&self, id: &str) -> Option<&Shape> {
        self.shapes.get(id).map(Arc::as_ref)
    }

    /// Ids from the document itself, in document order.
    pub fn declared_ids(&self) -> impl Iterator<Item = &str> {
        self.shapes.keys().take(self.declared).map(String::as_str)
    }

    pub fn shapes(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.values().map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_shapes_mapping_is_a_load_error() {
        let err = ShapeRegistry::load(&json!({ "smithy": "2.0" })).unwrap_err();
        assert!(matches!(err, CompileError::ModelLoad(_)));
    }

    #[test]
    fn non_object_document_reports_path() {
        let err = ShapeRegistry::load_str(r#"{ "shapes": { "ns#A": { "members": {} } } }"#).unwrap_err();
        let CompileError::ModelLoad(msg) = err else { panic!("expected ModelLoad") };
        assert!(msg.contains("shapes.ns#A"), "{msg}");
    }

    #[test]
    fn prelude_shapes_are_synthesized_once() {
        let mut reg = ShapeRegistry::load(&json!({ "shapes": {} })).unwrap();
        let a = reg.resolve("smithy.api#String").unwrap();
        let b = reg.resolve("smithy.api#String").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.kind, ShapeKind::String);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.declared_ids().count(), 0);
    }

    #[test]
    fn primitive_aliases_and_unit_resolve() {
        assert_eq!(builtin_kind("smithy.api#PrimitiveInteger"), Some(ShapeKind::Integer));
        assert_eq!(builtin_kind("smithy.api#Unit"), Some(ShapeKind::Structure));
        assert_eq!(builtin_kind("smithy.api#Widget"), None);
        assert_eq!(builtin_kind("com.acme#String"), None);
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let mut reg = ShapeRegistry::load(&json!({ "shapes": {} })).unwrap();
        assert_eq!(
            reg.resolve("com.acme#Missing").unwrap_err(),
            CompileError::ShapeNotFound("com.acme#Missing".into())
        );
    }

    #[test]
    fn declared_shapes_keep_document_order() {
        let reg = ShapeRegistry::load(&json!({ "shapes": {
            "ns#Z": { "type": "string" },
            "ns#A": { "type": "integer" }
        }})).unwrap();
        assert_eq!(reg.declared_ids().collect::<Vec<_>>(), vec!["ns#Z", "ns#A"]);
    }
}
