// Compiled schema nodes. Nodes live in an arena owned by the compiled model;
// everything that points at another shape holds a `NodeRef`, never a copy.

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use regex::Regex;

/// Index into the node arena. Two refs are equal iff they name the same node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(pub(crate) usize);

impl NodeRef {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Boolean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    DateTime, // ISO-8601 / RFC 3339 literal
    Base64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaNode {
    /// Stand-in for a shape whose node is still being built. Never survives a
    /// successful compilation.
    Forward(String),
    Primitive(PrimitiveKind),
    String {
        pattern: Option<Pattern>,
        min_len: Option<u64>,
        max_len: Option<u64>,
        format: Option<StringFormat>,
    },
    Number {
        is_integer: bool,
        min: Option<OrderedFloat<f64>>,
        max: Option<OrderedFloat<f64>>,
    },
    Array {
        element: NodeRef,
        min_len: Option<u64>,
        max_len: Option<u64>,
    },
    Object {
        members: IndexMap<String, MemberRef>, // declaration order
    },
    Dictionary {
        key: NodeRef,
        value: NodeRef,
    },
    Enumeration {
        values: Vec<String>,
    },
    Union {
        alternatives: Vec<Alternative>, // declaration order
    },
    /// service / operation: nothing to validate
    Empty,
}

impl SchemaNode {
    /// Plain unconstrained string.
    pub fn string() -> Self {
        Self::String { pattern: None, min_len: None, max_len: None, format: None }
    }

    /// Nodes that point at other nodes.
    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            Self::Array { .. } | Self::Object { .. } | Self::Dictionary { .. } | Self::Union { .. }
        )
    }

    pub fn children(&self) -> Vec<NodeRef> {
        match self {
            Self::Array { element, .. } => vec![*element],
            Self::Object { members } => members.values().map(|m| m.node).collect(),
            Self::Dictionary { key, value } => vec![*key, *value],
            Self::Union { alternatives } => alternatives.iter().map(|a| a.node).collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberRef {
    pub node: NodeRef,
    pub required: bool, // false → optional variant of the target
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alternative {
    pub name: String, // union member name, i.e. the wire tag
    pub node: NodeRef,
}

/// A `pattern` trait that compiled. Equality is by source text.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn compile(source: &str) -> Result<Self, regex::Error> {
        Ok(Self { source: source.to_string(), regex: Regex::new(source)? })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Unanchored search, same as the model's regex semantics.
    pub fn is_match(&self, haystack: &str) -> bool {
        self.regex.is_match(haystack)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Pattern {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_equality_is_by_source() {
        let a = Pattern::compile("^[a-z]+$").unwrap();
        let b = Pattern::compile("^[a-z]+$").unwrap();
        assert_eq!(a, b);
        assert!(a.is_match("abc"));
        assert!(!a.is_match("ABC"));
    }

    #[test]
    fn lookaround_does_not_compile() {
        assert!(Pattern::compile("^(?!foo).*$").is_err());
    }

    #[test]
    fn children_follow_declaration_order() {
        let node = SchemaNode::Union {
            alternatives: vec![
                Alternative { name: "b".into(), node: NodeRef(2) },
                Alternative { name: "a".into(), node: NodeRef(1) },
            ],
        };
        assert_eq!(node.children(), vec![NodeRef(2), NodeRef(1)]);
        assert!(node.is_aggregate());
        assert!(!SchemaNode::string().is_aggregate());
    }
}
