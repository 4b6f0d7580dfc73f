//! Raw JSON AST of an interface model, and the resolved [`Shape`] view the
//! registry hands to the compiler.
//!
//! The raw layer mirrors the document 1:1 (`serde` + `IndexMap` so member
//! order survives). The resolved layer narrows the open-ended trait map into a
//! closed [`Trait`] set; trait ids the compiler does not understand are dropped
//! here and never seen again.
use indexmap::IndexMap;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{CompileError, Result};

/// Namespace prefix of the built-in prelude (`smithy.api#String`, ...).
pub const PRELUDE_NAMESPACE: &str = "smithy.api#";

// ————————————————————————————————————————————————————————————————————————————
// RAW AST
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Deserialize)]
pub struct RawModel {
    #[serde(default)]
    pub smithy: Option<String>,
    /// Absent mapping is a load error, not an empty model.
    #[serde(default)]
    pub shapes: Option<IndexMap<String, RawShape>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawShape {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub members: IndexMap<String, RawMember>,
    /// list / set element
    #[serde(default)]
    pub member: Option<RawMember>,
    #[serde(default)]
    pub key: Option<RawMember>,
    #[serde(default)]
    pub value: Option<RawMember>,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub traits: IndexMap<String, Value>,
    #[serde(default)]
    pub input: Option<RawTarget>,
    #[serde(default)]
    pub output: Option<RawTarget>,
    #[serde(default)]
    pub operations: Vec<RawTarget>,
    #[serde(default)]
    pub identifiers: IndexMap<String, RawTarget>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMember {
    pub target: String,
    #[serde(default)]
    pub traits: IndexMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTarget {
    pub target: String,
}

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| {
        let path = err.path().to_string();
        CompileError::model_load(format!("at JSON path {path} → {}", err.into_inner()))
    })
}

/// Same as [`from_str_with_path`] for an already-parsed document.
pub fn from_value_with_path<T: DeserializeOwned>(value: &Value) -> Result<T> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(|err| {
        let path = err.path().to_string();
        CompileError::model_load(format!("at JSON path {path} → {}", err.into_inner()))
    })
}

// ————————————————————————————————————————————————————————————————————————————
// SHAPE KINDS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    String,
    Enum,
    Byte,
    Short,
    Integer,
    Long,
    BigInteger,
    Float,
    Double,
    BigDecimal,
    Boolean,
    Timestamp,
    Blob,
    Document,
    List,
    Set,
    Map,
    Structure,
    Resource,
    Union,
    Service,
    Operation,
    /// Anything outside the closed set; compiling it is an error.
    Unsupported(String),
}

impl ShapeKind {
    pub fn parse(tag: &str) -> Self {
        match tag {
            "string" => Self::String,
            "enum" => Self::Enum,
            "byte" => Self::Byte,
            "short" => Self::Short,
            "integer" => Self::Integer,
            "long" => Self::Long,
            "bigInteger" => Self::BigInteger,
            "float" => Self::Float,
            "double" => Self::Double,
            "bigDecimal" => Self::BigDecimal,
            "boolean" => Self::Boolean,
            "timestamp" => Self::Timestamp,
            "blob" => Self::Blob,
            "document" => Self::Document,
            "list" => Self::List,
            "set" => Self::Set,
            "map" => Self::Map,
            "structure" => Self::Structure,
            "resource" => Self::Resource,
            "union" => Self::Union,
            "service" => Self::Service,
            "operation" => Self::Operation,
            other => Self::Unsupported(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Enum => "enum",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Integer => "integer",
            Self::Long => "long",
            Self::BigInteger => "bigInteger",
            Self::Float => "float",
            Self::Double => "double",
            Self::BigDecimal => "bigDecimal",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
            Self::Blob => "blob",
            Self::Document => "document",
            Self::List => "list",
            Self::Set => "set",
            Self::Map => "map",
            Self::Structure => "structure",
            Self::Resource => "resource",
            Self::Union => "union",
            Self::Service => "service",
            Self::Operation => "operation",
            Self::Unsupported(tag) => tag,
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TRAITS
// ————————————————————————————————————————————————————————————————————————————

/// Inclusive bounds as written in the model. Validation (sign, ordering,
/// integrality) happens in `constraints`, not here.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct Bounds {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

/// The traits the compiler understands. Everything else is ignored at parse time.
#[derive(Debug, Clone, PartialEq)]
pub enum Trait {
    Pattern(String),
    Length(Bounds),
    Range(Bounds),
    Enum(Vec<String>),
    Documentation(String),
    Required,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Traits(Vec<Trait>);

impl Traits {
    pub fn parse(owner: &str, raw: &IndexMap<String, Value>) -> Result<Self> {
        let mut out = Vec::new();
        for (name, payload) in raw {
            let Some(local) = trait_local_name(name) else { continue };
            let parsed = match local {
                "pattern" => Trait::Pattern(expect_str(owner, name, payload)?.to_string()),
                "length" => Trait::Length(bounds(owner, name, payload)?),
                "range" => Trait::Range(bounds(owner, name, payload)?),
                "enum" => Trait::Enum(enum_literals(owner, payload)?),
                "documentation" => {
                    Trait::Documentation(expect_str(owner, name, payload)?.to_string())
                }
                "required" => Trait::Required,
                _ => continue,
            };
            out.push(parsed);
        }
        Ok(Self(out))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trait> {
        self.0.iter()
    }

    pub fn pattern(&self) -> Option<&str> {
        self.0.iter().find_map(|t| match t {
            Trait::Pattern(p) => Some(p.as_str()),
            _ => None,
        })
    }

    pub fn length(&self) -> Option<Bounds> {
        self.0.iter().find_map(|t| match t {
            Trait::Length(b) => Some(*b),
            _ => None,
        })
    }

    pub fn range(&self) -> Option<Bounds> {
        self.0.iter().find_map(|t| match t {
            Trait::Range(b) => Some(*b),
            _ => None,
        })
    }

    pub fn enum_values(&self) -> Option<&[String]> {
        self.0.iter().find_map(|t| match t {
            Trait::Enum(values) => Some(values.as_slice()),
            _ => None,
        })
    }

    pub fn documentation(&self) -> Option<&str> {
        self.0.iter().find_map(|t| match t {
            Trait::Documentation(doc) => Some(doc.as_str()),
            _ => None,
        })
    }

    pub fn is_required(&self) -> bool {
        self.0.iter().any(|t| matches!(t, Trait::Required))
    }
}

/// `pattern` and `smithy.api#pattern` are the same trait; `com.acme#pattern` is not.
fn trait_local_name(name: &str) -> Option<&str> {
    match name.strip_prefix(PRELUDE_NAMESPACE) {
        Some(local) => Some(local),
        None if !name.contains('#') => Some(name),
        None => None,
    }
}

fn expect_str<'a>(owner: &str, name: &str, payload: &'a Value) -> Result<&'a str> {
    payload.as_str().ok_or_else(|| {
        CompileError::model_load(format!("{owner}: trait `{name}` expects a string, got {payload}"))
    })
}

fn bounds(owner: &str, name: &str, payload: &Value) -> Result<Bounds> {
    serde_path_to_error::deserialize::<_, Bounds>(payload).map_err(|err| {
        CompileError::model_load(format!("{owner}: trait `{name}`: {}", err.into_inner()))
    })
}

/// Accepts a sequence or a mapping of descriptors; each descriptor is either a
/// bare string or an object with a `value` field. Order is preserved.
fn enum_literals(owner: &str, payload: &Value) -> Result<Vec<String>> {
    let descriptors: Vec<&Value> = match payload {
        Value::Array(xs) => xs.iter().collect(),
        Value::Object(map) => map.values().collect(),
        other => {
            return Err(CompileError::model_load(format!(
                "{owner}: enum trait expects a sequence or mapping, got {other}"
            )));
        }
    };
    descriptors
        .into_iter()
        .map(|d| match d {
            Value::String(s) => Ok(s.clone()),
            Value::Object(o) => o
                .get("value")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    CompileError::model_load(format!(
                        "{owner}: enum descriptor without a string `value`: {d}"
                    ))
                }),
            other => Err(CompileError::model_load(format!(
                "{owner}: unexpected enum descriptor {other}"
            ))),
        })
        .collect()
}

// ————————————————————————————————————————————————————————————————————————————
// RESOLVED SHAPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub target: String,
    pub required: bool,
    pub traits: Traits,
}

/// One IDL entity. Immutable once built; the registry owns it behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub id: String,
    pub kind: ShapeKind,
    pub members: IndexMap<String, Member>, // declaration order
    pub element: Option<String>,
    pub key: Option<String>,
    pub value: Option<String>,
    pub traits: Traits,
    pub input: Option<String>,
    pub output: Option<String>,
    pub operations: Vec<String>,
}

impl Shape {
    pub fn from_raw(id: &str, raw: &RawShape) -> Result<Self> {
        let kind = ShapeKind::parse(&raw.kind);

        if let Some(stray) = raw.required.iter().find(|name| !raw.members.contains_key(*name)) {
            return Err(CompileError::model_load(format!(
                "{id}: required member `{stray}` is not declared"
            )));
        }

        let mut members = IndexMap::with_capacity(raw.members.len() + raw.identifiers.len());
        // resource identifiers are always bound, so they come in required
        for (name, target) in &raw.identifiers {
            members.insert(name.clone(), Member {
                target: target.target.clone(),
                required: true,
                traits: Traits::default(),
            });
        }
        for (name, member) in &raw.members {
            let traits = Traits::parse(&format!("{id}${name}"), &member.traits)?;
            let required = traits.is_required() || raw.required.contains(name);
            members.insert(name.clone(), Member {
                target: member.target.clone(),
                required,
                traits,
            });
        }

        Ok(Self {
            id: id.to_string(),
            kind,
            members,
            element: raw.member.as_ref().map(|m| m.target.clone()),
            key: raw.key.as_ref().map(|m| m.target.clone()),
            value: raw.value.as_ref().map(|m| m.target.clone()),
            traits: Traits::parse(id, &raw.traits)?,
            input: raw.input.as_ref().map(|t| t.target.clone()),
            output: raw.output.as_ref().map(|t| t.target.clone()),
            operations: raw.operations.iter().map(|t| t.target.clone()).collect(),
        })
    }

    /// Minimal definition for a prelude shape: no members, no traits.
    pub fn synthesized(id: &str, kind: ShapeKind) -> Self {
        Self {
            id: id.to_string(),
            kind,
            members: IndexMap::new(),
            element: None,
            key: None,
            value: None,
            traits: Traits::default(),
            input: None,
            output: None,
            operations: Vec::new(),
        }
    }

    /// `com.acme#GetThing` → `GetThing`
    pub fn local_name(&self) -> &str {
        local_name(&self.id)
    }
}

pub fn local_name(id: &str) -> &str {
    id.rsplit_once('#').map_or(id, |(_, name)| name)
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
