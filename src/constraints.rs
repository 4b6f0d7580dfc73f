//! Trait → constraint mapping.
//!
//! Stateless. Bounds that contradict themselves are a malformed model and fail
//! hard; a pattern the regex engine cannot compile is dropped and reported back
//! to the caller through [`RejectedPattern`].
use ordered_float::OrderedFloat;

use crate::error::{CompileError, Result};
use crate::ir::Pattern;
use crate::model::{Bounds, Traits};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StringConstraints {
    pub pattern: Option<Pattern>,
    pub min_len: Option<u64>,
    pub max_len: Option<u64>,
    /// Set when the model carried a pattern that did not compile.
    pub rejected_pattern: Option<RejectedPattern>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedPattern {
    pub source: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LengthConstraints {
    pub min: Option<u64>,
    pub max: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NumericConstraints {
    pub min: Option<OrderedFloat<f64>>,
    pub max: Option<OrderedFloat<f64>>,
}

pub fn string_constraints(id: &str, traits: &Traits) -> Result<StringConstraints> {
    let length = length_constraints(id, traits)?;
    let (pattern, rejected_pattern) = match traits.pattern() {
        None => (None, None),
        Some(source) => match Pattern::compile(source) {
            Ok(p) => (Some(p), None),
            Err(err) => (None, Some(RejectedPattern {
                source: source.to_string(),
                reason: err.to_string(),
            })),
        },
    };
    Ok(StringConstraints { pattern, min_len: length.min, max_len: length.max, rejected_pattern })
}

/// `length` trait, shared by strings and lists.
pub fn length_constraints(id: &str, traits: &Traits) -> Result<LengthConstraints> {
    let Some(Bounds { min, max }) = traits.length() else {
        return Ok(LengthConstraints::default());
    };
    let min = min.map(|v| as_length(id, "min", v)).transpose()?;
    let max = max.map(|v| as_length(id, "max", v)).transpose()?;
    if let (Some(lo), Some(hi)) = (min, max) {
        if lo > hi {
            return Err(CompileError::model_load(format!(
                "{id}: length min {lo} exceeds max {hi}"
            )));
        }
    }
    Ok(LengthConstraints { min, max })
}

pub fn numeric_constraints(id: &str, traits: &Traits) -> Result<NumericConstraints> {
    let Some(Bounds { min, max }) = traits.range() else {
        return Ok(NumericConstraints::default());
    };
    if let (Some(lo), Some(hi)) = (min, max) {
        if lo > hi {
            return Err(CompileError::model_load(format!("{id}: range min {lo} exceeds max {hi}")));
        }
    }
    Ok(NumericConstraints { min: min.map(OrderedFloat), max: max.map(OrderedFloat) })
}

pub fn enum_values(traits: &Traits) -> Option<Vec<String>> {
    traits.enum_values().map(<[String]>::to_vec)
}

fn as_length(id: &str, which: &str, v: f64) -> Result<u64> {
    if v < 0.0 || v.fract() != 0.0 || v > u64::MAX as f64 {
        return Err(CompileError::model_load(format!(
            "{id}: length {which} must be a non-negative integer, got {v}"
        )));
    }
    Ok(v as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use serde_json::{Value, json};

    fn traits(v: Value) -> Traits {
        let raw: IndexMap<String, Value> = serde_json::from_value(v).unwrap();
        Traits::parse("ns#T", &raw).unwrap()
    }

    #[test]
    fn string_length_bounds() {
        let c = string_constraints("ns#T", &traits(json!({ "length": { "min": 1, "max": 5 } }))).unwrap();
        assert_eq!((c.min_len, c.max_len), (Some(1), Some(5)));
        assert!(c.pattern.is_none());
    }

    #[test]
    fn inverted_length_is_a_model_error() {
        let err = string_constraints("ns#T", &traits(json!({ "length": { "min": 5, "max": 1 } })))
            .unwrap_err();
        assert!(matches!(err, CompileError::ModelLoad(_)));
    }

    #[test]
    fn negative_length_is_a_model_error() {
        let err = length_constraints("ns#T", &traits(json!({ "length": { "min": -1 } }))).unwrap_err();
        assert!(matches!(err, CompileError::ModelLoad(msg) if msg.contains("non-negative")));
    }

    #[test]
    fn uncompilable_pattern_is_dropped_not_fatal() {
        let c = string_constraints(
            "ns#T",
            &traits(json!({ "pattern": "^(?=a)b$", "length": { "max": 3 } })),
        )
        .unwrap();
        assert!(c.pattern.is_none());
        assert_eq!(c.max_len, Some(3));
        assert_eq!(c.rejected_pattern.unwrap().source, "^(?=a)b$");
    }

    #[test]
    fn range_bounds_keep_fractions() {
        let c = numeric_constraints("ns#T", &traits(json!({ "range": { "min": 0.5, "max": 10 } }))).unwrap();
        assert_eq!(c.min, Some(OrderedFloat(0.5)));
        assert_eq!(c.max, Some(OrderedFloat(10.0)));
    }

    #[test]
    fn inverted_range_is_a_model_error() {
        let err = numeric_constraints("ns#T", &traits(json!({ "range": { "min": 3, "max": 2 } })))
            .unwrap_err();
        assert!(matches!(err, CompileError::ModelLoad(_)));
    }

    #[test]
    fn enum_values_absent_without_trait() {
        assert_eq!(enum_values(&traits(json!({ "pattern": "x" }))), None);
        assert_eq!(
            enum_values(&traits(json!({ "enum": [{ "value": "on" }, { "value": "off" }] }))),
            Some(vec!["on".to_string(), "off".to_string()])
        );
    }
}
