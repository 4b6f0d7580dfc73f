//! Operation-facing lookups over a compiled model: request schemas by
//! operation, documentation by shape id, and tool descriptors for a
//! tool-registration layer.
use serde::Serialize;
use serde_json::Value;

use crate::compiler::CompiledModel;
use crate::emit;
use crate::ir::NodeRef;
use crate::model::{Shape, ShapeKind, local_name};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl CompiledModel {
    pub fn operations(&self) -> impl Iterator<Item = &Shape> {
        self.registry().shapes().filter(|s| s.kind == ShapeKind::Operation)
    }

    /// Accepts a full shape id or a bare operation name (case-insensitive).
    pub fn operation(&self, name: &str) -> Option<&Shape> {
        if let Some(shape) = self.registry().get(name).filter(|s| s.kind == ShapeKind::Operation) {
            return Some(shape);
        }
        self.operations().find(|s| s.local_name().eq_ignore_ascii_case(name))
    }

    /// Shape id of the request structure for `operation`: its declared `input`,
    /// else the first compiled shape whose id contains the operation name and
    /// ends in `request`.
    pub fn request_shape(&self, operation: &str) -> Option<&str> {
        if let Some(input) = self.operation(operation).and_then(|op| op.input.as_deref()) {
            if self.get(input).is_some() {
                return Some(input);
            }
        }
        let needle = local_name(operation).to_lowercase();
        self.iter().map(|(id, _)| id).find(|id| {
            let id = id.to_lowercase();
            id.contains(&needle) && id.ends_with("request")
        })
    }

    pub fn request_schema(&self, operation: &str) -> Option<NodeRef> {
        self.request_shape(operation).and_then(|id| self.get(id))
    }

    /// Raw `documentation` trait of a shape, or of a member via `ns#Shape$member`.
    pub fn documentation(&self, id: &str) -> Option<&str> {
        match id.split_once('$') {
            Some((shape, member)) => self
                .registry()
                .get(shape)?
                .members
                .get(member)?
                .traits
                .documentation(),
            None => self.registry().get(id)?.traits.documentation(),
        }
    }

    /// One descriptor per operation with a resolvable request shape, named
    /// `<prefix>_<Operation>`.
    pub fn tools(&self, prefix: &str) -> Vec<ToolDescriptor> {
        let mut out = Vec::new();
        for op in self.operations() {
            let Some(root) = self.request_schema(&op.id) else {
                tracing::warn!(operation = op.id.as_str(), "no request shape, skipping tool");
                continue;
            };
            let name = if prefix.is_empty() {
                op.local_name().to_string()
            } else {
                format!("{prefix}_{}", op.local_name())
            };
            out.push(ToolDescriptor {
                name,
                description: self.documentation(&op.id).unwrap_or_default().to_string(),
                input_schema: emit::to_json_schema(self, root),
            });
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use crate::compiler::{CompiledModel, compile_model};
    use serde_json::json;

    fn model() -> CompiledModel {
        compile_model(&json!({ "shapes": {
            "com.acme#Weather": {
                "type": "service",
                "operations": [{ "target": "com.acme#GetForecast" }, { "target": "com.acme#ListCities" }]
            },
            "com.acme#GetForecast": {
                "type": "operation",
                "input": { "target": "com.acme#GetForecastInput" },
                "traits": { "smithy.api#documentation": "<p>Returns a forecast.</p>" }
            },
            "com.acme#GetForecastInput": {
                "type": "structure",
                "members": {
                    "city": {
                        "target": "smithy.api#String",
                        "traits": { "smithy.api#documentation": "City name." }
                    }
                },
                "required": ["city"]
            },
            "com.acme#ListCities": { "type": "operation" },
            "com.acme#ListCitiesRequest": {
                "type": "structure",
                "members": { "limit": { "target": "smithy.api#Integer" } }
            },
            "com.acme#Ping": { "type": "operation" }
        }}))
        .unwrap()
    }

    #[test]
    fn request_shape_prefers_declared_input() {
        let m = model();
        assert_eq!(m.request_shape("GetForecast"), Some("com.acme#GetForecastInput"));
        assert_eq!(m.request_shape("com.acme#GetForecast"), Some("com.acme#GetForecastInput"));
    }

    #[test]
    fn request_shape_falls_back_to_naming_convention() {
        let m = model();
        assert_eq!(m.request_shape("listcities"), Some("com.acme#ListCitiesRequest"));
        assert_eq!(m.request_shape("Ping"), None);
    }

    #[test]
    fn documentation_for_shapes_and_members() {
        let m = model();
        assert_eq!(m.documentation("com.acme#GetForecast"), Some("<p>Returns a forecast.</p>"));
        assert_eq!(m.documentation("com.acme#GetForecastInput$city"), Some("City name."));
        assert_eq!(m.documentation("com.acme#GetForecastInput$nope"), None);
        assert_eq!(m.documentation("com.acme#ListCities"), None);
    }

    #[test]
    fn tools_skip_operations_without_requests() {
        let m = model();
        let tools = m.tools("weather");
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["weather_GetForecast", "weather_ListCities"]);
        assert_eq!(tools[0].description, "<p>Returns a forecast.</p>");
        assert_eq!(tools[0].input_schema["required"], json!(["city"]));
        let encoded = serde_json::to_value(&tools[1]).unwrap();
        assert_eq!(encoded["inputSchema"]["properties"]["limit"]["type"], "integer");
    }
}
