//! A `serde_json`-backed `ModelAdapter`, for embedding plain JSON documents
//! (test fixtures, ad-hoc data) without a real FHIR schema provider behind
//! them.
//!
//! Every JSON object becomes a `ModelNode` whose `type_name` is read from a
//! `resourceType` field when present, `"object"` otherwise; JSON arrays
//! navigate as repeating elements (`FhirPathValue::Collection`); scalars
//! convert directly to the matching System value.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::Value as Json;

use crate::collection::Collection;
use crate::provider::{EmptyModelProvider, ModelAdapter, ModelNode, ModelProvider, ValueReflection};
use crate::value::FhirPathValue;

/// A JSON object or array, reachable through FHIRPath navigation.
#[derive(Debug, Clone)]
pub struct JsonNode(pub Json);

impl ValueReflection for JsonNode {
    fn type_name(&self) -> String {
        match &self.0 {
            Json::Object(map) => map
                .get("resourceType")
                .and_then(Json::as_str)
                .unwrap_or("object")
                .to_string(),
            Json::Array(_) => "array".to_string(),
            other => json_scalar_type(other).to_string(),
        }
    }

    fn get_property(&self, name: &str) -> Option<Box<dyn ValueReflection>> {
        match &self.0 {
            Json::Object(map) => map
                .get(name)
                .map(|v| Box::new(JsonNode(v.clone())) as Box<dyn ValueReflection>),
            _ => None,
        }
    }

    fn has_property(&self, name: &str) -> bool {
        matches!(&self.0, Json::Object(map) if map.contains_key(name))
    }

    fn property_names(&self) -> Vec<String> {
        match &self.0 {
            Json::Object(map) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    fn to_debug_string(&self) -> String {
        self.0.to_string()
    }
}

fn json_scalar_type(v: &Json) -> &'static str {
    match v {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Object(_) => "object",
        Json::Array(_) => "array",
    }
}

/// Convert a JSON value directly into a `FhirPathValue`, recursing into
/// objects/arrays as `Node`/`Collection` rather than scalars.
pub fn json_to_value(json: &Json) -> Option<FhirPathValue> {
    match json {
        Json::Null => None,
        Json::Bool(b) => Some(FhirPathValue::Boolean(*b)),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                i32::try_from(i).ok().map(FhirPathValue::Integer)
            } else {
                n.as_f64()
                    .and_then(|f| Decimal::try_from(f).ok())
                    .map(FhirPathValue::Decimal)
            }
        }
        Json::String(s) => Some(FhirPathValue::string(s.clone())),
        Json::Array(items) => {
            let values: Vec<FhirPathValue> = items.iter().filter_map(json_to_value).collect();
            Some(FhirPathValue::Collection(Collection::from_vec(values)))
        }
        Json::Object(_) => Some(FhirPathValue::Node(
            Arc::new(JsonNode(json.clone())) as Arc<dyn ModelNode>
        )),
    }
}

/// A `ModelAdapter` over bare JSON, with no structure-definition knowledge
/// beyond `resourceType` tagging; `ModelProvider` queries always answer
/// conservatively (no known subtype relationships).
pub struct JsonModelAdapter {
    provider: EmptyModelProvider,
}

impl JsonModelAdapter {
    /// Construct the adapter.
    pub fn new() -> Self {
        Self {
            provider: EmptyModelProvider::new(),
        }
    }

    /// Wrap a JSON document as the root `FhirPathValue` for evaluation.
    pub fn root(&self, json: Json) -> FhirPathValue {
        FhirPathValue::Node(Arc::new(JsonNode(json)) as Arc<dyn ModelNode>)
    }
}

impl Default for JsonModelAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelAdapter for JsonModelAdapter {
    fn provider(&self) -> &dyn ModelProvider {
        &self.provider
    }

    fn get_property(&self, node: &Arc<dyn ModelNode>, name: &str) -> Option<FhirPathValue> {
        let json_node = node.as_any().downcast_ref::<JsonNode>()?;
        match &json_node.0 {
            Json::Object(map) => json_to_value(map.get(name)?),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_navigates_by_field_name() {
        let adapter = JsonModelAdapter::new();
        let root = adapter.root(json!({"resourceType": "Patient", "active": true}));
        let node = match &root {
            FhirPathValue::Node(n) => n.clone(),
            _ => panic!("expected Node"),
        };
        let active = adapter.get_property(&node, "active").unwrap();
        assert_eq!(active, FhirPathValue::Boolean(true));
    }

    #[test]
    fn array_becomes_collection() {
        let value = json_to_value(&json!([1, 2, 3])).unwrap();
        match value {
            FhirPathValue::Collection(c) => assert_eq!(c.count(), 3),
            _ => panic!("expected Collection"),
        }
    }

    #[test]
    fn resource_type_field_drives_type_name() {
        let node = JsonNode(json!({"resourceType": "Observation"}));
        assert_eq!(node.type_name(), "Observation");
    }
}
