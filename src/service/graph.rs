//! JSON expression graph sent to the remote compute service.
//!
//! Nodes follow the service's value representation:
//! - `{"constantValue": ...}` for literals,
//! - `{"functionInvocationValue": {"functionName": ..., "arguments": {...}}}` for calls,
//! - `{"functionDefinitionValue": {"argumentNames": [...], "body": ...}}` for lambdas,
//! - `{"argumentReference": ...}` for lambda parameters.
//!
//! Building a graph never talks to the network; only evaluation does.

use serde::Serialize;
use serde_json::{Map, Value, json};

/// Name bound to the per-image parameter of mapped functions.
pub const IMAGE_VAR: &str = "_image";

/// One node of the expression graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Expr(Value);

impl Expr {
    /// A literal value.
    #[must_use]
    pub fn constant(value: Value) -> Self {
        Self(json!({ "constantValue": value }))
    }

    /// A call to a named remote function with named arguments.
    #[must_use]
    pub fn call<'a, I>(function: &str, arguments: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Expr)>,
    {
        let arguments: Map<String, Value> = arguments
            .into_iter()
            .map(|(name, expr)| (name.to_string(), expr.0))
            .collect();
        Self(json!({
            "functionInvocationValue": {
                "functionName": function,
                "arguments": arguments,
            }
        }))
    }

    /// A dictionary whose values are themselves expressions.
    #[must_use]
    pub fn dictionary<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Expr)>,
    {
        let values: Map<String, Value> = entries.into_iter().map(|(k, v)| (k, v.0)).collect();
        Self(json!({ "dictionaryValue": { "values": values } }))
    }

    /// Reference to a lambda parameter.
    #[must_use]
    pub fn argument_reference(name: &str) -> Self {
        Self(json!({ "argumentReference": name }))
    }

    /// A one-argument lambda bound to [`IMAGE_VAR`].
    #[must_use]
    pub fn image_function(body: Expr) -> Self {
        Self(json!({
            "functionDefinitionValue": {
                "argumentNames": [IMAGE_VAR],
                "body": body.0,
            }
        }))
    }

    /// Maps `body` (built around [`Expr::image`]) over every image of `collection`.
    #[must_use]
    pub fn map_images(collection: Expr, body: Expr) -> Self {
        Self::call(
            "Collection.map",
            [("collection", collection), ("baseAlgorithm", Self::image_function(body))],
        )
    }

    /// The per-image parameter inside a mapped function.
    #[must_use]
    pub fn image() -> Self {
        Self::argument_reference(IMAGE_VAR)
    }

    /// Name of the invoked function, if this node is a call.
    #[must_use]
    pub fn function_name(&self) -> Option<&str> {
        self.0
            .get("functionInvocationValue")?
            .get("functionName")?
            .as_str()
    }

    /// Returns true if a call to `function` appears anywhere in the graph.
    #[must_use]
    pub fn contains_call(&self, function: &str) -> bool {
        fn walk(value: &Value, function: &str) -> bool {
            match value {
                Value::Object(map) => {
                    if map.get("functionName").and_then(Value::as_str) == Some(function) {
                        return true;
                    }
                    map.values().any(|v| walk(v, function))
                }
                Value::Array(items) => items.iter().any(|v| walk(v, function)),
                _ => false,
            }
        }
        walk(&self.0, function)
    }

    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

/// Shorthand for a string constant.
#[must_use]
pub fn string(value: &str) -> Expr {
    Expr::constant(Value::String(value.to_string()))
}

/// Shorthand for a numeric constant.
#[must_use]
pub fn number(value: f64) -> Expr {
    Expr::constant(json!(value))
}

/// Shorthand for a list of string constants.
#[must_use]
pub fn strings(values: &[String]) -> Expr {
    Expr::constant(json!(values))
}
