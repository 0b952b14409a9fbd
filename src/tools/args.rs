//! JSON argument objects accepted by [`super::ToolKit::dispatch`].

use super::ToolResult;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// A string argument that callers sometimes send as a bare number or bool
/// (`"limit": 5`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Loose {
    Text(String),
    Number(serde_json::Number),
    Bool(bool),
}

impl Loose {
    pub fn into_string(self) -> String {
        match self {
            Loose::Text(s) => s,
            Loose::Number(n) => n.to_string(),
            Loose::Bool(b) => b.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EndpointsArgs {
    pub service: Option<String>,
    pub tag: Option<String>,
    pub method: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchArgs {
    pub query: Option<String>,
    pub service: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DetailArgs {
    pub service: Option<String>,
    pub path: Option<String>,
    pub method: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RefreshArgs {
    pub service: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ShapeArgs {
    pub json: Option<Value>,
    pub fields: Option<Loose>,
    pub filter: Option<String>,
    pub limit: Option<Loose>,
}

/// `query` and `body` may be JSON objects or strings holding JSON.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CallArgs {
    pub service: Option<String>,
    pub method: Option<String>,
    pub path: Option<String>,
    pub query: Option<Value>,
    pub body: Option<Value>,
    pub fields: Option<Loose>,
    pub filter: Option<String>,
    pub limit: Option<Loose>,
}

/// Decode an argument object. `null` counts as `{}`.
pub fn parse<T: DeserializeOwned + Default>(args: Value) -> Result<T, ToolResult> {
    if args.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(args).map_err(|e| ToolResult::error(format!("invalid arguments: {e}")))
}

/// The value of a required string argument, rejecting blanks.
pub fn required(value: Option<String>, message: &str) -> Result<String, ToolResult> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ToolResult::error(message))
}

/// Query parameters from an object (or a string holding one). Non-string
/// values are rendered as JSON text, so `{"seriesId": 5}` becomes
/// `seriesId=5`.
pub fn query_pairs(query: Option<Value>) -> Result<Vec<(String, String)>, ToolResult> {
    let query = match query {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::String(raw)) if raw.trim().is_empty() => return Ok(Vec::new()),
        Some(Value::String(raw)) => serde_json::from_str::<Value>(&raw)
            .map_err(|e| ToolResult::error(format!("invalid query JSON: {e}")))?,
        Some(other) => other,
    };

    let Value::Object(map) = query else {
        return Err(ToolResult::error("query must be a JSON object"));
    };
    Ok(map
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect())
}

/// Request body bytes. A string must itself be valid JSON and is sent as-is.
pub fn body_bytes(body: Option<Value>) -> Result<Option<Vec<u8>>, ToolResult> {
    match body {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(raw)) if raw.trim().is_empty() => Ok(None),
        Some(Value::String(raw)) => {
            serde_json::from_str::<serde::de::IgnoredAny>(&raw)
                .map_err(|_| ToolResult::error("invalid body JSON"))?;
            Ok(Some(raw.into_bytes()))
        }
        Some(other) => Ok(Some(other.to_string().into_bytes())),
    }
}
