//! Refuses oversized payloads with a navigable diagnostic instead of data.

use serde::Serialize;
use serde_json::Value;

pub const DEFAULT_MAX_RESPONSE_KB: usize = 50;

/// How many field names the worked examples draw on.
const EXAMPLE_FIELDS: usize = 3;

#[derive(Debug, Clone, Copy)]
pub struct SizeGovernor {
    max_bytes: usize,
}

impl Default for SizeGovernor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RESPONSE_KB)
    }
}

/// Result of checking a payload against the threshold.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Serialized payload, ready to return.
    Fits(String),
    Oversized(OversizeReport),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OversizeReport {
    pub error: String,
    #[serde(rename = "sizeKB")]
    pub size_kb: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_path: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub available_fields: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub example_fields: Vec<String>,
    pub hint: String,
}

impl SizeGovernor {
    /// `max_kb` is in units of 1024 bytes. Zero falls back to the default.
    pub fn new(max_kb: usize) -> Self {
        let max_kb = if max_kb == 0 {
            DEFAULT_MAX_RESPONSE_KB
        } else {
            max_kb
        };
        Self {
            max_bytes: max_kb * 1024,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Serialize `value` and compare its size to the threshold.
    pub fn check(&self, value: &Value) -> Verdict {
        let rendered = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
        if rendered.len() <= self.max_bytes {
            return Verdict::Fits(rendered);
        }

        let size_kb = rendered.len().div_ceil(1024);
        tracing::info!(
            size_kb,
            limit_kb = self.max_bytes / 1024,
            "Response exceeds size limit, returning field guidance"
        );
        Verdict::Oversized(report(value, size_kb, self.max_bytes / 1024))
    }
}

/// The payload itself when it is an array, otherwise the longest array-valued
/// property one level down. Returns the path ("" for top level) and items.
fn dominant_array(value: &Value) -> Option<(String, &Vec<Value>)> {
    match value {
        Value::Array(items) => Some((String::new(), items)),
        Value::Object(obj) => obj
            .iter()
            .filter_map(|(key, v)| v.as_array().map(|items| (key, items)))
            .fold(None, |best: Option<(&String, &Vec<Value>)>, (key, items)| match best {
                Some((_, current)) if current.len() >= items.len() => best,
                _ => Some((key, items)),
            })
            .map(|(key, items)| (key.clone(), items)),
        _ => None,
    }
}

fn report(value: &Value, size_kb: usize, limit_kb: usize) -> OversizeReport {
    let error = format!("Response too large ({size_kb}KB, limit {limit_kb}KB)");

    let Some((path, items)) = dominant_array(value).filter(|(_, items)| !items.is_empty()) else {
        return OversizeReport {
            error,
            size_kb,
            item_count: None,
            field_path: None,
            available_fields: Vec::new(),
            example_fields: Vec::new(),
            hint: "Use the fields parameter to select only the properties you need.".to_string(),
        };
    };

    let available_fields: Vec<String> = items[0]
        .as_object()
        .map(|obj| obj.keys().cloned().collect())
        .unwrap_or_default();

    let prefix = if path.is_empty() {
        String::new()
    } else {
        format!("{path}.")
    };
    let qualified: Vec<String> = available_fields
        .iter()
        .take(EXAMPLE_FIELDS)
        .map(|f| format!("{prefix}{f}"))
        .collect();

    let mut example_fields = Vec::new();
    if let Some(first) = qualified.first() {
        example_fields.push(first.clone());
    }
    if qualified.len() > 1 {
        example_fields.push(qualified.join(","));
    }

    let target = if path.is_empty() {
        "the response".to_string()
    } else {
        format!("'{path}'")
    };
    let hint = format!(
        "{} items in {target}. Re-issue the request with fields (e.g. \"{}\"), \
         filter (\"field:op:value\") or limit to narrow it.",
        items.len(),
        example_fields.last().cloned().unwrap_or_default(),
    );

    OversizeReport {
        error,
        size_kb,
        item_count: Some(items.len()),
        field_path: Some(path),
        available_fields,
        example_fields,
        hint,
    }
}
