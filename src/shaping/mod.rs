//! Response shaping for arbitrary JSON payloads.
//!
//! Arrays are processed filter -> limit -> field projection. Objects that wrap
//! a list (`{records: [...], page, totalRecords}`) are drilled: the array named
//! by a `fields` entry is filtered, limited and projected in place while the
//! requested scalar fields are kept alongside it.

pub mod fields;
pub mod filter;
pub mod governor;

pub use fields::{parse_fields, pick_fields};
pub use filter::{FilterExpr, FilterOp};
pub use governor::{OversizeReport, SizeGovernor, Verdict};

use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Parsed `fields` / `filter` / `limit` directives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapeOptions {
    pub fields: Vec<String>,
    pub filter: Option<FilterExpr>,
    pub limit: Option<usize>,
}

impl ShapeOptions {
    /// Malformed filters and non-positive limits are dropped rather than
    /// reported.
    pub fn parse(fields: Option<&str>, filter: Option<&str>, limit: Option<&str>) -> Self {
        let filter = filter
            .filter(|f| !f.trim().is_empty())
            .and_then(|f| match f.parse::<FilterExpr>() {
                Ok(expr) => Some(expr),
                Err(e) => {
                    tracing::debug!(filter = f, error = %e, "Ignoring malformed filter");
                    None
                }
            });

        Self {
            fields: fields.map(parse_fields).unwrap_or_default(),
            filter,
            limit: limit
                .and_then(|l| l.trim().parse::<usize>().ok())
                .filter(|&n| n > 0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.filter.is_none() && self.limit.is_none()
    }
}

/// Apply `opts` to a decoded payload. Scalars pass through untouched.
pub fn shape(value: Value, opts: &ShapeOptions) -> Value {
    if opts.is_empty() {
        return value;
    }
    match value {
        Value::Array(items) => Value::Array(shape_array(items, opts, &opts.fields)),
        Value::Object(obj) => Value::Object(shape_object(obj, opts)),
        other => other,
    }
}

/// Truncate to the first `limit` items when that is shorter.
pub fn apply_limit(items: &mut Vec<Value>, limit: Option<usize>) {
    if let Some(n) = limit {
        if n > 0 && n < items.len() {
            items.truncate(n);
        }
    }
}

fn shape_array(items: Vec<Value>, opts: &ShapeOptions, fields: &[String]) -> Vec<Value> {
    let mut items = match &opts.filter {
        Some(filter) => filter.apply(items),
        None => items,
    };
    apply_limit(&mut items, opts.limit);

    if fields.is_empty() {
        return items;
    }
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(obj) => Value::Object(pick_fields(&obj, fields)),
            other => other,
        })
        .collect()
}

fn shape_object(mut obj: Map<String, Value>, opts: &ShapeOptions) -> Map<String, Value> {
    // array key -> sub-fields; an empty list keeps whole items.
    let mut drilled: IndexMap<String, Vec<String>> = IndexMap::new();
    let mut whole: Vec<String> = Vec::new();
    let mut scalar_fields = Vec::new();

    for field in &opts.fields {
        let (head, rest) = match field.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (field.as_str(), None),
        };
        if !matches!(obj.get(head), Some(Value::Array(_))) {
            scalar_fields.push(field.clone());
            continue;
        }
        let subs = drilled.entry(head.to_string()).or_default();
        match rest {
            Some(rest) => subs.push(rest.to_string()),
            None => whole.push(head.to_string()),
        }
    }

    if drilled.is_empty() {
        if opts.filter.is_some() || opts.limit.is_some() {
            for value in obj.values_mut() {
                if let Value::Array(items) = value {
                    *items = shape_array(std::mem::take(items), opts, &[]);
                }
            }
        }
        if opts.fields.is_empty() {
            return obj;
        }
        return pick_fields(&obj, &opts.fields);
    }

    let mut result = pick_fields(&obj, &scalar_fields);
    for (key, subs) in drilled {
        let Some(Value::Array(items)) = obj.remove(&key) else {
            continue;
        };
        let subs = if whole.contains(&key) { Vec::new() } else { subs };
        result.insert(key, Value::Array(shape_array(items, opts, &subs)));
    }
    result
}
