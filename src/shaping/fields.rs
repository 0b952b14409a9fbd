use serde_json::{Map, Value};

/// Split a comma-separated `fields` directive, dropping blanks.
pub fn parse_fields(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}

/// Keep only the requested dot-notation `fields` of `obj`.
///
/// `records.id,records.title` yields one merged object per record. Fields
/// naming a missing key are omitted. Arrays of objects are projected element
/// by element.
pub fn pick_fields(obj: &Map<String, Value>, fields: &[String]) -> Map<String, Value> {
    let mut result = Map::new();
    for field in fields {
        let (head, rest) = match field.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (field.as_str(), None),
        };
        let Some(value) = obj.get(head) else {
            continue;
        };

        let picked = match rest {
            None => value.clone(),
            Some(rest) => match pick_nested(value, rest) {
                Some(picked) => picked,
                None => continue,
            },
        };

        match result.get_mut(head) {
            Some(existing) => merge(existing, picked),
            None => {
                result.insert(head.to_string(), picked);
            }
        }
    }
    result
}

fn pick_nested(value: &Value, rest: &str) -> Option<Value> {
    let sub = [rest.to_string()];
    match value {
        Value::Object(nested) => Some(Value::Object(pick_fields(nested, &sub))),
        Value::Array(items) => Some(Value::Array(
            items
                .iter()
                .map(|item| match item {
                    Value::Object(o) => Value::Object(pick_fields(o, &sub)),
                    other => other.clone(),
                })
                .collect(),
        )),
        _ => None,
    }
}

/// Deep-merge `incoming` into `existing`. Objects merge key by key, arrays of
/// equal length merge element-wise, anything else keeps what is already there.
fn merge(existing: &mut Value, incoming: Value) {
    match (existing, incoming) {
        (Value::Object(into), Value::Object(from)) => {
            for (key, value) in from {
                match into.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        into.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(into), Value::Array(from)) if into.len() == from.len() => {
            for (slot, value) in into.iter_mut().zip(from) {
                merge(slot, value);
            }
        }
        _ => {}
    }
}

/// Value at a dot-notation path. JSON null counts as missing.
pub fn lookup<'a>(obj: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };
    match (obj.get(head)?, rest) {
        (Value::Null, _) => None,
        (value, None) => Some(value),
        (Value::Object(nested), Some(rest)) => lookup(nested, rest),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pick(value: Value, fields: &str) -> Value {
        let Value::Object(obj) = value else {
            panic!("object expected");
        };
        Value::Object(pick_fields(&obj, &parse_fields(fields)))
    }

    #[test]
    fn test_parse_fields() {
        assert_eq!(
            parse_fields(" id, title ,,statistics.sizeOnDisk "),
            vec!["id", "title", "statistics.sizeOnDisk"]
        );
        assert!(parse_fields(" , ").is_empty());
    }

    #[test]
    fn test_pick_top_level_and_nested() {
        let out = pick(json!({"a": 1, "b": {"c": 2, "d": 3}, "e": 4}), "a,b.c");
        assert_eq!(out, json!({"a": 1, "b": {"c": 2}}));
    }

    #[test]
    fn test_nested_picks_merge() {
        let out = pick(
            json!({"stats": {"size": 10, "count": 2, "free": 1}, "id": 9}),
            "stats.size,stats.count",
        );
        assert_eq!(out, json!({"stats": {"size": 10, "count": 2}}));

        let out = pick(
            json!({"a": {"b": {"c": 1, "d": 2, "e": 3}}}),
            "a.b.c,a.b.d",
        );
        assert_eq!(out, json!({"a": {"b": {"c": 1, "d": 2}}}));
    }

    #[test]
    fn test_arrays_are_projected_per_element() {
        let out = pick(
            json!({"images": [
                {"coverType": "poster", "url": "/p.jpg", "remoteUrl": "x"},
                {"coverType": "fanart", "url": "/f.jpg", "remoteUrl": "y"}
            ]}),
            "images.coverType,images.url",
        );
        assert_eq!(
            out,
            json!({"images": [
                {"coverType": "poster", "url": "/p.jpg"},
                {"coverType": "fanart", "url": "/f.jpg"}
            ]})
        );
    }

    #[test]
    fn test_missing_and_scalar_paths_are_omitted() {
        let out = pick(json!({"a": 1, "b": {"c": 2}}), "zzz,a.deeper,b.missing");
        assert_eq!(out, json!({"b": {}}));
    }

    #[test]
    fn test_lookup() {
        let Value::Object(obj) = json!({"a": {"b": {"c": 5}}, "n": null, "s": "x"}) else {
            unreachable!()
        };
        assert_eq!(lookup(&obj, "a.b.c"), Some(&json!(5)));
        assert_eq!(lookup(&obj, "a.b"), Some(&json!({"c": 5})));
        assert_eq!(lookup(&obj, "n"), None);
        assert_eq!(lookup(&obj, "s.x"), None);
        assert_eq!(lookup(&obj, "missing"), None);
    }
}
