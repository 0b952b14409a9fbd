//! Turns a raw OpenAPI (or Swagger 2.0) document into an [`Index`].
//!
//! Documents are accepted as JSON or YAML. Local `$ref`s are followed through
//! the document; anything that does not conform is recorded as a warning and
//! skipped so that imperfect upstream specs stay usable.

use crate::error::{Result, SpecError};
use crate::models::{EndpointDetail, ParameterInfo, ParameterLocation, PropertyInfo, SchemaInfo};
use crate::spec::index::{Endpoints, Index};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Bounds `$ref` chains that hop from one reference to the next.
const MAX_REF_DEPTH: usize = 32;

/// Request body properties keep this many levels of object structure.
const MAX_NESTING: usize = 2;

const UNKNOWN_TYPE: &str = "unknown";
const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Parse `bytes` into the endpoint index for `service`.
pub fn parse(service: &str, bytes: &[u8]) -> Result<Index> {
    let doc = decode(bytes).map_err(|reason| SpecError::parse(service, reason))?;
    if !doc.is_object() {
        return Err(SpecError::parse(service, "document root is not an object"));
    }

    let mut walker = DocumentWalker::new(&doc);
    walker.check_document();
    let endpoints = walker.endpoints(service);
    let warnings = walker.warnings;

    if !warnings.is_empty() {
        tracing::warn!(
            service,
            count = warnings.len(),
            first = %warnings[0],
            "Spec validation reported problems, continuing"
        );
        for warning in &warnings {
            tracing::debug!(service, %warning, "Spec validation");
        }
    }

    Ok(Index::new(service, endpoints, warnings))
}

fn decode(bytes: &[u8]) -> std::result::Result<Value, String> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(doc) => Ok(doc),
        Err(json_err) => serde_yaml::from_slice::<serde_yaml::Value>(bytes)
            .map(yaml_to_json)
            .map_err(|yaml_err| format!("neither JSON ({json_err}) nor YAML ({yaml_err})")),
    }
}

fn yaml_to_json(value: serde_yaml::Value) -> Value {
    use serde_yaml::Value as Yaml;

    match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Array(items.into_iter().map(yaml_to_json).collect()),
        Yaml::Mapping(mapping) => Value::Object(
            mapping
                .into_iter()
                .filter_map(|(k, v)| Some((yaml_key(k)?, yaml_to_json(v))))
                .collect(),
        ),
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

// Response codes are often written as bare integers in YAML.
fn yaml_key(key: serde_yaml::Value) -> Option<String> {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => Some(s),
        Yaml::Number(n) => Some(n.to_string()),
        Yaml::Bool(b) => Some(b.to_string()),
        Yaml::Null => Some("null".to_string()),
        _ => None,
    }
}

fn text(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn list<'a>(value: Option<&'a Value>) -> impl Iterator<Item = &'a Value> {
    value.and_then(Value::as_array).into_iter().flatten()
}

fn ref_of(value: &Value) -> Option<&str> {
    value.get("$ref").and_then(Value::as_str)
}

fn declared_type(schema: &Value) -> Option<String> {
    match schema.get("type")? {
        Value::String(t) => Some(t.clone()),
        // OpenAPI 3.1 allows ["string", "null"].
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null")
            .map(str::to_string),
        _ => None,
    }
}

struct DocumentWalker<'a> {
    doc: &'a Value,
    warnings: Vec<String>,
    reported: BTreeSet<String>,
    /// Resolved type per `$ref`, so each reference is expanded once per walk.
    ref_types: BTreeMap<String, String>,
    resolving: BTreeSet<String>,
}

impl<'a> DocumentWalker<'a> {
    fn new(doc: &'a Value) -> Self {
        Self {
            doc,
            warnings: Vec::new(),
            reported: BTreeSet::new(),
            ref_types: BTreeMap::new(),
            resolving: BTreeSet::new(),
        }
    }

    fn warn(&mut self, message: String) {
        if self.reported.insert(message.clone()) {
            self.warnings.push(message);
        }
    }

    fn check_document(&mut self) {
        let doc = self.doc;
        if doc.get("openapi").is_none() && doc.get("swagger").is_none() {
            self.warn("missing openapi/swagger version field".to_string());
        }
        match doc.get("info") {
            Some(info) if info.get("title").and_then(Value::as_str).is_some() => {}
            Some(_) => self.warn("info object has no title".to_string()),
            None => self.warn("missing info object".to_string()),
        }
        match doc.get("paths") {
            Some(Value::Object(paths)) => {
                for path in paths.keys().filter(|p| !p.starts_with('/')) {
                    self.warn(format!("path {path:?} does not start with '/'"));
                }
            }
            Some(_) => self.warn("paths is not an object".to_string()),
            None => self.warn("document has no paths".to_string()),
        }
    }

    /// Follow `$ref` chains to the referenced value. `None` when a reference
    /// cannot be resolved inside this document.
    fn deref(&mut self, value: &'a Value) -> Option<&'a Value> {
        let mut current = value;
        for _ in 0..MAX_REF_DEPTH {
            let Some(reference) = current.get("$ref").and_then(Value::as_str) else {
                return Some(current);
            };
            match self.lookup(reference) {
                Some(target) => current = target,
                None if reference.starts_with('#') => {
                    self.warn(format!("unresolved reference {reference}"));
                    return None;
                }
                None => {
                    self.warn(format!("external reference {reference} not resolved"));
                    return None;
                }
            }
        }
        self.warn("reference chain too deep".to_string());
        None
    }

    fn lookup(&self, reference: &str) -> Option<&'a Value> {
        let pointer = reference.strip_prefix('#')?;
        if pointer.is_empty() {
            return Some(self.doc);
        }
        self.doc.pointer(pointer)
    }

    fn endpoints(&mut self, service: &str) -> Endpoints {
        let mut endpoints = Endpoints::new();
        let doc = self.doc;
        let Some(paths) = doc.get("paths").and_then(Value::as_object) else {
            return endpoints;
        };
        let consumes = doc
            .get("consumes")
            .and_then(|c| list(Some(c)).find_map(Value::as_str))
            .unwrap_or(DEFAULT_CONTENT_TYPE);

        for (path, item) in paths {
            let Some(item) = self.deref(item) else {
                continue;
            };
            if !item.is_object() {
                self.warn(format!("path item {path} is not an object"));
                continue;
            }
            let shared = item.get("parameters");

            for method in HTTP_METHODS {
                let Some(op) = item.get(method).and_then(Value::as_object) else {
                    continue;
                };
                let detail = self.operation(service, path, method, op, shared, consumes);
                endpoints
                    .entry(path.clone())
                    .or_default()
                    .insert(detail.method.clone(), detail);
            }
        }

        endpoints
    }

    fn operation(
        &mut self,
        service: &str,
        path: &str,
        method: &str,
        op: &'a Map<String, Value>,
        shared: Option<&'a Value>,
        doc_consumes: &str,
    ) -> EndpointDetail {
        let method = method.to_ascii_uppercase();
        let consumes = op
            .get("consumes")
            .and_then(|c| list(Some(c)).find_map(Value::as_str))
            .unwrap_or(doc_consumes)
            .to_string();

        let (parameters, body_param) = self.parameters(shared, op.get("parameters"), &consumes);

        let request_body = match op.get("requestBody") {
            Some(body) => self.request_body(body),
            None => body_param,
        };

        let mut detail = EndpointDetail {
            service: service.to_string(),
            method,
            path: path.to_string(),
            summary: op
                .get("summary")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            description: op
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            tags: list(op.get("tags"))
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            parameters,
            request_body,
            responses: Default::default(),
        };

        match op.get("responses").and_then(Value::as_object) {
            Some(responses) => {
                for (code, response) in responses {
                    let description = self
                        .deref(response)
                        .and_then(|r| r.get("description"))
                        .and_then(Value::as_str);
                    if let Some(description) = description {
                        detail
                            .responses
                            .insert(code.clone(), description.to_string());
                    }
                }
            }
            None => self.warn(format!("{} {path} declares no responses", detail.method)),
        }

        detail
    }

    /// Path-level parameters merged with operation-level ones, the latter
    /// winning on the same name and location. Swagger 2.0 `in: body`
    /// parameters come back separately as a request body.
    fn parameters(
        &mut self,
        shared: Option<&'a Value>,
        own: Option<&'a Value>,
        consumes: &str,
    ) -> (Vec<ParameterInfo>, Option<SchemaInfo>) {
        let mut params: Vec<ParameterInfo> = Vec::new();
        let mut body = None;

        for raw in list(shared).chain(list(own)) {
            let Some(param) = self.deref(raw) else {
                continue;
            };
            let name = text(param, "name");
            let location = text(param, "in");

            if location == "body" {
                let mut info = match param.get("schema") {
                    Some(schema) => self.schema_info(schema, 0),
                    None => SchemaInfo::default(),
                };
                info.content_type = consumes.to_string();
                body = Some(info);
                continue;
            }

            let Some(location) = ParameterLocation::parse(&location) else {
                self.warn(format!(
                    "parameter {name:?} has unsupported location {location:?}"
                ));
                continue;
            };

            let param_type = match param.get("schema") {
                Some(schema) => self.type_name(schema),
                None => declared_type(param).unwrap_or_else(|| UNKNOWN_TYPE.to_string()),
            };

            let info = ParameterInfo {
                name,
                location,
                required: param
                    .get("required")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
                param_type,
                description: text(param, "description"),
            };

            match params
                .iter_mut()
                .find(|p| p.name == info.name && p.location == info.location)
            {
                Some(existing) => *existing = info,
                None => params.push(info),
            }
        }

        (params, body)
    }

    /// First declared content type only.
    fn request_body(&mut self, body: &'a Value) -> Option<SchemaInfo> {
        let body = self.deref(body)?;
        let (content_type, media) = body.get("content")?.as_object()?.iter().next()?;

        let mut info = match media.get("schema") {
            Some(schema) => self.schema_info(schema, 0),
            None => SchemaInfo::default(),
        };
        info.content_type = content_type.clone();
        if info.example.is_none() {
            info.example = media.get("example").cloned();
        }
        Some(info)
    }

    fn schema_info(&mut self, schema: &'a Value, depth: usize) -> SchemaInfo {
        let mut seen: BTreeSet<&'a str> = ref_of(schema).into_iter().collect();
        let Some(mut schema) = self.deref(schema) else {
            return SchemaInfo::default();
        };

        // Array bodies are described by their items.
        if schema.get("properties").is_none() {
            if let Some(items) = schema.get("items").and_then(|i| self.deref(i)) {
                schema = items;
            }
        }

        let mut info = SchemaInfo {
            example: schema.get("example").cloned(),
            ..SchemaInfo::default()
        };
        self.collect_properties(&mut info, schema, depth, &mut seen);
        info
    }

    /// Merges `properties` and `required` from the schema and its `allOf`
    /// members. A referenced member is merged at most once.
    fn collect_properties(
        &mut self,
        info: &mut SchemaInfo,
        schema: &'a Value,
        depth: usize,
        seen: &mut BTreeSet<&'a str>,
    ) {
        info.required.extend(
            list(schema.get("required"))
                .filter_map(Value::as_str)
                .map(str::to_string),
        );

        if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
            for (name, prop) in properties {
                if info.properties.contains_key(name) {
                    continue;
                }
                let prop = self.property(prop, depth);
                info.properties.insert(name.clone(), prop);
            }
        }

        for member in list(schema.get("allOf")) {
            if let Some(reference) = ref_of(member) {
                if !seen.insert(reference) {
                    continue;
                }
            }
            if let Some(member) = self.deref(member) {
                self.collect_properties(info, member, depth, seen);
            }
        }
    }

    fn property(&mut self, prop: &'a Value, depth: usize) -> PropertyInfo {
        let Some(resolved) = self.deref(prop) else {
            return PropertyInfo::Field {
                prop_type: UNKNOWN_TYPE.to_string(),
                description: String::new(),
            };
        };

        let prop_type = self.type_name(prop);

        if prop_type == "object"
            && depth + 1 < MAX_NESTING
            && resolved.get("properties").is_some()
        {
            let mut nested = self.schema_info(resolved, depth + 1);
            nested.example = None;
            if !nested.properties.is_empty() {
                return PropertyInfo::Nested(Box::new(nested));
            }
        }

        // A description written beside a `$ref` wins over the target's.
        let mut description = text(prop, "description");
        if description.is_empty() {
            description = text(resolved, "description");
        }

        PropertyInfo::Field {
            prop_type,
            description,
        }
    }

    fn type_name(&mut self, schema: &'a Value) -> String {
        let Some(reference) = ref_of(schema) else {
            return self.inline_type_name(schema);
        };
        if let Some(t) = self.ref_types.get(reference) {
            return t.clone();
        }
        // A reference met again while it is being resolved is a cycle.
        if !self.resolving.insert(reference.to_string()) {
            return UNKNOWN_TYPE.to_string();
        }
        let t = match self.deref(schema) {
            Some(target) => self.inline_type_name(target),
            None => UNKNOWN_TYPE.to_string(),
        };
        self.resolving.remove(reference);
        self.ref_types.insert(reference.to_string(), t.clone());
        t
    }

    fn inline_type_name(&mut self, schema: &'a Value) -> String {
        if let Some(t) = declared_type(schema) {
            return t;
        }

        for key in ["allOf", "oneOf", "anyOf"] {
            for member in list(schema.get(key)) {
                let t = self.type_name(member);
                if t != UNKNOWN_TYPE {
                    return t;
                }
            }
        }

        if schema.get("properties").is_some() {
            "object".to_string()
        } else if schema.get("items").is_some() {
            "array".to_string()
        } else {
            UNKNOWN_TYPE.to_string()
        }
    }
}
