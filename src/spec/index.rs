use crate::error::{Result, SpecError};
use crate::models::{EndpointDetail, EndpointSummary};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::BTreeMap;

/// path -> METHOD -> detail
pub type Endpoints = BTreeMap<String, BTreeMap<String, EndpointDetail>>;

/// Parsed endpoint data for a single service. Built once per load and never
/// mutated afterwards.
#[derive(Debug, Clone)]
pub struct Index {
    service: String,
    endpoints: Endpoints,
    templates: Vec<(Regex, String)>,
    warnings: Vec<String>,
    loaded_at: DateTime<Utc>,
}

impl Index {
    pub fn new(service: &str, endpoints: Endpoints, warnings: Vec<String>) -> Self {
        let templates = endpoints
            .keys()
            .filter(|path| path.contains('{'))
            .filter_map(|path| template_regex(path).map(|re| (re, path.clone())))
            .collect();

        Self {
            service: service.to_string(),
            endpoints,
            templates,
            warnings,
            loaded_at: Utc::now(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Problems found while parsing that did not prevent indexing.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Total number of (path, method) pairs.
    pub fn count(&self) -> usize {
        self.endpoints.values().map(BTreeMap::len).sum()
    }

    pub fn details(&self) -> impl Iterator<Item = &EndpointDetail> {
        self.endpoints.values().flat_map(BTreeMap::values)
    }

    /// Summaries matching optional tag and method filters, both compared
    /// case-insensitively. Empty filters pass everything.
    pub fn filter(&self, tag: Option<&str>, method: Option<&str>) -> Vec<EndpointSummary> {
        let tag = tag.filter(|t| !t.is_empty());
        let method = method.filter(|m| !m.is_empty());

        self.details()
            .filter(|d| method.is_none_or(|m| d.method.eq_ignore_ascii_case(m)))
            .filter(|d| {
                tag.is_none_or(|t| d.tags.iter().any(|dt| dt.to_lowercase() == t.to_lowercase()))
            })
            .map(EndpointDetail::summarize)
            .collect()
    }

    /// Endpoints whose path, summary, description or any tag contains `query`,
    /// ignoring case.
    pub fn search(&self, query: &str) -> Vec<EndpointSummary> {
        let query = query.to_lowercase();
        self.details()
            .filter(|d| d.mentions(&query))
            .map(EndpointDetail::summarize)
            .collect()
    }

    /// Best available documentation for `path` and `method`.
    ///
    /// An unknown path falls back to a template match (`/series/{id}` for
    /// `/series/12`) and then to a prefix/suffix match. An unknown method falls
    /// back to GET, then to whatever the path offers. Fails only when no path
    /// matches even loosely.
    pub fn get_detail(&self, path: &str, method: Option<&str>) -> Result<&EndpointDetail> {
        let not_found = || SpecError::NotFound {
            service: self.service.clone(),
            path: path.to_string(),
        };

        if path.is_empty() {
            return Err(not_found());
        }

        let methods = self
            .endpoints
            .get(path)
            .or_else(|| self.template_match(path))
            .or_else(|| self.affix_match(path))
            .ok_or_else(not_found)?;

        let wanted = method
            .filter(|m| !m.is_empty())
            .map(str::to_ascii_uppercase)
            .unwrap_or_else(|| "GET".to_string());

        methods
            .get(&wanted)
            .or_else(|| methods.get("GET"))
            .or_else(|| methods.values().next())
            .ok_or_else(not_found)
    }

    fn template_match(&self, path: &str) -> Option<&BTreeMap<String, EndpointDetail>> {
        self.templates
            .iter()
            .filter(|(re, _)| re.is_match(path))
            .min_by_key(|(_, template)| template.matches('{').count())
            .and_then(|(_, template)| self.endpoints.get(template))
    }

    // Prefer the shortest indexed path that extends the request
    // ("/series" -> "/api/v3/series"), then the longest indexed path the
    // request extends.
    fn affix_match(&self, path: &str) -> Option<&BTreeMap<String, EndpointDetail>> {
        let extending = self
            .endpoints
            .iter()
            .filter(|(p, _)| p.ends_with(path) || p.starts_with(path))
            .min_by_key(|(p, _)| p.len());

        extending
            .or_else(|| {
                self.endpoints
                    .iter()
                    .filter(|(p, _)| path.ends_with(p.as_str()) || path.starts_with(p.as_str()))
                    .max_by_key(|(p, _)| p.len())
            })
            .map(|(_, methods)| methods)
    }
}

/// `/series/{id}` -> `^/series/[^/]+$`
fn template_regex(template: &str) -> Option<Regex> {
    let pattern = template
        .split('/')
        .map(|segment| {
            if segment.starts_with('{') && segment.ends_with('}') {
                "[^/]+".to_string()
            } else {
                regex::escape(segment)
            }
        })
        .collect::<Vec<_>>()
        .join("/");
    Regex::new(&format!("^{pattern}$")).ok()
}
