//! The tool surface: documentation lookups, response shaping and
//! authenticated service calls. Every operation returns a [`ToolResult`];
//! failures become short error text instead of `Err`.

pub mod args;
pub mod catalog;

pub use catalog::{ToolSpec, TOOL_CATALOG};

use crate::client::{ServiceClient, Transport};
use crate::config::Config;
use crate::error::SpecError;
use crate::models::EndpointSummary;
use crate::shaping::{self, ShapeOptions, SizeGovernor, Verdict};
use crate::spec::{Index, SpecCache, SpecFetcher, SpecStore};
use anyhow::Context;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub text: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

/// An authenticated request to one configured service.
#[derive(Debug, Clone, Default)]
pub struct CallRequest {
    pub service: String,
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub shape: ShapeOptions,
}

/// One row of `list_services`.
#[derive(Debug, Serialize)]
struct ServiceStatus {
    name: String,
    display_name: String,
    url: String,
    auth_method: String,
    has_spec: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    endpoints: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    loaded_at: Option<DateTime<Utc>>,
}

pub struct ToolKit {
    config: Config,
    store: Arc<SpecStore>,
    transports: BTreeMap<String, Arc<dyn Transport>>,
    governor: SizeGovernor,
}

impl ToolKit {
    pub fn new(
        config: Config,
        store: Arc<SpecStore>,
        transports: BTreeMap<String, Arc<dyn Transport>>,
    ) -> Self {
        let governor = SizeGovernor::new(config.max_response_kb());
        Self {
            config,
            store,
            transports,
            governor,
        }
    }

    /// Wire up the cache, fetcher, store and one HTTP client per service.
    /// Nothing is fetched until [`SpecStore::load_all`] runs.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let timeout = config.request_timeout();
        let cache = SpecCache::new(config.cache_dir());
        let fetcher = SpecFetcher::new(timeout).context("building spec fetcher")?;
        let store = Arc::new(SpecStore::new(config.spec_sources(), cache, fetcher));

        let mut transports: BTreeMap<String, Arc<dyn Transport>> = BTreeMap::new();
        for (name, service) in &config.services {
            let client = ServiceClient::new(name, &service.base_url(), service.credentials(), timeout)
                .with_context(|| format!("building HTTP client for {name}"))?;
            transports.insert(name.clone(), Arc::new(client));
        }

        Ok(Self::new(config, store, transports))
    }

    pub fn store(&self) -> &Arc<SpecStore> {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the tool called `name` with a JSON argument object.
    pub async fn dispatch(&self, name: &str, args: Value, cancel: &CancellationToken) -> ToolResult {
        self.route(name, args, cancel).await.unwrap_or_else(|e| e)
    }

    async fn route(
        &self,
        name: &str,
        args: Value,
        cancel: &CancellationToken,
    ) -> Result<ToolResult, ToolResult> {
        let result = match name {
            "list_services" => self.list_services(),
            "list_endpoints" => {
                let a: args::EndpointsArgs = args::parse(args)?;
                let service = args::required(a.service, "service is required")?;
                self.list_endpoints(&service, a.tag.as_deref(), a.method.as_deref())
            }
            "search_api" => {
                let a: args::SearchArgs = args::parse(args)?;
                let query = args::required(a.query, "query is required")?;
                self.search_api(&query, a.service.as_deref())
            }
            "get_endpoint_details" => {
                let a: args::DetailArgs = args::parse(args)?;
                let service = args::required(a.service, "service and path are required")?;
                let path = args::required(a.path, "service and path are required")?;
                self.get_endpoint_details(&service, &path, a.method.as_deref())
            }
            "refresh_api_specs" => {
                let a: args::RefreshArgs = args::parse(args)?;
                self.refresh_specs(a.service.as_deref(), cancel).await
            }
            "shape_response" => {
                let a: args::ShapeArgs = args::parse(args)?;
                let json = a.json.ok_or_else(|| ToolResult::error("json is required"))?;
                let fields = a.fields.map(args::Loose::into_string);
                let limit = a.limit.map(args::Loose::into_string);
                let opts = ShapeOptions::parse(fields.as_deref(), a.filter.as_deref(), limit.as_deref());
                self.shape_response(json, &opts)
            }
            "call_api" => {
                let a: args::CallArgs = args::parse(args)?;
                let service = args::required(a.service, "service and path are required")?;
                let path = args::required(a.path, "service and path are required")?;
                let fields = a.fields.map(args::Loose::into_string);
                let limit = a.limit.map(args::Loose::into_string);
                let request = CallRequest {
                    service,
                    method: a.method.unwrap_or_default(),
                    path,
                    query: args::query_pairs(a.query)?,
                    body: args::body_bytes(a.body)?,
                    shape: ShapeOptions::parse(fields.as_deref(), a.filter.as_deref(), limit.as_deref()),
                };
                self.call_api(request).await
            }
            other => ToolResult::error(format!("unknown tool {other:?}")),
        };
        Ok(result)
    }

    /// Every configured service with its connection and index status.
    pub fn list_services(&self) -> ToolResult {
        let services: Vec<ServiceStatus> = self
            .config
            .services
            .iter()
            .map(|(name, service)| {
                let index = self.store.get_index(name);
                ServiceStatus {
                    name: name.clone(),
                    display_name: service.display_name(name),
                    url: service.url.clone(),
                    auth_method: service.auth_method.to_string(),
                    has_spec: index.is_some(),
                    endpoints: index.as_ref().map(|i| i.count()),
                    loaded_at: index.as_ref().map(|i| i.loaded_at()),
                }
            })
            .collect();

        pretty(&services)
    }

    /// Endpoints of one service grouped under their primary tag.
    pub fn list_endpoints(&self, service: &str, tag: Option<&str>, method: Option<&str>) -> ToolResult {
        let index = match self.loaded_index(service) {
            Ok(index) => index,
            Err(e) => return e,
        };

        let endpoints = index.filter(tag, method);
        if endpoints.is_empty() {
            return ToolResult::text("No endpoints match the given filters.");
        }

        let mut groups: IndexMap<&str, Vec<&EndpointSummary>> = IndexMap::new();
        for endpoint in &endpoints {
            let tag = if endpoint.tag.is_empty() {
                "untagged"
            } else {
                endpoint.tag.as_str()
            };
            groups.entry(tag).or_default().push(endpoint);
        }

        let mut out = format!("# {service} API Endpoints ({})\n\n", endpoints.len());
        for (tag, group) in groups {
            let _ = writeln!(out, "## {tag}");
            for endpoint in group {
                let _ = write!(out, "- {} {}", endpoint.method, endpoint.path);
                if !endpoint.summary.is_empty() {
                    let _ = write!(out, ": {}", endpoint.summary);
                }
                out.push('\n');
            }
            out.push('\n');
        }
        ToolResult::text(out)
    }

    /// Case-insensitive search over one or all loaded services.
    pub fn search_api(&self, query: &str, service: Option<&str>) -> ToolResult {
        let results = self.store.search(query, service);
        if results.is_empty() {
            return ToolResult::text("No results found.");
        }

        let mut out = format!(
            "# Search results for {query:?} ({} matches)\n\n",
            results.len()
        );
        for r in &results {
            let _ = writeln!(out, "**[{}]** {} {}", r.service, r.method, r.path);
            if !r.summary.is_empty() {
                let _ = writeln!(out, "  {}", r.summary);
            }
            out.push('\n');
        }
        ToolResult::text(out)
    }

    /// Full documentation for one endpoint as pretty JSON. The method
    /// defaults to GET.
    pub fn get_endpoint_details(&self, service: &str, path: &str, method: Option<&str>) -> ToolResult {
        let index = match self.loaded_index(service) {
            Ok(index) => index,
            Err(e) => return e,
        };
        let method = method.filter(|m| !m.is_empty()).unwrap_or("GET");

        match index.get_detail(path, Some(method)) {
            Ok(detail) => pretty(detail),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }

    /// Re-fetch one service's documentation, or all of them.
    pub async fn refresh_specs(&self, service: Option<&str>, cancel: &CancellationToken) -> ToolResult {
        if let Some(service) = service.filter(|s| !s.is_empty()) {
            return match self.store.refresh(service, cancel).await {
                Ok(index) => ToolResult::text(format!(
                    "Refreshed spec for {service} ({} endpoints)",
                    index.count()
                )),
                Err(e) => {
                    tracing::error!(%service, error = %e, "Spec refresh failed");
                    ToolResult::error(format!("failed to refresh {service}: {}", e.summary()))
                }
            };
        }

        let failures = self.store.refresh_all(cancel).await;
        if failures.is_empty() {
            return ToolResult::text("All specs refreshed successfully");
        }

        let mut out = String::from("Refresh completed with errors:\n");
        for (service, e) in &failures {
            let _ = writeln!(out, "- {service}: {}", e.summary());
        }
        ToolResult::text(out)
    }

    /// Shape a payload the caller already holds, then apply the size limit.
    pub fn shape_response(&self, json: Value, opts: &ShapeOptions) -> ToolResult {
        self.govern(shaping::shape(json, opts))
    }

    /// Perform an authenticated request and shape its JSON response.
    pub async fn call_api(&self, request: CallRequest) -> ToolResult {
        if !self.config.services.contains_key(&request.service) {
            return ToolResult::error(SpecError::NotConfigured(request.service).to_string());
        }
        let Some(transport) = self.transports.get(&request.service) else {
            return ToolResult::error(format!("no client available for {}", request.service));
        };

        let method = match request.method.trim() {
            "" => "GET".to_string(),
            m => m.to_ascii_uppercase(),
        };
        if method == "DELETE" && !self.config.allow_destructive {
            return ToolResult::error(
                "DELETE requests are disabled. Set allow_destructive: true in the config to enable them.",
            );
        }

        let response = match transport
            .perform_request(&method, &request.path, &request.query, request.body)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(service = %request.service, %method, path = %request.path, error = %e, "API call failed");
                return ToolResult::error(format!("request failed: {e}"));
            }
        };

        let decoded = serde_json::from_slice::<Value>(&response.body);
        if response.status >= 400 {
            return ToolResult::error(format!(
                "status: {}\n{}",
                response.status,
                String::from_utf8_lossy(&response.body)
            ));
        }

        match decoded {
            Ok(json) => self.govern(shaping::shape(json, &request.shape)),
            Err(_) => ToolResult::text(format!(
                "status: {}\n{}",
                response.status,
                String::from_utf8_lossy(&response.body)
            )),
        }
    }

    fn govern(&self, value: Value) -> ToolResult {
        match self.governor.check(&value) {
            Verdict::Fits(text) => ToolResult::text(text),
            Verdict::Oversized(report) => match serde_json::to_string_pretty(&report) {
                Ok(text) => ToolResult::error(text),
                Err(_) => ToolResult::error(report.hint),
            },
        }
    }

    fn loaded_index(&self, service: &str) -> Result<Arc<Index>, ToolResult> {
        if !self.config.services.contains_key(service) {
            return Err(ToolResult::error(
                SpecError::NotConfigured(service.to_string()).to_string(),
            ));
        }
        self.store.get_index(service).ok_or_else(|| {
            ToolResult::error(format!(
                "no API spec loaded for {service:?}. Try refresh_api_specs first."
            ))
        })
    }
}

fn pretty<T: Serialize + ?Sized>(value: &T) -> ToolResult {
    match serde_json::to_string_pretty(value) {
        Ok(text) => ToolResult::text(text),
        Err(e) => ToolResult::error(format!("encoding result: {e}")),
    }
}
