mod common;

use arr_navigator::client::{ApiResponse, Transport};
use arr_navigator::error::TransportError;
use arr_navigator::spec::{SpecCache, SpecFetcher, SpecStore};
use arr_navigator::{Config, ToolKit};
use async_trait::async_trait;
use common::{openapi_doc, DocServer};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq)]
struct Call {
    method: String,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Vec<u8>>,
}

/// Replays one canned response and records every request.
struct FakeTransport {
    status: u16,
    body: Vec<u8>,
    calls: Mutex<Vec<Call>>,
}

impl FakeTransport {
    fn new(status: u16, body: impl Into<Vec<u8>>) -> Arc<Self> {
        Arc::new(Self {
            status,
            body: body.into(),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn perform_request(
        &self,
        method: &str,
        path: &str,
        query: &[(String, String)],
        body: Option<Vec<u8>>,
    ) -> Result<ApiResponse, TransportError> {
        self.calls.lock().push(Call {
            method: method.to_string(),
            path: path.to_string(),
            query: query.to_vec(),
            body,
        });
        Ok(ApiResponse {
            status: self.status,
            body: self.body.clone(),
        })
    }
}

struct Harness {
    toolkit: ToolKit,
    transport: Arc<FakeTransport>,
    server: DocServer,
    _cache: tempfile::TempDir,
}

fn series(n: usize) -> Value {
    Value::Array(
        (0..n)
            .map(|i| {
                json!({
                    "id": i,
                    "title": format!("Series {i}"),
                    "year": 1990 + i,
                    "overview": "o".repeat(100),
                    "statistics": { "sizeOnDisk": i * 1000, "episodeCount": 10 }
                })
            })
            .collect(),
    )
}

async fn harness(extra_config: &str, transport: Arc<FakeTransport>) -> Harness {
    let server = DocServer::spawn().await;
    server.serve(
        "sonarr.json",
        openapi_doc(&[
            ("/api/v3/series", "Series", "List series"),
            ("/api/v3/series/{id}", "Series", "Get series"),
            ("/api/v3/calendar", "Calendar", "Upcoming episodes"),
            ("/api/v3/ping", "", "Liveness"),
        ]),
    );
    let cache = tempfile::tempdir().unwrap();

    let yaml = format!(
        "services:\n  sonarr:\n    url: http://sonarr.local:8989\n    api_key: k\n    openapi_url: {}\n  bazarr:\n    url: http://bazarr.local:6767\n{extra_config}",
        server.url("sonarr.json")
    );
    let config = Config::from_yaml_str(&yaml).unwrap();

    let fetcher = SpecFetcher::new(Duration::from_secs(5)).unwrap();
    let store = Arc::new(SpecStore::new(
        config.spec_sources(),
        SpecCache::new(cache.path()),
        fetcher,
    ));
    store.load_all(&CancellationToken::new()).await;

    let mut transports: BTreeMap<String, Arc<dyn Transport>> = BTreeMap::new();
    transports.insert("sonarr".to_string(), transport.clone());

    Harness {
        toolkit: ToolKit::new(config, store, transports),
        transport,
        server,
        _cache: cache,
    }
}

async fn default_harness() -> Harness {
    harness("", FakeTransport::new(200, series(3).to_string())).await
}

async fn call(toolkit: &ToolKit, name: &str, args: Value) -> arr_navigator::ToolResult {
    toolkit.dispatch(name, args, &CancellationToken::new()).await
}

#[tokio::test]
async fn test_list_services() {
    let h = default_harness().await;
    let result = call(&h.toolkit, "list_services", Value::Null).await;
    assert!(!result.is_error);

    let services: Value = serde_json::from_str(&result.text).unwrap();
    assert_eq!(services[0]["name"], "bazarr");
    assert_eq!(services[0]["has_spec"], false);
    assert_eq!(services[1]["name"], "sonarr");
    assert_eq!(services[1]["display_name"], "Sonarr");
    assert_eq!(services[1]["auth_method"], "header");
    assert_eq!(services[1]["has_spec"], true);
    assert_eq!(services[1]["endpoints"], 4);
}

#[tokio::test]
async fn test_list_endpoints_groups_by_tag() {
    let h = default_harness().await;
    let result = call(&h.toolkit, "list_endpoints", json!({"service": "sonarr"})).await;

    assert!(!result.is_error);
    assert!(result.text.starts_with("# sonarr API Endpoints (4)"));
    assert!(result.text.contains("## Series\n- GET /api/v3/series: List series\n"));
    assert!(result.text.contains("## untagged\n- GET /api/v3/ping: Liveness\n"));

    let result = call(
        &h.toolkit,
        "list_endpoints",
        json!({"service": "sonarr", "tag": "calendar"}),
    )
    .await;
    assert!(result.text.contains("(1)"));

    let result = call(
        &h.toolkit,
        "list_endpoints",
        json!({"service": "sonarr", "method": "DELETE"}),
    )
    .await;
    assert_eq!(result.text, "No endpoints match the given filters.");
}

#[tokio::test]
async fn test_list_endpoints_errors() {
    let h = default_harness().await;

    let result = call(&h.toolkit, "list_endpoints", json!({})).await;
    assert!(result.is_error);
    assert_eq!(result.text, "service is required");

    let result = call(&h.toolkit, "list_endpoints", json!({"service": "lidarr"})).await;
    assert!(result.is_error);
    assert!(result.text.contains("not configured"));

    let result = call(&h.toolkit, "list_endpoints", json!({"service": "bazarr"})).await;
    assert!(result.is_error);
    assert!(result.text.contains("refresh_api_specs"));
}

#[tokio::test]
async fn test_search_api_format() {
    let h = default_harness().await;

    let result = call(&h.toolkit, "search_api", json!({"query": "upcoming"})).await;
    assert!(!result.is_error);
    assert!(result.text.contains("(1 matches)"));
    assert!(result.text.contains("**[sonarr]** GET /api/v3/calendar\n  Upcoming episodes\n"));

    let result = call(&h.toolkit, "search_api", json!({"query": "nothing-here"})).await;
    assert_eq!(result.text, "No results found.");

    let result = call(&h.toolkit, "search_api", json!({"service": "sonarr"})).await;
    assert!(result.is_error);
}

#[tokio::test]
async fn test_endpoint_details() {
    let h = default_harness().await;

    let result = call(
        &h.toolkit,
        "get_endpoint_details",
        json!({"service": "sonarr", "path": "/api/v3/series/42"}),
    )
    .await;
    assert!(!result.is_error);
    let detail: Value = serde_json::from_str(&result.text).unwrap();
    assert_eq!(detail["path"], "/api/v3/series/{id}");
    assert_eq!(detail["method"], "GET");
    assert_eq!(detail["responses"]["200"], "Successful response");

    // Unknown methods fall back to GET.
    let result = call(
        &h.toolkit,
        "get_endpoint_details",
        json!({"service": "sonarr", "path": "/calendar", "method": "put"}),
    )
    .await;
    let detail: Value = serde_json::from_str(&result.text).unwrap();
    assert_eq!(detail["path"], "/api/v3/calendar");

    let result = call(
        &h.toolkit,
        "get_endpoint_details",
        json!({"service": "sonarr", "path": "/nowhere/at/all"}),
    )
    .await;
    assert!(result.is_error);
    assert!(result.text.contains("not found"));

    let result = call(&h.toolkit, "get_endpoint_details", json!({"service": "sonarr"})).await;
    assert_eq!(result.text, "service and path are required");
}

#[tokio::test]
async fn test_refresh_tool() {
    let h = default_harness().await;

    let result = call(&h.toolkit, "refresh_api_specs", json!({"service": "sonarr"})).await;
    assert!(!result.is_error);
    assert_eq!(result.text, "Refreshed spec for sonarr (4 endpoints)");

    let result = call(&h.toolkit, "refresh_api_specs", json!({"service": "bazarr"})).await;
    assert!(result.is_error);
    assert!(result.text.starts_with("failed to refresh bazarr"));

    let result = call(&h.toolkit, "refresh_api_specs", json!({})).await;
    assert_eq!(result.text, "All specs refreshed successfully");
}

#[tokio::test]
async fn test_refresh_failure_text_is_short() {
    let h = default_harness().await;
    h.server.fail("sonarr.json", 500);
    let url = h.server.url("sonarr.json");

    let result = call(&h.toolkit, "refresh_api_specs", json!({"service": "sonarr"})).await;
    assert!(result.is_error);
    assert_eq!(
        result.text,
        "failed to refresh sonarr: documentation download failed (HTTP 500)"
    );
    assert!(!result.text.contains(&url));

    let result = call(&h.toolkit, "refresh_api_specs", json!({})).await;
    assert!(!result.is_error);
    assert_eq!(
        result.text,
        "Refresh completed with errors:\n- sonarr: documentation download failed (HTTP 500)\n"
    );
}

#[tokio::test]
async fn test_call_api_shapes_response() {
    let transport = FakeTransport::new(200, series(30).to_string());
    let h = harness("", transport).await;

    let result = call(
        &h.toolkit,
        "call_api",
        json!({
            "service": "sonarr",
            "path": "/series",
            "query": {"includeSeasonImages": false, "term": "the wire"},
            "fields": "id,title,statistics.sizeOnDisk",
            "filter": "year:gt:2010",
            "limit": 2
        }),
    )
    .await;
    assert!(!result.is_error, "{}", result.text);

    let shaped: Value = serde_json::from_str(&result.text).unwrap();
    assert_eq!(
        shaped,
        json!([
            {"id": 21, "title": "Series 21", "statistics": {"sizeOnDisk": 21000}},
            {"id": 22, "title": "Series 22", "statistics": {"sizeOnDisk": 22000}}
        ])
    );

    let calls = h.transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, "GET");
    assert_eq!(calls[0].path, "/series");
    assert_eq!(
        calls[0].query,
        vec![
            ("includeSeasonImages".to_string(), "false".to_string()),
            ("term".to_string(), "the wire".to_string()),
        ]
    );
    assert_eq!(calls[0].body, None);
}

#[tokio::test]
async fn test_call_api_oversized_response_returns_guidance() {
    let transport = FakeTransport::new(200, series(50).to_string());
    let h = harness("max_response_size_kb: 1\n", transport).await;

    let result = call(&h.toolkit, "call_api", json!({"service": "sonarr", "path": "/series"})).await;
    assert!(result.is_error);

    let report: Value = serde_json::from_str(&result.text).unwrap();
    assert_eq!(report["fieldPath"], "");
    assert_eq!(report["itemCount"], 50);
    assert_eq!(
        report["availableFields"],
        json!(["id", "title", "year", "overview", "statistics"])
    );
    assert!(report["sizeKB"].as_u64().unwrap() > 1);

    // Narrowing the request brings it under the limit.
    let result = call(
        &h.toolkit,
        "call_api",
        json!({"service": "sonarr", "path": "/series", "fields": "id", "limit": "5"}),
    )
    .await;
    assert!(!result.is_error);
}

#[tokio::test]
async fn test_call_api_delete_requires_opt_in() {
    let h = default_harness().await;
    let args = json!({"service": "sonarr", "path": "/series/3", "method": "delete"});

    let result = call(&h.toolkit, "call_api", args.clone()).await;
    assert!(result.is_error);
    assert!(result.text.contains("allow_destructive"));
    assert!(h.transport.calls().is_empty());

    let transport = FakeTransport::new(200, "{}");
    let h = harness("allow_destructive: true\n", transport).await;
    let result = call(&h.toolkit, "call_api", args).await;
    assert!(!result.is_error);
    assert_eq!(h.transport.calls()[0].method, "DELETE");
}

#[tokio::test]
async fn test_call_api_passes_body() {
    let h = default_harness().await;
    let result = call(
        &h.toolkit,
        "call_api",
        json!({
            "service": "sonarr",
            "path": "/command",
            "method": "POST",
            "body": "{\"name\": \"RefreshSeries\"}"
        }),
    )
    .await;
    assert!(!result.is_error);
    assert_eq!(
        h.transport.calls()[0].body.as_deref(),
        Some(br#"{"name": "RefreshSeries"}"#.as_slice())
    );

    let result = call(
        &h.toolkit,
        "call_api",
        json!({"service": "sonarr", "path": "/command", "method": "POST", "body": "{oops"}),
    )
    .await;
    assert!(result.is_error);
    assert_eq!(result.text, "invalid body JSON");
}

#[tokio::test]
async fn test_call_api_non_json_and_error_status() {
    let h = harness("", FakeTransport::new(200, "pong")).await;
    let result = call(&h.toolkit, "call_api", json!({"service": "sonarr", "path": "/ping"})).await;
    assert!(!result.is_error);
    assert_eq!(result.text, "status: 200\npong");

    let h = harness("", FakeTransport::new(404, r#"{"message": "NotFound"}"#)).await;
    let result = call(&h.toolkit, "call_api", json!({"service": "sonarr", "path": "/series/999"})).await;
    assert!(result.is_error);
    assert!(result.text.starts_with("status: 404"));
}

#[tokio::test]
async fn test_call_api_unknown_service() {
    let h = default_harness().await;

    let result = call(&h.toolkit, "call_api", json!({"service": "lidarr", "path": "/artist"})).await;
    assert!(result.is_error);
    assert!(result.text.contains("not configured"));

    let result = call(&h.toolkit, "call_api", json!({"service": "sonarr"})).await;
    assert_eq!(result.text, "service and path are required");
}

#[tokio::test]
async fn test_shape_response_tool() {
    let h = default_harness().await;
    let payload = json!({
        "page": 1,
        "totalRecords": 3,
        "records": [
            {"id": 1, "title": "Alpha", "quality": {"name": "HD"}},
            {"id": 2, "title": "Beta", "quality": {"name": "SD"}},
            {"id": 3, "title": "Gamma", "quality": {"name": "HD"}}
        ]
    });

    let result = call(
        &h.toolkit,
        "shape_response",
        json!({
            "json": payload,
            "fields": "totalRecords,records.title",
            "filter": "quality.name:eq:hd"
        }),
    )
    .await;
    assert!(!result.is_error);
    let shaped: Value = serde_json::from_str(&result.text).unwrap();
    assert_eq!(
        shaped,
        json!({"totalRecords": 3, "records": [{"title": "Alpha"}, {"title": "Gamma"}]})
    );

    let result = call(&h.toolkit, "shape_response", json!({"fields": "id"})).await;
    assert!(result.is_error);
}

#[tokio::test]
async fn test_unknown_tool_and_bad_arguments() {
    let h = default_harness().await;

    let result = call(&h.toolkit, "scrape_docs", Value::Null).await;
    assert!(result.is_error);
    assert!(result.text.contains("unknown tool"));

    let result = call(&h.toolkit, "search_api", json!({"query": 42})).await;
    assert!(result.is_error);
    assert!(result.text.starts_with("invalid arguments"));
}
