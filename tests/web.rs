mod common;

use arr_navigator::tools::TOOL_CATALOG;
use arr_navigator::{web, Config, ToolKit, ToolResult};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use warp::http::StatusCode;

fn toolkit(cache: &std::path::Path) -> Arc<ToolKit> {
    let config = Config::from_yaml_str("max_response_size_kb: 4\n").unwrap();
    let store = Arc::new(common::store(config.spec_sources(), cache));
    Arc::new(ToolKit::new(config, store, BTreeMap::new()))
}

#[tokio::test]
async fn test_health() {
    let dir = tempfile::tempdir().unwrap();
    let routes = web::routes(toolkit(dir.path()), CancellationToken::new());

    let response = warp::test::request().path("/health").reply(&routes).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["specs_loaded"], 0);
}

#[tokio::test]
async fn test_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let routes = web::routes(toolkit(dir.path()), CancellationToken::new());

    let response = warp::test::request().path("/tools").reply(&routes).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(response.body()).unwrap();
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names.len(), TOOL_CATALOG.len());
    assert!(names.contains(&"call_api"));
}

#[tokio::test]
async fn test_invoke_tool() {
    let dir = tempfile::tempdir().unwrap();
    let routes = web::routes(toolkit(dir.path()), CancellationToken::new());

    let response = warp::test::request()
        .method("POST")
        .path("/tools/shape_response")
        .json(&json!({"json": [{"a": 1, "b": 2}, {"a": 3, "b": 4}], "fields": "a", "limit": 1}))
        .reply(&routes)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let result: ToolResult = serde_json::from_slice(response.body()).unwrap();
    assert!(!result.is_error);
    let shaped: Value = serde_json::from_str(&result.text).unwrap();
    assert_eq!(shaped, json!([{"a": 1}]));
}

#[tokio::test]
async fn test_invoke_without_body() {
    let dir = tempfile::tempdir().unwrap();
    let routes = web::routes(toolkit(dir.path()), CancellationToken::new());

    let response = warp::test::request()
        .method("POST")
        .path("/tools/list_services")
        .reply(&routes)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let result: ToolResult = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(result.text, "[]");
}

#[tokio::test]
async fn test_oversized_payload_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let routes = web::routes(toolkit(dir.path()), CancellationToken::new());
    let records: Vec<Value> = (0..100)
        .map(|i| json!({"id": i, "name": format!("indexer {i}"), "notes": "n".repeat(64)}))
        .collect();

    let response = warp::test::request()
        .method("POST")
        .path("/tools/shape_response")
        .json(&json!({"json": {"records": records, "page": 1}}))
        .reply(&routes)
        .await;
    let result: ToolResult = serde_json::from_slice(response.body()).unwrap();
    assert!(result.is_error);

    let report: Value = serde_json::from_str(&result.text).unwrap();
    assert_eq!(report["fieldPath"], "records");
    assert_eq!(report["itemCount"], 100);
    assert_eq!(report["availableFields"], json!(["id", "name", "notes"]));
}

#[tokio::test]
async fn test_unknown_tool_and_bad_body() {
    let dir = tempfile::tempdir().unwrap();
    let routes = web::routes(toolkit(dir.path()), CancellationToken::new());

    let response = warp::test::request()
        .method("POST")
        .path("/tools/scrape")
        .body("{}")
        .reply(&routes)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = warp::test::request()
        .method("POST")
        .path("/tools/search_api")
        .body("{not json")
        .reply(&routes)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let result: ToolResult = serde_json::from_slice(response.body()).unwrap();
    assert!(result.is_error);
}
