#![allow(dead_code)]

use arr_navigator::spec::{SpecCache, SpecFetcher, SpecSource, SpecStore};
use parking_lot::Mutex;
use serde_json::{json, Map};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use warp::http::StatusCode;
use warp::Filter;

/// Serves documents at `/<name>` and counts the requests it receives.
pub struct DocServer {
    pub addr: SocketAddr,
    docs: Arc<Mutex<HashMap<String, (u16, String)>>>,
    hits: Arc<AtomicUsize>,
}

impl DocServer {
    pub async fn spawn() -> Self {
        let docs: Arc<Mutex<HashMap<String, (u16, String)>>> = Arc::default();
        let hits = Arc::new(AtomicUsize::new(0));

        let route_docs = docs.clone();
        let route_hits = hits.clone();
        let route = warp::path!(String).map(move |name: String| {
            route_hits.fetch_add(1, Ordering::SeqCst);
            let (status, body) = route_docs
                .lock()
                .get(&name)
                .cloned()
                .unwrap_or((404, "not found".to_string()));
            warp::reply::with_status(body, StatusCode::from_u16(status).unwrap())
        });

        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        Self { addr, docs, hits }
    }

    pub fn url(&self, name: &str) -> String {
        format!("http://{}/{}", self.addr, name)
    }

    pub fn serve(&self, name: &str, body: impl Into<String>) {
        self.docs.lock().insert(name.to_string(), (200, body.into()));
    }

    pub fn fail(&self, name: &str, status: u16) {
        self.docs
            .lock()
            .insert(name.to_string(), (status, "upstream error".to_string()));
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// A minimal OpenAPI 3 document with one GET per `(path, tag, summary)`.
pub fn openapi_doc(endpoints: &[(&str, &str, &str)]) -> String {
    let mut paths = Map::new();
    for (path, tag, summary) in endpoints {
        let mut op = json!({
            "summary": summary,
            "responses": { "200": { "description": "Successful response" } }
        });
        if !tag.is_empty() {
            op["tags"] = json!([tag]);
        }
        paths.insert(path.to_string(), json!({ "get": op }));
    }
    json!({
        "openapi": "3.0.1",
        "info": { "title": "Test API", "version": "1.0" },
        "paths": paths
    })
    .to_string()
}

pub fn source(name: &str, url: Option<String>) -> SpecSource {
    SpecSource {
        name: name.to_string(),
        display_name: name.to_string(),
        spec_url: url,
    }
}

pub fn store(sources: Vec<SpecSource>, cache_dir: &std::path::Path) -> SpecStore {
    let fetcher = SpecFetcher::new(Duration::from_secs(5)).unwrap();
    SpecStore::new(sources, SpecCache::new(cache_dir), fetcher)
}
