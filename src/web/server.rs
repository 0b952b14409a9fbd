use crate::tools::{catalog, ToolKit, ToolResult, TOOL_CATALOG};
use serde_json::Value;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::{Filter, Rejection, Reply};

/// `GET /health`, `GET /tools` and `POST /tools/<name>`.
pub fn routes(
    toolkit: Arc<ToolKit>,
    cancel: CancellationToken,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let health_toolkit = toolkit.clone();
    let health_route = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(move || {
            let loaded = health_toolkit
                .store()
                .sources()
                .filter(|s| health_toolkit.store().get_index(&s.name).is_some())
                .count();
            warp::reply::json(&serde_json::json!({
                "status": "healthy",
                "services": health_toolkit.config().services.len(),
                "specs_loaded": loaded,
            }))
        });

    let catalog_route = warp::path("tools")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| warp::reply::json(&TOOL_CATALOG));

    let invoke_route = warp::path!("tools" / String)
        .and(warp::post())
        .and(warp::body::bytes())
        .and(with_toolkit(toolkit))
        .and(warp::any().map(move || cancel.child_token()))
        .and_then(invoke_tool);

    health_route
        .or(catalog_route)
        .or(invoke_route)
        .with(warp::cors().allow_any_origin())
        .with(warp::trace::request())
}

fn with_toolkit(
    toolkit: Arc<ToolKit>,
) -> impl Filter<Extract = (Arc<ToolKit>,), Error = Infallible> + Clone {
    warp::any().map(move || toolkit.clone())
}

async fn invoke_tool(
    name: String,
    body: Bytes,
    toolkit: Arc<ToolKit>,
    cancel: CancellationToken,
) -> Result<impl Reply, Rejection> {
    if catalog::find(&name).is_none() {
        let result = ToolResult::error(format!("unknown tool {name:?}"));
        return Ok(warp::reply::with_status(
            warp::reply::json(&result),
            StatusCode::NOT_FOUND,
        ));
    }

    let args = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        match serde_json::from_slice::<Value>(&body) {
            Ok(args) => args,
            Err(e) => {
                let result = ToolResult::error(format!("request body is not JSON: {e}"));
                return Ok(warp::reply::with_status(
                    warp::reply::json(&result),
                    StatusCode::BAD_REQUEST,
                ));
            }
        }
    };

    tracing::info!(tool = %name, "Tool invoked");
    let result = toolkit.dispatch(&name, args, &cancel).await;
    if result.is_error {
        tracing::debug!(tool = %name, error = %result.text, "Tool returned an error");
    }
    Ok(warp::reply::with_status(
        warp::reply::json(&result),
        StatusCode::OK,
    ))
}

/// Serve on localhost until `cancel` fires.
pub async fn run_server(
    toolkit: Arc<ToolKit>,
    port: u16,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let shutdown = cancel.clone();
    let (addr, server): (SocketAddr, _) = warp::serve(routes(toolkit, cancel))
        .try_bind_with_graceful_shutdown(([127, 0, 0, 1], port), async move {
            shutdown.cancelled().await
        })?;

    tracing::info!(%addr, "Server running");
    server.await;
    tracing::info!("Server stopped");
    Ok(())
}
