use anyhow::{Context, Result};
use arr_navigator::{web, Config, ToolKit, ToolResult};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "arr-navigator")]
#[command(about = "Browse and call the APIs of your *arr services")]
struct Cli {
    /// Config file (defaults to <config dir>/arr-navigator/config.yaml)
    #[arg(short, long, global = true, env = "ARR_NAVIGATOR_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP tool server
    Serve {
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },
    /// List configured services and their spec status
    Services,
    /// List the endpoints of one service
    Endpoints {
        service: String,
        #[arg(short, long)]
        tag: Option<String>,
        #[arg(short, long)]
        method: Option<String>,
    },
    /// Search endpoint paths, summaries, descriptions and tags
    Search {
        query: String,
        #[arg(short, long)]
        service: Option<String>,
    },
    /// Show parameters, request body and responses of one endpoint
    Detail {
        service: String,
        path: String,
        #[arg(short, long)]
        method: Option<String>,
    },
    /// Re-fetch OpenAPI specs, ignoring the cache
    Refresh { service: Option<String> },
    /// Shape a JSON document read from a file or stdin
    Shape {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(long)]
        fields: Option<String>,
        #[arg(long)]
        filter: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Make an authenticated API call
    Call {
        service: String,
        path: String,
        #[arg(short, long, default_value = "GET")]
        method: String,
        /// Query parameters as a JSON object
        #[arg(short, long)]
        query: Option<String>,
        /// Request body as JSON
        #[arg(short, long)]
        body: Option<String>,
        #[arg(long)]
        fields: Option<String>,
        #[arg(long)]
        filter: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "arr_navigator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling");
            on_signal.cancel();
        }
    });

    // Shaping works without any services configured.
    let config = match &cli.command {
        Commands::Shape { .. } => load_config_or_default(cli.config.as_deref())?,
        _ => Config::load(cli.config.as_deref())?,
    };
    let toolkit = Arc::new(ToolKit::from_config(config)?);

    let (tool, args) = match cli.command {
        Commands::Serve { port } => {
            let loaded = toolkit.store().load_all(&cancel).await;
            tracing::info!(loaded, "Specs ready");
            return web::run_server(toolkit, port, cancel).await;
        }
        Commands::Services => {
            toolkit.store().load_all(&cancel).await;
            ("list_services", Value::Null)
        }
        Commands::Endpoints { service, tag, method } => {
            toolkit.store().load_all(&cancel).await;
            (
                "list_endpoints",
                json!({ "service": service, "tag": tag, "method": method }),
            )
        }
        Commands::Search { query, service } => {
            toolkit.store().load_all(&cancel).await;
            ("search_api", json!({ "query": query, "service": service }))
        }
        Commands::Detail { service, path, method } => {
            toolkit.store().load_all(&cancel).await;
            (
                "get_endpoint_details",
                json!({ "service": service, "path": path, "method": method }),
            )
        }
        Commands::Refresh { service } => ("refresh_api_specs", json!({ "service": service })),
        Commands::Shape {
            input,
            fields,
            filter,
            limit,
        } => {
            let document = read_input(input.as_deref())?;
            (
                "shape_response",
                json!({ "json": document, "fields": fields, "filter": filter, "limit": limit }),
            )
        }
        Commands::Call {
            service,
            path,
            method,
            query,
            body,
            fields,
            filter,
            limit,
        } => (
            "call_api",
            json!({
                "service": service,
                "path": path,
                "method": method,
                "query": query,
                "body": body,
                "fields": fields,
                "filter": filter,
                "limit": limit,
            }),
        ),
    };

    let result = toolkit.dispatch(tool, args, &cancel).await;
    print_result(result)
}

fn load_config_or_default(path: Option<&Path>) -> Result<Config> {
    let explicit = path.is_some();
    match Config::load(path) {
        Ok(config) => Ok(config),
        Err(_) if !explicit && !Config::default_path().exists() => Config::from_yaml_str("{}"),
        Err(e) => Err(e),
    }
}

fn read_input(path: Option<&Path>) -> Result<Value> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut raw = String::new();
            std::io::stdin().read_to_string(&mut raw).context("reading stdin")?;
            raw
        }
    };
    serde_json::from_str(&raw).context("input is not valid JSON")
}

fn print_result(result: ToolResult) -> Result<()> {
    if result.is_error {
        anyhow::bail!("{}", result.text);
    }
    println!("{}", result.text);
    Ok(())
}
