//! Navigation of self-hosted media-management service APIs: OpenAPI
//! documentation is fetched, cached and indexed per service, and JSON
//! responses are projected, filtered and size-limited before they are
//! handed back.

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod shaping;
pub mod spec;
pub mod tools;
pub mod web;

pub use config::{Config, ServiceConfig};
pub use error::{FetchFailure, FilterError, SpecError, TransportError};
pub use tools::{CallRequest, ToolKit, ToolResult};
