//! Request plumbing for the configured services. The shaping engine only sees
//! the decoded body, so anything implementing [`Transport`] can feed it.

pub mod auth;
pub mod service;

pub use auth::{AuthMethod, Credentials};
pub use service::ServiceClient;

use crate::error::TransportError;
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn perform_request(
        &self,
        method: &str,
        path: &str,
        query: &[(String, String)],
        body: Option<Vec<u8>>,
    ) -> Result<ApiResponse, TransportError>;
}
