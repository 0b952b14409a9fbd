use crate::client::auth::Credentials;
use crate::client::{ApiResponse, Transport};
use crate::error::TransportError;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use std::time::Duration;

/// Authenticated HTTP client for one configured service.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    name: String,
    base_url: String,
    credentials: Credentials,
    client: reqwest::Client,
}

impl ServiceClient {
    /// `base_url` already includes the API prefix, e.g.
    /// `http://10.0.0.5:8989/api/v3`.
    pub fn new(
        name: &str,
        base_url: &str,
        credentials: Credentials,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            name: name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            client,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for ServiceClient {
    async fn perform_request(
        &self,
        method: &str,
        path: &str,
        query: &[(String, String)],
        body: Option<Vec<u8>>,
    ) -> Result<ApiResponse, TransportError> {
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| TransportError::InvalidMethod(method.to_string()))?;
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header(ACCEPT, "application/json");
        request = self.credentials.apply(request);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            if [Method::POST, Method::PUT, Method::PATCH].contains(&method) {
                request = request.header(CONTENT_TYPE, "application/json");
            }
            request = request.body(body);
        }

        tracing::debug!(service = %self.name, %method, %url, "Calling service API");
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        Ok(ApiResponse { status, body })
    }
}
