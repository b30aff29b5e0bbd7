//! HTTP implementations of the placement collaborators.
//!
//! All three collaborators share one [`ApiClient`], which owns the
//! connection pool, the bearer token and the status-to-error mapping.

use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::services::PlacementServices;
use crate::tracing::{current_or_new_request_id, REQUEST_ID_HEADER};

mod location;
mod placements;

pub use location::HttpLocationQuery;
pub use placements::{HttpPlacementClient, HttpRelocationClient};

/// Shared HTTP client for the placement API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a client for the API rooted at `base_url`, e.g.
    /// `https://assets.example.com/api/v1`.
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .gzip(true)
            .build()?;
        Self::with_client(client, base_url, token)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        base_url: &str,
        token: Option<String>,
    ) -> Result<Self, ServiceError> {
        let parsed = Url::parse(base_url).map_err(|e| {
            ServiceError::InternalError(format!("invalid API base URL {:?}: {}", base_url, e))
        })?;
        Ok(Self {
            client,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        Self::new(
            &config.api_base_url,
            config.api_token.clone(),
            config.request_timeout(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Starts a request against `path` (relative, leading slash) carrying
    /// the current request id and the bearer token.
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let request_id = current_or_new_request_id();
        debug!(%method, %url, request_id = %request_id, "calling placement API");

        let builder = self
            .client
            .request(method, url)
            .header(REQUEST_ID_HEADER, request_id.as_str());
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends the request and decodes a JSON body.
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ServiceError> {
        let response = request.send().await?;
        Self::parse_response(response).await
    }

    /// Sends the request and discards the body.
    pub(crate) async fn send_empty(&self, request: RequestBuilder) -> Result<(), ServiceError> {
        let response = request.send().await?;
        Self::ensure_success(response).await.map(|_| ())
    }

    /// Ensure the response has a success status code. Returns the response
    /// unchanged on success, or the mapped error carrying the body text.
    async fn ensure_success(response: Response) -> Result<Response, ServiceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
        Err(ServiceError::from_response(status, body))
    }

    async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T, ServiceError> {
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ServiceError::InvalidResponse(e.to_string()))
    }
}

impl PlacementServices {
    /// Wires every collaborator, atomic relocation included, to the HTTP API.
    pub fn http(api: ApiClient) -> Self {
        PlacementServices::new(
            Arc::new(HttpLocationQuery::new(api.clone())),
            Arc::new(HttpPlacementClient::site(api.clone())),
            Arc::new(HttpPlacementClient::warehouse(api.clone())),
        )
        .with_atomic_relocation(Arc::new(HttpRelocationClient::new(api)))
    }
}
