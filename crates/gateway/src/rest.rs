//! REST seam shared by exchange adapters
//!
//! Adapters describe a request as a [`RestRequest`], a [`RequestSigner`]
//! decorates it, and a [`RestTransport`] executes it. Tests substitute the
//! transport; production uses [`HttpRestClient`].

use async_trait::async_trait;
use chrono::Utc;
use meridian_core::Timestamp;
use reqwest::{Client, Method};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::RestError;

/// Timeout applied to every request by [`HttpRestClient`]
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Exchange-agnostic description of one REST call
#[derive(Debug, Clone, PartialEq)]
pub struct RestRequest {
    pub method: Method,
    pub path: String,
    pub params: Vec<(String, String)>,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl RestRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: Vec::new(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        let mut request = Self::new(Method::POST, path);
        request.body = Some(body);
        request
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }
}

/// Adds authentication to a request.
///
/// Implementations must be pure: the output depends only on the request,
/// the signer's credentials and `now`.
pub trait RequestSigner: Send + Sync {
    fn sign(&self, request: RestRequest, now: Timestamp) -> RestRequest;
}

/// Public endpoints only
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSigning;

impl RequestSigner for NoSigning {
    fn sign(&self, request: RestRequest, _now: Timestamp) -> RestRequest {
        request
    }
}

/// Executes a request and returns the decoded JSON body
#[async_trait]
pub trait RestTransport: Send + Sync {
    async fn request(&self, request: RestRequest) -> Result<Value, RestError>;
}

/// reqwest-backed [`RestTransport`]
#[derive(Clone)]
pub struct HttpRestClient {
    client: Client,
    base_url: String,
    signer: Arc<dyn RequestSigner>,
}

impl HttpRestClient {
    pub fn new(
        base_url: impl Into<String>,
        signer: Arc<dyn RequestSigner>,
        timeout: Duration,
    ) -> Result<Self, RestError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            signer,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn handle_response(resp: reqwest::Response) -> Result<Value, RestError> {
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(RestError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| RestError::Parse(e.to_string()))
    }
}

#[async_trait]
impl RestTransport for HttpRestClient {
    async fn request(&self, request: RestRequest) -> Result<Value, RestError> {
        let request = self.signer.sign(request, Utc::now());
        let url = format!("{}{}", self.base_url, request.path);
        debug!(method = %request.method, %url, "REST request");

        let mut builder = self.client.request(request.method.clone(), &url);
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        Self::handle_response(resp).await
    }
}
