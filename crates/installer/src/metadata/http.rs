//! HTTP transport used by the fallback executor
//!
//! The executor only needs "send this request, give me status, headers and
//! body". `ApiTransport` captures that capability so the reqwest client can be
//! shared by the caller and swapped out in tests.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

use crate::metadata::config::CurseForgeConfig;
use crate::metadata::core::{MetadataError, Result};

pub const ACCEPT: &str = "accept";
pub const CONTENT_TYPE: &str = "content-type";
pub const USER_AGENT: &str = "user-agent";
pub const API_KEY: &str = "x-api-key";

/// A fully built POST request with a JSON body
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

/// Status, headers and body of a completed request
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }
}

/// Something that can execute an `ApiRequest`
///
/// Errors returned here are transport-level (connection refused, timeout,
/// unreadable body). HTTP error statuses are *not* errors at this layer.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    /// Reported in timeout errors
    timeout: Duration,
}

impl ReqwestTransport {
    /// Create a transport from resolver configuration
    pub fn from_config(config: &CurseForgeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| MetadataError::Transport {
                url: "<client>".to_string(),
                source: Box::new(e),
            })?;

        Ok(Self {
            client,
            timeout: config.timeout,
        })
    }

    /// Reuse an existing client (and its connection pool)
    ///
    /// `timeout` should be the timeout `client` was built with.
    pub fn with_client(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    fn request_error(&self, url: &str, error: reqwest::Error) -> MetadataError {
        if error.is_timeout() {
            MetadataError::NetworkTimeout {
                url: url.to_string(),
                timeout: self.timeout,
                source: Box::new(error),
            }
        } else {
            MetadataError::Transport {
                url: url.to_string(),
                source: Box::new(error),
            }
        }
    }
}

#[async_trait]
impl ApiTransport for ReqwestTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| MetadataError::Transport {
                url: request.url.clone(),
                source: Box::new(e),
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| MetadataError::Transport {
                url: request.url.clone(),
                source: Box::new(e),
            })?;
            headers.insert(name, value);
        }

        debug!("POST {} ({} bytes)", request.url, request.body.len());
        let response = self
            .client
            .post(&request.url)
            .headers(headers)
            .body(request.body)
            .send()
            .await
            .map_err(|e| self.request_error(&request.url, e))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.request_error(&request.url, e))?
            .to_vec();
        debug!("{} -> {} ({} bytes)", request.url, status, body.len());

        Ok(ApiResponse { status, headers, body })
    }
}
