//! Request execution with mirror fallback
//!
//! Every CurseForge call goes through [`FallbackExecutor::execute`], which makes
//! exactly one pass over the configured endpoints:
//!
//! - 2xx with a body: done
//! - 4xx: the request is wrong, stop without touching the mirrors
//! - 5xx, other statuses, empty body, recoverable transport errors: try the next endpoint
//!
//! There is no backoff and no second pass.

use reqwest::StatusCode;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::metadata::config::CurseForgeConfig;
use crate::metadata::core::{EndpointKind, MetadataError, Result};
use crate::metadata::http::{self, ApiRequest, ApiResponse, ApiTransport, ReqwestTransport};

/// How a single endpoint attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    ClientError(u16),
    /// 5xx, any other non-2xx status, or 2xx with an empty body
    ServerError(u16),
    NetworkError,
}

impl AttemptOutcome {
    /// Classify a completed HTTP exchange
    pub fn classify(status: StatusCode, body_len: usize) -> Self {
        if status.is_success() {
            if body_len > 0 {
                AttemptOutcome::Success
            } else {
                AttemptOutcome::ServerError(status.as_u16())
            }
        } else if status.is_client_error() {
            AttemptOutcome::ClientError(status.as_u16())
        } else {
            AttemptOutcome::ServerError(status.as_u16())
        }
    }
}

/// One endpoint tried during a single `execute` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointAttempt {
    pub base_url: String,
    pub outcome: AttemptOutcome,
}

/// The first successful response and how we got there
#[derive(Debug, Clone)]
pub struct FallbackResponse {
    pub response: ApiResponse,
    /// Full URL that produced the response
    pub url: String,
    pub attempts: Vec<EndpointAttempt>,
}

impl FallbackResponse {
    /// Whether a mirror rather than the primary endpoint answered
    pub fn served_by_mirror(&self) -> bool {
        self.attempts.len() > 1
    }
}

/// Executes CurseForge requests against the primary endpoint and its mirrors
#[derive(Clone)]
pub struct FallbackExecutor {
    endpoints: Vec<String>,
    api_key: String,
    user_agent: String,
    transport: Arc<dyn ApiTransport>,
}

impl FallbackExecutor {
    /// Create an executor with a reqwest transport built from `config`
    pub fn new(config: &CurseForgeConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::from_config(config)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create an executor over a caller-supplied transport
    pub fn with_transport(config: &CurseForgeConfig, transport: Arc<dyn ApiTransport>) -> Result<Self> {
        config.validate()?;
        let api_key = config.require_api_key()?.to_string();

        Ok(Self {
            endpoints: config.endpoints.clone(),
            api_key,
            user_agent: config.user_agent.clone(),
            transport,
        })
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// POST `payload` as JSON to `endpoint_path` on each endpoint in turn
    ///
    /// `operation` is a human-readable name ("file data", "mod data") used in
    /// logs and errors.
    pub async fn execute<P: Serialize + ?Sized>(
        &self,
        endpoint_path: &str,
        payload: &P,
        operation: &str,
    ) -> Result<FallbackResponse> {
        if self.endpoints.is_empty() {
            return Err(MetadataError::configuration(
                "endpoint list is empty",
                Some("endpoints"),
                None,
            ));
        }

        let body = serde_json::to_vec(payload).map_err(|e| MetadataError::RequestEncoding {
            operation: operation.to_string(),
            source: e,
        })?;

        let mut attempts = Vec::with_capacity(self.endpoints.len());
        let mut last_error = None;

        for (index, base_url) in self.endpoints.iter().enumerate() {
            let kind = EndpointKind::from_index(index);
            let url = format!("{}{}", base_url, endpoint_path);
            info!("Attempting CurseForge {} via {} API: {}", operation, kind, url);

            let result = self.transport.execute(self.build_request(&url, body.clone())).await;

            let (outcome, error) = match result {
                Ok(response) => {
                    let outcome = AttemptOutcome::classify(response.status, response.body.len());
                    let error = match outcome {
                        AttemptOutcome::Success => {
                            attempts.push(EndpointAttempt {
                                base_url: base_url.clone(),
                                outcome,
                            });
                            if kind == EndpointKind::Mirror {
                                info!("Successfully retrieved {} from {} API", operation, kind);
                            }
                            return Ok(FallbackResponse { response, url, attempts });
                        }
                        AttemptOutcome::ClientError(status) => MetadataError::ClientRequest {
                            operation: operation.to_string(),
                            url,
                            status,
                        },
                        // classify() never reports NetworkError for a completed exchange
                        AttemptOutcome::ServerError(_) | AttemptOutcome::NetworkError => {
                            MetadataError::ServerUnavailable {
                                endpoint_kind: kind,
                                url,
                                status: response.status.as_u16(),
                            }
                        }
                    };
                    (outcome, error)
                }
                Err(e) => (AttemptOutcome::NetworkError, e),
            };

            attempts.push(EndpointAttempt {
                base_url: base_url.clone(),
                outcome,
            });

            if !error.is_recoverable() {
                warn!("{} API rejected {}: {}, not trying mirrors", kind, operation, error);
                return Err(error);
            }

            warn!("{} API failed for {}: {}, trying next endpoint...", kind, operation, error);
            last_error = Some(error);
        }

        let source = last_error.unwrap_or_else(|| {
            MetadataError::configuration("no endpoint produced a response", Some("endpoints"), None)
        });

        Err(MetadataError::EndpointsExhausted {
            operation: operation.to_string(),
            attempts: attempts.len(),
            source: Box::new(source),
        })
    }

    fn build_request(&self, url: &str, body: Vec<u8>) -> ApiRequest {
        ApiRequest {
            url: url.to_string(),
            headers: vec![
                (http::ACCEPT, "application/json".to_string()),
                (http::CONTENT_TYPE, "application/json".to_string()),
                (http::USER_AGENT, self.user_agent.clone()),
                (http::API_KEY, self.api_key.clone()),
            ],
            body,
        }
    }
}

impl std::fmt::Debug for FallbackExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackExecutor")
            .field("endpoints", &self.endpoints)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Transport that replays canned results and records requested URLs
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<ApiResponse>>>,
        seen: Mutex<Vec<ApiRequest>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<ApiResponse>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn urls(&self) -> Vec<String> {
            self.seen.lock().unwrap().iter().map(|r| r.url.clone()).collect()
        }
    }

    #[async_trait]
    impl ApiTransport for ScriptedTransport {
        async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
            self.seen.lock().unwrap().push(request);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .expect("transport called more often than scripted")
        }
    }

    fn refused(url: &str) -> MetadataError {
        MetadataError::Transport {
            url: url.to_string(),
            source: Box::new(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused")),
        }
    }

    fn config() -> CurseForgeConfig {
        CurseForgeConfig::default()
            .with_api_key("test-key")
            .with_endpoints(["https://primary.test/v1", "https://mirror.test/v1"])
    }

    #[test]
    fn test_classify() {
        assert_eq!(AttemptOutcome::classify(StatusCode::OK, 12), AttemptOutcome::Success);
        assert_eq!(AttemptOutcome::classify(StatusCode::OK, 0), AttemptOutcome::ServerError(200));
        assert_eq!(AttemptOutcome::classify(StatusCode::NOT_FOUND, 5), AttemptOutcome::ClientError(404));
        assert_eq!(AttemptOutcome::classify(StatusCode::BAD_GATEWAY, 5), AttemptOutcome::ServerError(502));
        assert_eq!(
            AttemptOutcome::classify(StatusCode::PERMANENT_REDIRECT, 0),
            AttemptOutcome::ServerError(308)
        );
    }

    #[test]
    fn test_executor_requires_api_key() {
        let transport = ScriptedTransport::new(vec![]);
        let config = CurseForgeConfig::default().with_endpoints(["https://primary.test/v1"]);
        let result = FallbackExecutor::with_transport(&config, transport);
        assert!(matches!(result, Err(MetadataError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_primary_success_skips_mirror() {
        let transport = ScriptedTransport::new(vec![Ok(ApiResponse::new(StatusCode::OK, r#"{"data":[]}"#))]);
        let executor = FallbackExecutor::with_transport(&config(), transport.clone()).unwrap();

        let response = executor.execute("/mods/files", &serde_json::json!({"fileIds": [1]}), "file data").await.unwrap();

        assert!(!response.served_by_mirror());
        assert_eq!(response.url, "https://primary.test/v1/mods/files");
        assert_eq!(transport.urls(), vec!["https://primary.test/v1/mods/files"]);
    }

    #[tokio::test]
    async fn test_network_error_falls_back_to_mirror() {
        let transport = ScriptedTransport::new(vec![
            Err(refused("https://primary.test/v1/mods")),
            Ok(ApiResponse::new(StatusCode::OK, r#"{"data":[]}"#)),
        ]);
        let executor = FallbackExecutor::with_transport(&config(), transport.clone()).unwrap();

        let response = executor.execute("/mods", &serde_json::json!({"modIds": [5]}), "mod data").await.unwrap();

        assert!(response.served_by_mirror());
        assert_eq!(
            response.attempts,
            vec![
                EndpointAttempt { base_url: "https://primary.test/v1".to_string(), outcome: AttemptOutcome::NetworkError },
                EndpointAttempt { base_url: "https://mirror.test/v1".to_string(), outcome: AttemptOutcome::Success },
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_body_falls_back_to_mirror() {
        let transport = ScriptedTransport::new(vec![
            Ok(ApiResponse::new(StatusCode::OK, Vec::new())),
            Ok(ApiResponse::new(StatusCode::OK, r#"{"data":[]}"#)),
        ]);
        let executor = FallbackExecutor::with_transport(&config(), transport.clone()).unwrap();

        let response = executor.execute("/mods", &serde_json::json!({"modIds": [5]}), "mod data").await.unwrap();
        assert_eq!(response.url, "https://mirror.test/v1/mods");
    }

    #[tokio::test]
    async fn test_client_error_does_not_try_mirror() {
        let transport = ScriptedTransport::new(vec![Ok(ApiResponse::new(StatusCode::FORBIDDEN, "nope"))]);
        let executor = FallbackExecutor::with_transport(&config(), transport.clone()).unwrap();

        let err = executor.execute("/mods/files", &serde_json::json!({"fileIds": [1]}), "file data").await.unwrap_err();

        match err {
            MetadataError::ClientRequest { operation, status, .. } => {
                assert_eq!(operation, "file data");
                assert_eq!(status, 403);
            }
            other => panic!("Expected ClientRequest error, got {:?}", other),
        }
        assert_eq!(transport.urls().len(), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_carries_last_error() {
        let transport = ScriptedTransport::new(vec![
            Ok(ApiResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "oops")),
            Err(refused("https://mirror.test/v1/mods/files")),
        ]);
        let executor = FallbackExecutor::with_transport(&config(), transport.clone()).unwrap();

        let err = executor.execute("/mods/files", &serde_json::json!({"fileIds": [1]}), "file data").await.unwrap_err();

        match err {
            MetadataError::EndpointsExhausted { operation, attempts, source } => {
                assert_eq!(operation, "file data");
                assert_eq!(attempts, 2);
                assert!(matches!(*source, MetadataError::Transport { .. }));
            }
            other => panic!("Expected EndpointsExhausted error, got {:?}", other),
        }
        assert_eq!(transport.urls().len(), 2);
    }

    #[tokio::test]
    async fn test_unrecoverable_transport_error_stops_the_pass() {
        let transport = ScriptedTransport::new(vec![Err(MetadataError::configuration(
            "transport misconfigured",
            None,
            None,
        ))]);
        let executor = FallbackExecutor::with_transport(&config(), transport.clone()).unwrap();

        let err = executor.execute("/mods", &serde_json::json!({"modIds": [5]}), "mod data").await.unwrap_err();

        assert!(matches!(err, MetadataError::Configuration { .. }));
        assert_eq!(transport.urls(), vec!["https://primary.test/v1/mods"]);
    }

    #[test]
    fn test_new_rejects_header_unsafe_api_key() {
        let result = FallbackExecutor::new(&config().with_api_key("abc\ndef"));
        assert!(matches!(result, Err(MetadataError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_request_carries_headers_and_body() {
        let transport = ScriptedTransport::new(vec![Ok(ApiResponse::new(StatusCode::OK, "{}"))]);
        let executor = FallbackExecutor::with_transport(&config().with_user_agent("ua/1.0"), transport.clone()).unwrap();

        executor.execute("/mods", &serde_json::json!({"modIds": [3, 4]}), "mod data").await.unwrap();

        let seen = transport.seen.lock().unwrap();
        let request = &seen[0];
        assert!(request.headers.contains(&(http::API_KEY, "test-key".to_string())));
        assert!(request.headers.contains(&(http::USER_AGENT, "ua/1.0".to_string())));
        assert!(request.headers.contains(&(http::ACCEPT, "application/json".to_string())));
        assert_eq!(request.body, br#"{"modIds":[3,4]}"#.to_vec());
    }
}
