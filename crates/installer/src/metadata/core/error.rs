//! Error types for CurseForge metadata resolution with context and recovery information

use std::error::Error;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while talking to the CurseForge API or its mirrors
///
/// Endpoint-level variants (`ServerUnavailable`, `Transport`, `NetworkTimeout`)
/// are recoverable: the fallback executor moves on to the next endpoint.
/// `ClientRequest` is never recoverable and stops the whole batch.
#[derive(Error, Debug)]
pub enum MetadataError {
    /// 4xx from an endpoint; the request itself is wrong, a mirror won't help
    #[error("Failed to resolve CurseForge metadata for {operation}: error code {status}")]
    ClientRequest {
        operation: String,
        url: String,
        status: u16,
    },

    /// 5xx, unexpected status, or a success response without a body
    #[error("{endpoint_kind} API returned error code {status} for '{url}'")]
    ServerUnavailable {
        endpoint_kind: EndpointKind,
        url: String,
        status: u16,
    },

    /// Connection failures, unreadable bodies and other transport problems
    #[error("Request to '{url}' failed")]
    Transport {
        url: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },

    /// Network timeout imposed by the transport
    #[error("Request to '{url}' timed out after {timeout:?}")]
    NetworkTimeout {
        url: String,
        timeout: Duration,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },

    /// Every configured endpoint failed with a recoverable error
    #[error("Failed to resolve CurseForge metadata for {operation}: all {attempts} endpoints failed")]
    EndpointsExhausted {
        operation: String,
        attempts: usize,
        #[source]
        source: Box<MetadataError>,
    },

    /// The response body did not match the expected schema
    #[error("Malformed {operation} response from '{url}'")]
    MalformedResponse {
        operation: String,
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// The request payload could not be serialized
    #[error("Failed to encode {operation} request")]
    RequestEncoding {
        operation: String,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration errors
    #[error("Invalid configuration: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
        suggestion: Option<String>,
    },
}

/// Whether an endpoint is the primary API or one of its mirrors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    Primary,
    Mirror,
}

impl EndpointKind {
    pub fn from_index(index: usize) -> Self {
        if index == 0 {
            EndpointKind::Primary
        } else {
            EndpointKind::Mirror
        }
    }
}

impl std::fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndpointKind::Primary => write!(f, "primary"),
            EndpointKind::Mirror => write!(f, "mirror"),
        }
    }
}

pub type Result<T> = std::result::Result<T, MetadataError>;

impl MetadataError {
    /// Check if the next endpoint should be tried after this error
    pub fn is_recoverable(&self) -> bool {
        match self {
            MetadataError::ServerUnavailable { .. } => true,
            MetadataError::Transport { .. } => true,
            MetadataError::NetworkTimeout { .. } => true,
            MetadataError::ClientRequest { .. } => false, // Request or API contract issue
            MetadataError::EndpointsExhausted { .. } => false, // Already tried everything
            MetadataError::MalformedResponse { .. } => false,
            MetadataError::RequestEncoding { .. } => false,
            MetadataError::Configuration { .. } => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            MetadataError::ClientRequest { .. } => "client_request",
            MetadataError::ServerUnavailable { .. } => "server_unavailable",
            MetadataError::Transport { .. } => "transport",
            MetadataError::NetworkTimeout { .. } => "network_timeout",
            MetadataError::EndpointsExhausted { .. } => "endpoints_exhausted",
            MetadataError::MalformedResponse { .. } => "malformed_response",
            MetadataError::RequestEncoding { .. } => "request_encoding",
            MetadataError::Configuration { .. } => "configuration",
        }
    }

    /// Get user-friendly suggestion for resolving the error
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            MetadataError::NetworkTimeout { .. } => {
                Some("Check your internet connection or try increasing the timeout value")
            }
            MetadataError::EndpointsExhausted { .. } => {
                Some("The CurseForge API and its mirrors are unreachable; try again later")
            }
            MetadataError::ClientRequest { status: 401 | 403, .. } => {
                Some("Check that CURSEFORGE_API_KEY holds a valid API key")
            }
            MetadataError::Configuration { suggestion, .. } => suggestion.as_deref(),
            _ => None,
        }
    }

    /// Render the error together with its whole source chain on one line
    pub fn chain_message(&self) -> String {
        let mut message = self.to_string();
        let mut source = self.source();
        while let Some(cause) = source {
            message.push_str(&format!(": {}", cause));
            source = cause.source();
        }
        message
    }

    /// Create a detailed error report for debugging
    pub fn detailed_report(&self) -> String {
        let mut report = format!("Error: {}\n", self);
        report.push_str(&format!("Category: {}\n", self.category()));
        report.push_str(&format!("Recoverable: {}\n", self.is_recoverable()));

        if let Some(suggestion) = self.suggestion() {
            report.push_str(&format!("Suggestion: {}\n", suggestion));
        }

        if let Some(source) = self.source() {
            report.push_str(&format!("Root cause: {}\n", source));
        }

        report
    }

    pub(crate) fn configuration<S: Into<String>>(
        message: S,
        field: Option<&str>,
        suggestion: Option<&str>,
    ) -> Self {
        MetadataError::Configuration {
            message: message.into(),
            field: field.map(str::to_string),
            suggestion: suggestion.map(str::to_string),
        }
    }
}
