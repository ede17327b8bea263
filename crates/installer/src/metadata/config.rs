//! Configuration for the CurseForge API endpoints

use reqwest::header::HeaderValue;
use std::time::Duration;
use url::Url;

use crate::metadata::core::{MetadataError, Result};

/// Primary CurseForge API base URL
pub const DEFAULT_PRIMARY_API: &str = "https://api.curseforge.com/v1";
/// Community mirror of the CurseForge API
pub const DEFAULT_MIRROR_API: &str = "https://mod.mcimirror.top/curseforge/v1";

pub const API_KEY_VAR: &str = "CURSEFORGE_API_KEY";
pub const PRIMARY_API_VAR: &str = "CURSEFORGE_API_PRIMARY";
pub const MIRROR_API_VAR: &str = "CURSEFORGE_API_MIRROR";
pub const TIMEOUT_VAR: &str = "CURSEFORGE_API_TIMEOUT_SECS";

/// Configuration for metadata resolution
#[derive(Debug, Clone)]
pub struct CurseForgeConfig {
    /// Base URLs in order of preference, primary first, without trailing slash
    pub endpoints: Vec<String>,
    /// Secret sent as `X-API-Key`; required
    pub api_key: Option<String>,
    pub user_agent: String,
    /// Per-request timeout applied by the transport
    pub timeout: Duration,
}

impl Default for CurseForgeConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![DEFAULT_PRIMARY_API.to_string(), DEFAULT_MIRROR_API.to_string()],
            api_key: None,
            user_agent: format!("packwiz-installer/{}", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_secs(30),
        }
    }
}

impl CurseForgeConfig {
    /// Load configuration from the process environment (and `.env`, if present)
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok(); // Ignore error if .env not present
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from a variable lookup function
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let api_key = lookup(API_KEY_VAR).ok_or_else(|| {
            MetadataError::configuration(
                format!("{} environment variable not set", API_KEY_VAR),
                Some(API_KEY_VAR),
                Some("Set CURSEFORGE_API_KEY in your .env file with an API key from the CurseForge console"),
            )
        })?;
        config.api_key = Some(api_key);

        let primary = lookup(PRIMARY_API_VAR).unwrap_or_else(|| DEFAULT_PRIMARY_API.to_string());
        let mirror = lookup(MIRROR_API_VAR).unwrap_or_else(|| DEFAULT_MIRROR_API.to_string());
        config = config.with_endpoints([primary, mirror]);

        if let Some(raw) = lookup(TIMEOUT_VAR) {
            let secs = raw.trim().parse::<u64>().map_err(|_| {
                MetadataError::configuration(
                    format!("{} must be a whole number of seconds, got '{}'", TIMEOUT_VAR, raw),
                    Some(TIMEOUT_VAR),
                    None,
                )
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Replace the endpoint list, trimming trailing slashes and blank entries
    pub fn with_endpoints<I, S>(mut self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.endpoints = endpoints
            .into_iter()
            .map(|e| e.into().trim().trim_end_matches('/').to_string())
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The API key, or a configuration error if none is set
    ///
    /// The key is sent as a header, so it must also be a valid header value.
    pub fn require_api_key(&self) -> Result<&str> {
        let key = match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => key,
            _ => {
                return Err(MetadataError::configuration(
                    "no CurseForge API key configured",
                    Some("api_key"),
                    Some("Provide an API key via CurseForgeConfig::with_api_key or CURSEFORGE_API_KEY"),
                ));
            }
        };

        HeaderValue::from_str(key).map_err(|_| {
            MetadataError::configuration(
                "CurseForge API key contains characters that can't be sent in a header",
                Some("api_key"),
                Some("Check CURSEFORGE_API_KEY for stray newlines or control characters"),
            )
        })?;
        Ok(key)
    }

    /// Check that the configuration can be used for requests
    pub fn validate(&self) -> Result<()> {
        if self.endpoints.is_empty() {
            return Err(MetadataError::configuration(
                "endpoint list is empty",
                Some("endpoints"),
                Some("Configure at least the primary CurseForge API URL"),
            ));
        }

        for endpoint in &self.endpoints {
            let parsed = Url::parse(endpoint).map_err(|e| {
                MetadataError::configuration(
                    format!("invalid endpoint URL '{}': {}", endpoint, e),
                    Some("endpoints"),
                    Some("URL must be absolute (include http:// or https://)"),
                )
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(MetadataError::configuration(
                    format!("unsupported scheme '{}' in endpoint '{}'", parsed.scheme(), endpoint),
                    Some("endpoints"),
                    None,
                ));
            }
        }

        if HeaderValue::from_str(&self.user_agent).is_err() {
            return Err(MetadataError::configuration(
                format!("invalid user agent '{}'", self.user_agent.escape_debug()),
                Some("user_agent"),
                None,
            ));
        }

        self.require_api_key()?;
        Ok(())
    }
}
