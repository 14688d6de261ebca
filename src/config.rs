//! Service configuration.
//!
//! All runtime knobs live in [`ServiceConfig`], built via
//! [`ServiceConfigBuilder`]. The binary maps CLI flags and `BILLSPLIT_*`
//! environment variables onto the builder; library users and tests construct
//! it directly.
//!
//! The vision-model API key is deliberately *not* part of the config: it is
//! read from the environment variable named by
//! [`ServiceConfig::api_key_env`] on every parse request.

use crate::error::BillSplitError;
use serde::{Deserialize, Serialize};

/// Default model used to read receipts.
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";

/// Default origin allowed by CORS (the Vite dev server).
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:5173";

/// Configuration for the bill-splitting service.
///
/// # Example
/// ```rust
/// use billsplit::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .port(9000)
///     .allowed_origin("https://split.example.com")
///     .build()
///     .unwrap();
/// assert_eq!(config.jpeg_quality, 85);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Address the HTTP server binds to. Default: `127.0.0.1`.
    pub bind_address: String,

    /// HTTP port. Default: 8000.
    pub port: u16,

    /// The single origin allowed to call the API from a browser.
    /// Default: `http://localhost:5173`.
    pub allowed_origin: String,

    /// Vision model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Maximum tokens the model may generate per receipt. Default: 1000.
    ///
    /// A long grocery receipt is a few hundred tokens of JSON; 1000 leaves
    /// headroom without letting a confused model ramble.
    pub max_tokens: u32,

    /// Base URL of the Messages API. Default: `https://api.anthropic.com`.
    pub api_base_url: String,

    /// Name of the environment variable holding the API key.
    /// Default: `ANTHROPIC_API_KEY`.
    pub api_key_env: String,

    /// Per-call timeout for the vision model, in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// JPEG quality (1–100) used when converting HEIC uploads. Default: 85.
    pub jpeg_quality: u8,

    /// Largest accepted request body in bytes. Default: 20 MiB.
    ///
    /// Phone cameras routinely produce 5–12 MB photos; the framework default
    /// of 2 MB would reject most of them.
    pub max_upload_bytes: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8000,
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 1000,
            api_base_url: "https://api.anthropic.com".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            api_timeout_secs: 60,
            jpeg_quality: 85,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }

    /// `host:port` string for the listener.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn bind_address(mut self, addr: impl Into<String>) -> Self {
        self.config.bind_address = addr.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn allowed_origin(mut self, origin: impl Into<String>) -> Self {
        self.config.allowed_origin = origin.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn api_key_env(mut self, var: impl Into<String>) -> Self {
        self.config.api_key_env = var.into();
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality;
        self
    }

    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, BillSplitError> {
        let c = &self.config;
        if c.jpeg_quality == 0 || c.jpeg_quality > 100 {
            return Err(BillSplitError::InvalidConfig(format!(
                "JPEG quality must be 1–100, got {}",
                c.jpeg_quality
            )));
        }
        if c.max_tokens == 0 {
            return Err(BillSplitError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.model.trim().is_empty() {
            return Err(BillSplitError::InvalidConfig("model must not be empty".into()));
        }
        if c.api_key_env.trim().is_empty() {
            return Err(BillSplitError::InvalidConfig(
                "API key variable name must not be empty".into(),
            ));
        }
        if !(c.api_base_url.starts_with("http://") || c.api_base_url.starts_with("https://")) {
            return Err(BillSplitError::InvalidConfig(format!(
                "API base URL must be http(s), got '{}'",
                c.api_base_url
            )));
        }
        if c.allowed_origin.parse::<axum::http::HeaderValue>().is_err() {
            return Err(BillSplitError::InvalidConfig(format!(
                "Allowed origin is not a valid header value: '{}'",
                c.allowed_origin
            )));
        }
        if c.max_upload_bytes == 0 {
            return Err(BillSplitError::InvalidConfig(
                "Upload limit must be ≥ 1 byte".into(),
            ));
        }
        Ok(self.config)
    }
}
