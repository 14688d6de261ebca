//! Vision model interaction: the [`VisionModel`] boundary and its Anthropic
//! implementation.
//!
//! Everything outside this module talks to the model only through
//! [`VisionModel::describe`]: one image plus one instruction in, raw reply
//! text out. Tests swap in a scripted implementation; production uses
//! [`AnthropicVision`].
//!
//! ## No retries
//!
//! Each call is made exactly once. Transport errors, auth errors and non-2xx
//! responses all surface as [`BillSplitError::UpstreamFailure`] so the user
//! can simply upload again.

use crate::config::ServiceConfig;
use crate::error::BillSplitError;
use crate::pipeline::encode::ImageData;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

/// Anthropic API version header value.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// A multimodal model that can answer an instruction about an image.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    /// Send `image` and `instruction` as a single user turn and return the
    /// model's text reply.
    async fn describe(
        &self,
        image: &ImageData,
        instruction: &str,
    ) -> Result<String, BillSplitError>;
}

/// [`VisionModel`] backed by the Anthropic Messages API.
#[derive(Debug, Clone)]
pub struct AnthropicVision {
    client: reqwest::Client,
    base_url: String,
    model: String,
    max_tokens: u32,
    api_key_env: String,
    api_key: Option<String>,
}

impl AnthropicVision {
    /// Build a client from the service configuration.
    ///
    /// The API key is looked up in `config.api_key_env` on every call.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, BillSplitError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| BillSplitError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            api_key_env: config.api_key_env.clone(),
            api_key: None,
        })
    }

    /// Use a fixed API key instead of reading the environment.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    fn resolve_api_key(&self) -> Result<String, BillSplitError> {
        if let Some(ref key) = self.api_key {
            return Ok(key.clone());
        }
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(BillSplitError::UpstreamFailure(format!(
                "{} is not set; cannot call the vision model",
                self.api_key_env
            ))),
        }
    }

    fn build_request<'a>(
        &'a self,
        image: &'a ImageData,
        instruction: &'a str,
    ) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user",
                content: vec![
                    ContentBlock::Image {
                        source: ImageSource {
                            kind: "base64",
                            media_type: &image.media_type,
                            data: &image.data,
                        },
                    },
                    ContentBlock::Text { text: instruction },
                ],
            }],
        }
    }
}

#[async_trait]
impl VisionModel for AnthropicVision {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn describe(
        &self,
        image: &ImageData,
        instruction: &str,
    ) -> Result<String, BillSplitError> {
        let api_key = self.resolve_api_key()?;
        let start = Instant::now();

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.build_request(image, instruction))
            .send()
            .await
            .map_err(|e| {
                BillSplitError::UpstreamFailure(format!("request to vision model failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BillSplitError::UpstreamFailure(format!(
                "vision model returned HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let reply: MessagesResponse = response
            .json()
            .await
            .map_err(|e| {
                BillSplitError::UpstreamFailure(format!("unreadable vision model response: {e}"))
            })?;

        if let Some(usage) = &reply.usage {
            debug!(
                "{}: {} input tokens, {} output tokens, {:?}",
                self.model,
                usage.input_tokens,
                usage.output_tokens,
                start.elapsed()
            );
        }

        reply
            .content
            .into_iter()
            .find_map(|block| match block {
                ReplyBlock::Text { text } => Some(text),
                ReplyBlock::Other => None,
            })
            .ok_or_else(|| {
                BillSplitError::UpstreamFailure("vision model reply contained no text".into())
            })
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: Vec<ContentBlock<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ContentBlock<'a> {
    Image { source: ImageSource<'a> },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    media_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ReplyBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ReplyBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}
