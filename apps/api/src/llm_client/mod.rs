/// LLM Client: the single point of entry for all model calls in CertTrack.
///
/// ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
/// Everything else consumes the `CompletionSource` trait, which this client implements.
///
/// Model: claude-sonnet-4-5 (hardcoded; do not make configurable to prevent drift)
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

use prompts::JSON_ONLY_SYSTEM;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for all LLM calls in CertTrack.
/// This is intentionally hardcoded to prevent accidental drift.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 4096;
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// Base64 image bytes sent alongside a text prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineMedia {
    pub data: String,
    pub mime_type: String,
}

/// One ordered piece of a multimodal prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptPart {
    Text(String),
    InlineMedia(InlineMedia),
}

impl PromptPart {
    pub fn text(text: impl Into<String>) -> Self {
        PromptPart::Text(text.into())
    }
}

/// "Given prompt parts, return a text completion." The output is untrusted text.
#[async_trait]
pub trait CompletionSource: Send + Sync {
    async fn generate_content(&self, parts: &[PromptPart]) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: Vec<AnthropicContent<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContent<'a> {
    Text { text: &'a str },
    Image { source: ImageSource<'a> },
}

#[derive(Debug, Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    source_type: &'a str,
    media_type: &'a str,
    data: &'a str,
}

impl<'a> From<&'a PromptPart> for AnthropicContent<'a> {
    fn from(part: &'a PromptPart) -> Self {
        match part {
            PromptPart::Text(text) => AnthropicContent::Text { text },
            PromptPart::InlineMedia(media) => AnthropicContent::Image {
                source: ImageSource {
                    source_type: "base64",
                    media_type: &media.mime_type,
                    data: &media.data,
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// The single LLM client used by all services in CertTrack.
/// Wraps the Anthropic Messages API with transport-level retry logic.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
        })
    }

    /// Makes a raw call to the Claude API, returning the full response object.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    pub async fn call(&self, parts: &[PromptPart], system: &str) -> Result<LlmResponse, LlmError> {
        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: parts.iter().map(AnthropicContent::from).collect(),
            }],
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<AnthropicError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let llm_response: LlmResponse = response.json().await?;

            debug!(
                "LLM call succeeded: input_tokens={}, output_tokens={}",
                llm_response.usage.input_tokens, llm_response.usage.output_tokens
            );

            return Ok(llm_response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

#[async_trait]
impl CompletionSource for LlmClient {
    async fn generate_content(&self, parts: &[PromptPart]) -> Result<String, LlmError> {
        let response = self.call(parts, JSON_ONLY_SYSTEM).await?;
        response
            .text()
            .map(str::to_owned)
            .ok_or(LlmError::EmptyContent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_part_serializes_as_text_block() {
        let part = PromptPart::text("hello");
        let value = serde_json::to_value(AnthropicContent::from(&part)).unwrap();
        assert_eq!(value, serde_json::json!({"type": "text", "text": "hello"}));
    }

    #[test]
    fn test_inline_media_serializes_as_base64_image_block() {
        let part = PromptPart::InlineMedia(InlineMedia {
            data: "aGVsbG8=".to_string(),
            mime_type: "image/jpeg".to_string(),
        });
        let value = serde_json::to_value(AnthropicContent::from(&part)).unwrap();
        assert_eq!(value["type"], "image");
        assert_eq!(value["source"]["type"], "base64");
        assert_eq!(value["source"]["media_type"], "image/jpeg");
        assert_eq!(value["source"]["data"], "aGVsbG8=");
    }

    #[test]
    fn test_response_text_picks_first_text_block() {
        let response: LlmResponse = serde_json::from_str(
            r#"{
                "content": [
                    {"type": "tool_use", "text": null},
                    {"type": "text", "text": "{\"ok\": true}"}
                ],
                "usage": {"input_tokens": 10, "output_tokens": 4}
            }"#,
        )
        .unwrap();
        assert_eq!(response.text(), Some("{\"ok\": true}"));
    }

    #[test]
    fn test_response_without_text_block_is_none() {
        let response = LlmResponse {
            content: vec![],
            usage: Usage {
                input_tokens: 1,
                output_tokens: 0,
            },
        };
        assert!(response.text().is_none());
    }
}
