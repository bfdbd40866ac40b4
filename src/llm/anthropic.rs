//! Anthropic Messages API client.
//!
//! Implements [`LlmClient`] against `POST /v1/messages` with tool use.
//! Transient provider errors (429, 529, connection timeouts/resets) are
//! retried with exponential backoff before propagating.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use super::client::{ChatMessage, LlmClient, ModelReply, ToolDefinition};
use crate::config::DEFAULT_MODEL;
use crate::error::LlmError;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

/// Retry budget for transient provider errors
const MAX_ATTEMPTS: u32 = 3;
/// Backoff base: delay = base * 2^attempt
const RETRY_BASE_DELAY_MS: u64 = 1000;

/// Anthropic Claude API client
#[derive(Clone)]
pub struct AnthropicClient {
    api_key: String,
    client: reqwest::Client,
    model: String,
}

impl AnthropicClient {
    /// Create a new client with the given API key
    pub fn new(api_key: String) -> Self {
        Self::with_model(api_key, DEFAULT_MODEL)
    }

    /// Create with a specific model
    pub fn with_model(api_key: String, model: &str) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
            model: model.to_string(),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self, LlmError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| LlmError::Malformed(
            "ANTHROPIC_API_KEY environment variable not set".into(),
        ))?;
        let model =
            std::env::var("COAPT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Ok(Self::with_model(api_key, &model))
    }

    /// Single API round trip, no retry
    async fn call_api(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        force_tool: Option<&str>,
    ) -> Result<ModelReply, LlmError> {
        let tool_choice = match force_tool {
            Some(name) => json!({ "type": "tool", "name": name }),
            None => json!({ "type": "auto" }),
        };

        let body = json!({
            "model": &self.model,
            "max_tokens": MAX_TOKENS,
            "temperature": 0,
            "system": system_prompt,
            "messages": messages,
            "tools": tools,
            "tool_choice": tool_choice,
        });

        let response = self
            .client
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| LlmError::Malformed(e.to_string()))?;

        Self::parse_content(&body)
    }

    /// Walk the content blocks: the first tool_use block wins, otherwise
    /// all text blocks are concatenated into a free-text reply.
    fn parse_content(body: &Value) -> Result<ModelReply, LlmError> {
        let blocks = body["content"]
            .as_array()
            .ok_or_else(|| LlmError::Malformed("response has no content array".into()))?;

        for block in blocks {
            if block["type"] == "tool_use" {
                let name = block["name"]
                    .as_str()
                    .ok_or_else(|| LlmError::Malformed("tool_use block has no name".into()))?;
                return Ok(ModelReply::ToolCall {
                    name: name.to_string(),
                    arguments: block["input"].clone(),
                });
            }
        }

        let mut text = String::new();
        for block in blocks {
            if block["type"] == "text" {
                if let Some(t) = block["text"].as_str() {
                    text.push_str(t);
                }
            }
        }

        Ok(ModelReply::Text(text))
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn invoke_tools(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        force_tool: Option<&str>,
    ) -> Result<ModelReply, LlmError> {
        let mut attempt = 0;
        loop {
            match self
                .call_api(system_prompt, messages, tools, force_tool)
                .await
            {
                Ok(reply) => {
                    debug!(model = %self.model, attempt, "model call succeeded");
                    return Ok(reply);
                }
                Err(err) if err.is_retryable() && attempt + 1 < MAX_ATTEMPTS => {
                    let delay = RETRY_BASE_DELAY_MS * 2u64.pow(attempt);
                    warn!(attempt, delay_ms = delay, error = %err, "transient model error, backing off");
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_client_uses_default_model() {
        let client = AnthropicClient::new("test-key".to_string());
        assert_eq!(client.model_name(), DEFAULT_MODEL);
    }

    #[test]
    fn tool_use_block_wins_over_text() {
        let body = json!({
            "content": [
                { "type": "text", "text": "Let me extract that." },
                { "type": "tool_use", "name": "extract_search_filters",
                  "input": { "no_fee": true } }
            ]
        });
        match AnthropicClient::parse_content(&body).unwrap() {
            ModelReply::ToolCall { name, arguments } => {
                assert_eq!(name, "extract_search_filters");
                assert_eq!(arguments["no_fee"], true);
            }
            other => panic!("expected tool call, got {other:?}"),
        }
    }

    #[test]
    fn text_blocks_concatenate_when_no_tool_call() {
        let body = json!({
            "content": [
                { "type": "text", "text": "Hello. " },
                { "type": "text", "text": "How can I help?" }
            ]
        });
        match AnthropicClient::parse_content(&body).unwrap() {
            ModelReply::Text(text) => assert_eq!(text, "Hello. How can I help?"),
            other => panic!("expected text, got {other:?}"),
        }
    }
}
