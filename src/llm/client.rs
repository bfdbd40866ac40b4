//! Unified client interface for the model provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LlmError;

/// Tool/function definition for structured output
///
/// Used with [`LlmClient::invoke_tools`] to constrain the model to a JSON
/// schema instead of free text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (e.g., "extract_search_filters")
    pub name: String,
    /// Description of what the tool does
    pub description: String,
    /// JSON Schema for the tool's arguments
    pub input_schema: Value,
}

/// Message role in the conversation context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One context message sent to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// What the model produced: a structured tool invocation, or plain text
/// when it declined to call any tool.
#[derive(Debug, Clone)]
pub enum ModelReply {
    ToolCall { name: String, arguments: Value },
    Text(String),
}

/// Unified model client interface
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Call the model with tool definitions available.
    ///
    /// `force_tool` pins tool choice to a specific tool name; `None` lets
    /// the model pick a tool or answer in free text.
    async fn invoke_tools(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        force_tool: Option<&str>,
    ) -> Result<ModelReply, LlmError>;

    /// Model name for logging
    fn model_name(&self) -> &str;
}
