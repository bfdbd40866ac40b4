//! Model-invocation boundary.
//!
//! The pipelines consume the language model through the [`LlmClient`]
//! trait: hand it a system prompt, context messages, and schema-constrained
//! tool definitions; get back either a structured tool call or free text.

pub mod anthropic;
pub mod client;

pub use anthropic::AnthropicClient;
pub use client::{ChatMessage, LlmClient, ModelReply, Role, ToolDefinition};
