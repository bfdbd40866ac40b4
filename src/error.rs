//! Error types for the query-compilation pipelines.
//!
//! This module provides idiomatic Rust error types using thiserror for
//! better error messages and proper error chain handling. Validation
//! failures are deliberately *not* represented here: they are ordinary
//! values on the turn state (retryable error strings and non-fatal
//! warnings), because the orchestrator routes on them rather than
//! propagating them.

use thiserror::Error;

/// Top-level error type for the coapt pipelines
#[derive(Error, Debug)]
pub enum CoaptError {
    #[error("model error: {0}")]
    Llm(#[from] LlmError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from the model-invocation boundary
#[derive(Error, Debug)]
pub enum LlmError {
    /// The provider returned a non-success HTTP status
    #[error("model provider returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The request never completed (connect failure, timeout, reset)
    #[error("model request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered with a body we could not interpret
    #[error("unexpected model response: {0}")]
    Malformed(String),
}

impl LlmError {
    /// Transient provider errors are retried with exponential backoff:
    /// rate limiting (429), overload (529), and transport-level timeouts
    /// or connection resets. Everything else propagates immediately.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Api { status, .. } => matches!(*status, 429 | 529),
            LlmError::Transport(err) => err.is_timeout() || err.is_connect(),
            LlmError::Malformed(_) => false,
        }
    }
}

/// Errors from the relational store boundary
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("row decode failed for column '{column}': {message}")]
    Decode { column: String, message: String },
}

pub type Result<T, E = CoaptError> = std::result::Result<T, E>;
