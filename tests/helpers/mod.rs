//! Shared test doubles: a scripted model client and an in-memory store.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use coapt::domain::NeighborhoodRecord;
use coapt::error::{LlmError, StoreError};
use coapt::llm::{ChatMessage, LlmClient, ModelReply, ToolDefinition};
use coapt::store::rows::{PropertyRow, ResultColumn, ResultRow};
use coapt::store::statement::SqlStatement;
use coapt::store::ListingStore;

/// Model client that replays a scripted sequence of replies
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<ModelReply, LlmError>>>,
    pub calls: Mutex<u32>,
}

impl ScriptedLlm {
    pub fn new(replies: Vec<Result<ModelReply, LlmError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(0),
        }
    }

    pub fn tool_call(name: &str, arguments: Value) -> Result<ModelReply, LlmError> {
        Ok(ModelReply::ToolCall {
            name: name.to_string(),
            arguments,
        })
    }

    pub fn text(content: &str) -> Result<ModelReply, LlmError> {
        Ok(ModelReply::Text(content.to_string()))
    }

    pub fn api_error(status: u16) -> Result<ModelReply, LlmError> {
        Err(LlmError::Api {
            status,
            message: "scripted error".to_string(),
        })
    }

    pub fn call_count(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn invoke_tools(
        &self,
        _system_prompt: &str,
        _messages: &[ChatMessage],
        _tools: &[ToolDefinition],
        _force_tool: Option<&str>,
    ) -> Result<ModelReply, LlmError> {
        *self.calls.lock().unwrap() += 1;
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Malformed("script exhausted".to_string())))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// In-memory store that records every executed statement
#[derive(Default)]
pub struct MemoryStore {
    pub listings: Vec<PropertyRow>,
    pub total_count: i64,
    pub analytics_rows: Vec<ResultRow>,
    pub neighborhoods: Vec<NeighborhoodRecord>,
    pub executed: Mutex<Vec<String>>,
    pub fail_queries: bool,
}

impl MemoryStore {
    pub fn with_neighborhoods(names: &[&str]) -> Self {
        Self {
            neighborhoods: names
                .iter()
                .enumerate()
                .map(|(i, name)| NeighborhoodRecord {
                    name: name.to_string(),
                    level: 3,
                    hierarchy_path: format!("{i}/"),
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn executed_sql(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn fetch_listings(
        &self,
        statement: &SqlStatement,
    ) -> Result<Vec<PropertyRow>, StoreError> {
        self.executed.lock().unwrap().push(statement.sql().to_string());
        if self.fail_queries {
            return Err(StoreError::Decode {
                column: "scripted".into(),
                message: "store failure".into(),
            });
        }
        Ok(self.listings.clone())
    }

    async fn count_listings(&self, statement: &SqlStatement) -> Result<i64, StoreError> {
        self.executed.lock().unwrap().push(statement.sql().to_string());
        if self.fail_queries {
            return Err(StoreError::Decode {
                column: "scripted".into(),
                message: "store failure".into(),
            });
        }
        Ok(self.total_count)
    }

    async fn fetch_analytics(
        &self,
        statement: &SqlStatement,
        _columns: &[ResultColumn],
    ) -> Result<Vec<ResultRow>, StoreError> {
        self.executed.lock().unwrap().push(statement.sql().to_string());
        if self.fail_queries {
            return Err(StoreError::Decode {
                column: "scripted".into(),
                message: "store failure".into(),
            });
        }
        Ok(self.analytics_rows.clone())
    }

    async fn load_neighborhoods(&self) -> Result<Vec<NeighborhoodRecord>, StoreError> {
        Ok(self.neighborhoods.clone())
    }
}

/// A listing row with sensible defaults for tests
pub fn listing(id: &str, price: f64) -> PropertyRow {
    PropertyRow {
        id: id.to_string(),
        fct_id: Some(id.to_string()),
        address: Some("123 W 20th St".to_string()),
        neighborhood: Some("chelsea".to_string()),
        borough: Some("manhattan".to_string()),
        zipcode: Some("10011".to_string()),
        property_type: Some("rental".to_string()),
        price: Some(price),
        bedrooms: Some(2),
        bathrooms: Some(1.0),
        sqft: Some(750),
        no_fee: Some(false),
        brokers_fee: None,
        latitude: Some(40.742),
        longitude: Some(-74.0),
        listed_at: None,
        available_from: None,
        days_on_market: Some(12),
        tag_list: Some(vec!["near-subway".to_string()]),
        amenities: Some(vec!["gym".to_string()]),
        url: None,
        tag_match_count: 0,
    }
}
