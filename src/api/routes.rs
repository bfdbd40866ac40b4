//! Route handlers and router assembly.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::analytics::{AnalyticsAgent, AnalyticsContext, AnalyticsTurnRequest, AnalyticsTurnUpdate};
use crate::search::agent::TurnUpdate;
use crate::search::{FilterMap, SearchAgent, SearchTurnRequest, SortOrder};

use super::threads::{create_thread_store, ThreadStore};

/// Shared application state for all routes
#[derive(Clone)]
pub struct ApiState {
    pub search: Arc<SearchAgent>,
    pub analytics: Arc<AnalyticsAgent>,
    pub threads: ThreadStore,
}

impl ApiState {
    pub fn new(search: Arc<SearchAgent>, analytics: Arc<AnalyticsAgent>) -> Self {
        Self {
            search,
            analytics,
            threads: create_thread_store(),
        }
    }
}

/// Assemble the API router
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/analytics/chat", post(analytics_chat))
        .route("/api/search", post(direct_search))
        .route("/api/health", get(health))
        .with_state(state)
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

// ============================================================================
// POST /api/chat
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    message: Option<String>,
    thread_id: Option<String>,
    #[serde(default)]
    stream: bool,
    existing_filters: Option<FilterMap>,
    sort: Option<String>,
}

async fn chat(State(state): State<ApiState>, Json(body): Json<ChatRequest>) -> Response {
    let Some(message) = body.message.filter(|m| !m.is_empty()) else {
        return bad_request("Message is required");
    };
    let Some(thread_id) = body.thread_id.filter(|t| !t.is_empty()) else {
        return bad_request("Thread ID is required");
    };

    // A caller-supplied filter state wins over the stored thread state
    let prior_filters = match body.existing_filters {
        Some(filters) => filters,
        None => {
            let threads = state.threads.read().await;
            threads
                .get(&thread_id)
                .map(|t| t.filters.clone())
                .unwrap_or_default()
        }
    };

    let mut request = SearchTurnRequest::new(message, thread_id.clone());
    request.prior_filters = prior_filters;
    request.sort = body.sort.as_deref().and_then(SortOrder::parse);

    if body.stream {
        let threads = state.threads.clone();
        let stream = state
            .search
            .clone()
            .stream_turn(request)
            .then(move |update| {
                let threads = threads.clone();
                let thread_id = thread_id.clone();
                async move {
                    if let TurnUpdate::Formatted { outcome } = &update {
                        let mut threads = threads.write().await;
                        threads.entry(thread_id).or_default().filters = outcome.filters.clone();
                    }
                    Ok::<_, Infallible>(
                        Event::default()
                            .json_data(&update)
                            .unwrap_or_else(|_| Event::default().data("{}")),
                    )
                }
            });
        return Sse::new(stream).keep_alive(KeepAlive::default()).into_response();
    }

    let outcome = state.search.run_turn(request).await;
    {
        let mut threads = state.threads.write().await;
        threads.entry(thread_id).or_default().filters = outcome.filters.clone();
    }

    Json(json!({
        "results": outcome.results,
        "resultCount": outcome.result_count,
        "searchFilters": outcome.filters,
        "responseMessage": outcome.response_message,
        "responseType": outcome.intent,
        "suggestedQueries": outcome.suggested_queries,
    }))
    .into_response()
}

// ============================================================================
// POST /api/analytics/chat
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyticsChatRequest {
    message: Option<String>,
    thread_id: Option<String>,
    #[serde(default)]
    stream: bool,
    existing_context: Option<AnalyticsContext>,
}

async fn analytics_chat(
    State(state): State<ApiState>,
    Json(body): Json<AnalyticsChatRequest>,
) -> Response {
    let Some(message) = body.message.filter(|m| !m.is_empty()) else {
        return bad_request("Message is required");
    };
    let Some(thread_id) = body.thread_id.filter(|t| !t.is_empty()) else {
        return bad_request("Thread ID is required");
    };

    let existing_context = match body.existing_context {
        Some(context) => Some(context),
        None => {
            let threads = state.threads.read().await;
            threads.get(&thread_id).and_then(|t| t.analytics_context.clone())
        }
    };

    let request = AnalyticsTurnRequest {
        message,
        thread_id: thread_id.clone(),
        existing_context,
    };

    if body.stream {
        let threads = state.threads.clone();
        let stream = state
            .analytics
            .clone()
            .stream_turn(request)
            .then(move |update| {
                let threads = threads.clone();
                let thread_id = thread_id.clone();
                async move {
                    if let AnalyticsTurnUpdate::Formatted { outcome } = &update {
                        let mut threads = threads.write().await;
                        threads.entry(thread_id).or_default().analytics_context =
                            Some(outcome.context.clone());
                    }
                    Ok::<_, Infallible>(
                        Event::default()
                            .json_data(&update)
                            .unwrap_or_else(|_| Event::default().data("{}")),
                    )
                }
            });
        return Sse::new(stream).keep_alive(KeepAlive::default()).into_response();
    }

    let outcome = state.analytics.run_turn(request).await;
    {
        let mut threads = state.threads.write().await;
        threads.entry(thread_id).or_default().analytics_context = Some(outcome.context.clone());
    }

    Json(outcome).into_response()
}

// ============================================================================
// POST /api/search
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DirectSearchRequest {
    filters: Option<FilterMap>,
    sort: Option<String>,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_limit() -> i64 {
    20
}

/// Direct filter execution, no model call. Used for filter removal and
/// sort changes where the structured state already exists client-side.
async fn direct_search(
    State(state): State<ApiState>,
    Json(body): Json<DirectSearchRequest>,
) -> Response {
    let Some(filters) = body.filters else {
        return bad_request("Filters object is required");
    };

    if filters.is_empty() {
        return Json(json!({ "results": [], "resultCount": 0 })).into_response();
    }

    let sort = body.sort.as_deref().and_then(SortOrder::parse);
    match state
        .search
        .direct_search(&filters, sort, body.limit, body.offset)
        .await
    {
        Ok((results, result_count)) => Json(json!({
            "results": results,
            "resultCount": result_count,
        }))
        .into_response(),
        Err(err) => {
            error!(error = %err, "direct search failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Failed to execute search",
                    "details": err.to_string(),
                })),
            )
                .into_response()
        }
    }
}

// ============================================================================
// GET /api/health
// ============================================================================

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
