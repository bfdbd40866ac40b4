//! Search turn orchestrator.
//!
//! Drives one conversational turn through the stage graph:
//! parse -> validate -> execute -> format, with a bounded retry edge from
//! validation back to parsing and a conversational fork that skips
//! validation and execution entirely. All retry state is local to the
//! invocation.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::OnceCell;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::domain::NeighborhoodCatalog;
use crate::error::StoreError;
use crate::llm::LlmClient;
use crate::store::rows::PropertyRow;
use crate::store::ListingStore;

use super::extract::{extract, Extraction};
use super::filters::{merge_filters, FilterMap, FilterSet};
use super::query::{build_search_count_query, build_search_query, SortOrder};
use super::respond::format_response;
use super::validate::{validate_filters, ValidationOutcome};

/// Bounded retry edge: validation may send the turn back to parsing at
/// most this many times before progression is forced.
pub const MAX_RETRIES: u32 = 2;

/// Default page size for search results
pub const DEFAULT_LIMIT: i64 = 20;

/// Classified turn intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Search,
    Conversational,
}

/// One turn's input. The caller supplies the previous turn's filter state
/// explicitly; the orchestrator owns nothing across invocations.
#[derive(Debug, Clone)]
pub struct SearchTurnRequest {
    pub message: String,
    pub thread_id: String,
    pub prior_filters: FilterMap,
    pub sort: Option<SortOrder>,
    pub limit: i64,
    pub offset: i64,
}

impl SearchTurnRequest {
    pub fn new(message: impl Into<String>, thread_id: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            thread_id: thread_id.into(),
            prior_filters: FilterMap::new(),
            sort: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// Completed turn state handed back to the caller
#[derive(Debug, Clone, Serialize)]
pub struct SearchTurnOutcome {
    pub intent: Intent,
    pub results: Vec<PropertyRow>,
    pub result_count: i64,
    /// Accumulated filter state to feed into the next turn
    pub filters: FilterMap,
    pub response_message: String,
    pub suggested_queries: Vec<String>,
    pub validation_error: Option<String>,
    pub validation_warning: Option<String>,
    pub retry_count: u32,
}

/// Incremental update emitted per completed orchestrator stage
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum TurnUpdate {
    Parsed {
        intent: Intent,
        filters: FilterMap,
    },
    Validated {
        error: Option<String>,
        warning: Option<String>,
        retry_count: u32,
    },
    Executed {
        result_count: i64,
    },
    Formatted {
        outcome: SearchTurnOutcome,
    },
    Done,
}

/// The search pipeline agent
pub struct SearchAgent {
    llm: Arc<dyn LlmClient>,
    store: Arc<dyn ListingStore>,
    catalog: OnceCell<Arc<NeighborhoodCatalog>>,
}

impl SearchAgent {
    pub fn new(llm: Arc<dyn LlmClient>, store: Arc<dyn ListingStore>) -> Self {
        Self {
            llm,
            store,
            catalog: OnceCell::new(),
        }
    }

    /// The neighborhood catalog, loaded once per process. A load failure
    /// degrades to an empty catalog (permissive validation) and is retried
    /// on the next turn.
    pub async fn catalog(&self) -> Arc<NeighborhoodCatalog> {
        let loaded = self
            .catalog
            .get_or_try_init(|| async {
                let records = self.store.load_neighborhoods().await?;
                Ok::<_, StoreError>(Arc::new(NeighborhoodCatalog::from_records(records)))
            })
            .await;

        match loaded {
            Ok(catalog) => Arc::clone(catalog),
            Err(err) => {
                warn!(error = %err, "neighborhood catalog unavailable; validation will be permissive");
                Arc::new(NeighborhoodCatalog::default())
            }
        }
    }

    /// Run one turn to completion.
    pub async fn run_turn(&self, request: SearchTurnRequest) -> SearchTurnOutcome {
        self.run_inner(request, None).await
    }

    /// Streaming variant: yields one update per completed stage, then the
    /// formatted outcome, then a terminating sentinel.
    pub fn stream_turn(self: Arc<Self>, request: SearchTurnRequest) -> ReceiverStream<TurnUpdate> {
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            let outcome = self.run_inner(request, Some(tx.clone())).await;
            let _ = tx.send(TurnUpdate::Formatted { outcome }).await;
            let _ = tx.send(TurnUpdate::Done).await;
        });
        ReceiverStream::new(rx)
    }

    /// Execute already-structured filters without a model call. Used by the
    /// direct search endpoint for filter removal and sort changes.
    pub async fn direct_search(
        &self,
        raw: &FilterMap,
        sort: Option<SortOrder>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<PropertyRow>, i64), StoreError> {
        let catalog = self.catalog().await;
        let filters = FilterSet::from_map(raw).unwrap_or_default();
        self.execute(&filters, &catalog, sort, limit, offset).await
    }

    async fn run_inner(
        &self,
        request: SearchTurnRequest,
        updates: Option<mpsc::Sender<TurnUpdate>>,
    ) -> SearchTurnOutcome {
        let catalog = self.catalog().await;
        let mut merged = request.prior_filters.clone();
        let mut retry_count: u32 = 0;
        let mut last_error: Option<String> = None;

        loop {
            let extraction = match extract(
                self.llm.as_ref(),
                &request.message,
                &merged,
                last_error.as_deref(),
                &catalog,
            )
            .await
            {
                Ok(extraction) => extraction,
                Err(err) => {
                    warn!(thread_id = %request.thread_id, error = %err, "extraction failed");
                    return SearchTurnOutcome {
                        intent: Intent::Search,
                        results: Vec::new(),
                        result_count: 0,
                        filters: request.prior_filters.clone(),
                        response_message:
                            "I couldn't understand that search query. Could you try rephrasing it?"
                                .to_string(),
                        suggested_queries: Vec::new(),
                        validation_error: Some(format!("Error parsing query: {err}")),
                        validation_warning: None,
                        retry_count,
                    };
                }
            };

            match extraction {
                Extraction::Conversational {
                    message,
                    suggested_queries,
                } => {
                    // Conversational turns never touch filters or the store
                    emit(
                        &updates,
                        TurnUpdate::Parsed {
                            intent: Intent::Conversational,
                            filters: merged.clone(),
                        },
                    )
                    .await;
                    info!(thread_id = %request.thread_id, "conversational turn");
                    return SearchTurnOutcome {
                        intent: Intent::Conversational,
                        results: Vec::new(),
                        result_count: 0,
                        filters: request.prior_filters.clone(),
                        response_message: message,
                        suggested_queries,
                        validation_error: None,
                        validation_warning: None,
                        retry_count,
                    };
                }
                Extraction::Filters(patch) => {
                    merged = merge_filters(&merged, &patch);
                    emit(
                        &updates,
                        TurnUpdate::Parsed {
                            intent: Intent::Search,
                            filters: merged.clone(),
                        },
                    )
                    .await;

                    match validate_filters(&merged, &catalog) {
                        ValidationOutcome::Valid { filters, warning } => {
                            emit(
                                &updates,
                                TurnUpdate::Validated {
                                    error: None,
                                    warning: warning.clone(),
                                    retry_count,
                                },
                            )
                            .await;
                            return self
                                .finish_turn(&request, filters, warning, None, retry_count, &updates)
                                .await;
                        }
                        ValidationOutcome::Retry { error } => {
                            emit(
                                &updates,
                                TurnUpdate::Validated {
                                    error: Some(error.clone()),
                                    warning: None,
                                    retry_count,
                                },
                            )
                            .await;

                            if retry_count >= MAX_RETRIES {
                                // Retry budget exhausted: force progression
                                // with the last error attached for display.
                                warn!(
                                    thread_id = %request.thread_id,
                                    error = %error,
                                    "validation retries exhausted, forcing progression"
                                );
                                let filters = FilterSet::from_map(&merged).unwrap_or_default();
                                return self
                                    .finish_turn(
                                        &request,
                                        filters,
                                        None,
                                        Some(error),
                                        retry_count,
                                        &updates,
                                    )
                                    .await;
                            }

                            retry_count += 1;
                            last_error = Some(error);
                        }
                    }
                }
            }
        }
    }

    /// Execute + format for a search-intent turn
    async fn finish_turn(
        &self,
        request: &SearchTurnRequest,
        filters: FilterSet,
        warning: Option<String>,
        forced_error: Option<String>,
        retry_count: u32,
        updates: &Option<mpsc::Sender<TurnUpdate>>,
    ) -> SearchTurnOutcome {
        let catalog = self.catalog().await;
        let next_filters = filter_state(&filters);

        let (results, result_count, execution_error) = match self
            .execute(&filters, &catalog, request.sort, request.limit, request.offset)
            .await
        {
            Ok((results, count)) => (results, count, None),
            Err(err) => {
                warn!(thread_id = %request.thread_id, error = %err, "search execution failed");
                (Vec::new(), 0, Some(format!("Search failed: {err}")))
            }
        };

        emit(updates, TurnUpdate::Executed { result_count }).await;

        let mut response_message = match &execution_error {
            Some(message) => message.clone(),
            None => format_response(&filters, result_count, warning.as_deref()),
        };
        if let Some(error) = &forced_error {
            response_message.push_str(&format!(" Note: {error}"));
        }

        info!(
            thread_id = %request.thread_id,
            result_count,
            retry_count,
            "search turn complete"
        );

        SearchTurnOutcome {
            intent: Intent::Search,
            results,
            result_count,
            filters: next_filters,
            response_message,
            suggested_queries: Vec::new(),
            validation_error: forced_error,
            validation_warning: warning,
            retry_count,
        }
    }

    /// Issue the row query and its count-only sibling concurrently
    async fn execute(
        &self,
        filters: &FilterSet,
        catalog: &NeighborhoodCatalog,
        sort: Option<SortOrder>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<PropertyRow>, i64), StoreError> {
        let row_query = build_search_query(filters, catalog, sort, limit, offset);
        let count_query = build_search_count_query(filters, catalog);

        let (rows, count) = tokio::join!(
            self.store.fetch_listings(&row_query),
            self.store.count_listings(&count_query),
        );

        Ok((rows?, count?))
    }
}

/// Canonical filter state carried to the next turn: the repaired set,
/// serialized back into map form.
fn filter_state(filters: &FilterSet) -> FilterMap {
    match serde_json::to_value(filters) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => FilterMap::new(),
    }
}

async fn emit(updates: &Option<mpsc::Sender<TurnUpdate>>, update: TurnUpdate) {
    if let Some(tx) = updates {
        let _ = tx.send(update).await;
    }
}
