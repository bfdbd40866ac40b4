//! Analytics turn orchestrator.
//!
//! Same stage graph as search — parse -> validate -> execute -> format —
//! with the bounded retry edge from validation back to parsing. There is
//! no conversational fork: extraction always yields a spec (falling back
//! to keyword rules), so every turn reaches execution or exhausts its
//! retries.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::llm::LlmClient;
use crate::store::ListingStore;

use super::extract::extract_spec;
use super::query::build_analytics_query;
use super::render::{select_render_hint, RenderHint, RenderPrimary};
use super::respond::{format_answer, format_validation_failure};
use super::result::TabularResult;
use super::spec::QuerySpec;
use super::validate::{validate_spec, SpecValidation};

/// Bounded retry edge shared with the search pipeline
pub const MAX_RETRIES: u32 = 2;

/// Cross-turn context owned by the caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyticsContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_query_spec: Option<QuerySpec>,
    #[serde(skip_serializing_if = "Option::is_none", skip_deserializing)]
    pub last_render_hint: Option<RenderHint>,
}

/// One analytics turn's input
#[derive(Debug, Clone)]
pub struct AnalyticsTurnRequest {
    pub message: String,
    pub thread_id: String,
    pub existing_context: Option<AnalyticsContext>,
}

/// Completed analytics turn
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsTurnOutcome {
    pub answer_text: String,
    pub result: TabularResult,
    pub render_hint: RenderHint,
    pub context: AnalyticsContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_error: Option<String>,
    pub retry_count: u32,
}

/// Incremental update emitted per completed stage
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum AnalyticsTurnUpdate {
    Parsed { spec: QuerySpec },
    Validated { error: Option<String>, retry_count: u32 },
    Executed { row_count: usize },
    Formatted { outcome: AnalyticsTurnOutcome },
    Done,
}

/// The analytics pipeline agent
pub struct AnalyticsAgent {
    llm: Arc<dyn LlmClient>,
    store: Arc<dyn ListingStore>,
}

impl AnalyticsAgent {
    pub fn new(llm: Arc<dyn LlmClient>, store: Arc<dyn ListingStore>) -> Self {
        Self { llm, store }
    }

    /// Run one turn to completion.
    pub async fn run_turn(&self, request: AnalyticsTurnRequest) -> AnalyticsTurnOutcome {
        self.run_inner(request, None).await
    }

    /// Streaming variant: one update per completed stage, the formatted
    /// outcome, then a terminating sentinel.
    pub fn stream_turn(
        self: Arc<Self>,
        request: AnalyticsTurnRequest,
    ) -> ReceiverStream<AnalyticsTurnUpdate> {
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            let outcome = self.run_inner(request, Some(tx.clone())).await;
            let _ = tx.send(AnalyticsTurnUpdate::Formatted { outcome }).await;
            let _ = tx.send(AnalyticsTurnUpdate::Done).await;
        });
        ReceiverStream::new(rx)
    }

    async fn run_inner(
        &self,
        request: AnalyticsTurnRequest,
        updates: Option<mpsc::Sender<AnalyticsTurnUpdate>>,
    ) -> AnalyticsTurnOutcome {
        let existing = request
            .existing_context
            .as_ref()
            .and_then(|context| context.last_query_spec.clone());

        if request.message.trim().is_empty() {
            return failure_outcome(
                "Please ask an analytics question.".to_string(),
                existing,
                0,
            );
        }

        let mut retry_count: u32 = 0;
        let mut last_error: Option<String> = None;

        loop {
            let candidate = extract_spec(
                self.llm.as_ref(),
                &request.message,
                existing.as_ref(),
                last_error.as_deref(),
            )
            .await;
            emit(&updates, AnalyticsTurnUpdate::Parsed { spec: candidate.clone() }).await;

            match validate_spec(&candidate, existing.as_ref()) {
                SpecValidation::Valid { spec, warnings } => {
                    // Successful validation resets the retry counter
                    retry_count = 0;
                    emit(
                        &updates,
                        AnalyticsTurnUpdate::Validated { error: None, retry_count },
                    )
                    .await;
                    return self
                        .execute_and_format(&request, spec, warnings, retry_count, &updates)
                        .await;
                }
                SpecValidation::Retry { error } => {
                    emit(
                        &updates,
                        AnalyticsTurnUpdate::Validated {
                            error: Some(error.clone()),
                            retry_count,
                        },
                    )
                    .await;

                    if retry_count >= MAX_RETRIES {
                        warn!(
                            thread_id = %request.thread_id,
                            error = %error,
                            "spec validation retries exhausted"
                        );
                        return failure_outcome(
                            format_validation_failure(&error),
                            Some(candidate),
                            retry_count,
                        );
                    }

                    retry_count += 1;
                    last_error = Some(error);
                }
            }
        }
    }

    async fn execute_and_format(
        &self,
        request: &AnalyticsTurnRequest,
        spec: QuerySpec,
        warnings: Vec<String>,
        retry_count: u32,
        updates: &Option<mpsc::Sender<AnalyticsTurnUpdate>>,
    ) -> AnalyticsTurnOutcome {
        let built = build_analytics_query(&spec);

        let result = match self
            .store
            .fetch_analytics(&built.statement, &built.columns)
            .await
        {
            Ok(rows) => TabularResult::from_rows(built.columns, rows, built.effective_limit),
            Err(err) => {
                warn!(thread_id = %request.thread_id, error = %err, "analytics execution failed");
                return failure_outcome(
                    format_validation_failure(&format!("Query failed: {err}.")),
                    Some(spec),
                    retry_count,
                );
            }
        };

        emit(updates, AnalyticsTurnUpdate::Executed { row_count: result.row_count }).await;

        let render_hint = select_render_hint(&result, &spec);
        let answer_text = format_answer(&spec, &result, &render_hint, &warnings);

        info!(
            thread_id = %request.thread_id,
            row_count = result.row_count,
            truncated = result.truncated,
            retry_count,
            "analytics turn complete"
        );

        AnalyticsTurnOutcome {
            answer_text,
            result,
            context: AnalyticsContext {
                last_query_spec: Some(spec),
                last_render_hint: Some(render_hint.clone()),
            },
            render_hint,
            validation_error: None,
            retry_count,
        }
    }
}

/// Outcome for a turn that never produced executable results
fn failure_outcome(
    answer_text: String,
    spec: Option<QuerySpec>,
    retry_count: u32,
) -> AnalyticsTurnOutcome {
    AnalyticsTurnOutcome {
        validation_error: Some(answer_text.clone()),
        answer_text,
        result: TabularResult::default(),
        render_hint: RenderHint {
            primary: RenderPrimary::Table,
            confidence: 0.4,
            reason: None,
        },
        context: AnalyticsContext {
            last_query_spec: spec,
            last_render_hint: None,
        },
        retry_count,
    }
}

async fn emit(
    updates: &Option<mpsc::Sender<AnalyticsTurnUpdate>>,
    update: AnalyticsTurnUpdate,
) {
    if let Some(tx) = updates {
        let _ = tx.send(update).await;
    }
}
