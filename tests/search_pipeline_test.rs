//! End-to-end tests for the search turn pipeline, with the model and the
//! store replaced by scripted doubles.

mod helpers;

use std::sync::Arc;

use serde_json::json;
use tokio_stream::StreamExt;

use coapt::search::agent::TurnUpdate;
use coapt::search::{Intent, SearchAgent, SearchTurnRequest};

use helpers::{listing, MemoryStore, ScriptedLlm};

const FILTER_TOOL: &str = "extract_search_filters";
const CONVERSATION_TOOL: &str = "respond_conversationally";

fn agent(llm: ScriptedLlm, store: MemoryStore) -> (Arc<SearchAgent>, Arc<ScriptedLlm>, Arc<MemoryStore>) {
    let llm = Arc::new(llm);
    let store = Arc::new(store);
    let agent = Arc::new(SearchAgent::new(llm.clone(), store.clone()));
    (agent, llm, store)
}

#[tokio::test]
async fn two_bedrooms_in_chelsea_compiles_and_executes() {
    let llm = ScriptedLlm::new(vec![ScriptedLlm::tool_call(
        FILTER_TOOL,
        json!({
            "bedrooms": { "min": 2, "max": 2 },
            "neighborhood": ["Chelsea"],
            "price": { "min": null, "max": 4000 }
        }),
    )]);
    let mut store = MemoryStore::with_neighborhoods(&["Chelsea", "Williamsburg"]);
    store.listings = vec![listing("a", 3800.0), listing("b", 3900.0)];
    store.total_count = 2;

    let (agent, _llm, store) = agent(llm, store);
    let outcome = agent
        .run_turn(SearchTurnRequest::new("2br in Chelsea under $4000", "t1"))
        .await;

    assert_eq!(outcome.intent, Intent::Search);
    assert_eq!(outcome.result_count, 2);
    assert!(outcome.validation_error.is_none());
    assert_eq!(outcome.filters["neighborhood"], json!(["chelsea"]));
    assert_eq!(outcome.filters["bedrooms"], json!({ "min": 2.0, "max": 2.0 }));
    assert!(outcome.response_message.contains("Found 2 apartments"));

    let executed = store.executed_sql();
    assert_eq!(executed.len(), 2);
    let row_query = &executed[0];
    assert!(row_query.contains("lp.bedrooms = $"));
    assert!(row_query.contains("lp.neighborhood IN ("));
    assert!(row_query.contains("lp.price <= $"));
    assert!(executed[1].starts_with("SELECT COUNT(*)"));
}

#[tokio::test]
async fn conversational_turn_leaves_filters_untouched_and_skips_the_store() {
    let llm = ScriptedLlm::new(vec![ScriptedLlm::tool_call(
        CONVERSATION_TOOL,
        json!({
            "message": "You're welcome! Let me know if you need anything else.",
            "suggested_queries": ["2br in Chelsea under $4000"]
        }),
    )]);
    let store = MemoryStore::with_neighborhoods(&["Chelsea"]);

    let (agent, _llm, store) = agent(llm, store);
    let mut request = SearchTurnRequest::new("thanks!", "t1");
    request.prior_filters = json!({ "neighborhood": ["chelsea"] })
        .as_object()
        .cloned()
        .unwrap();

    let outcome = agent.run_turn(request).await;

    assert_eq!(outcome.intent, Intent::Conversational);
    assert!(outcome.response_message.contains("welcome"));
    assert_eq!(outcome.suggested_queries.len(), 1);
    assert_eq!(outcome.filters["neighborhood"], json!(["chelsea"]));
    assert!(store.executed_sql().is_empty());
}

#[tokio::test]
async fn unknown_neighborhood_retries_then_succeeds() {
    let llm = ScriptedLlm::new(vec![
        ScriptedLlm::tool_call(FILTER_TOOL, json!({ "neighborhood": ["Chelsa"] })),
        ScriptedLlm::tool_call(FILTER_TOOL, json!({ "neighborhood": ["Chelsea"] })),
    ]);
    let store = MemoryStore::with_neighborhoods(&["Chelsea"]);

    let (agent, llm, _store) = agent(llm, store);
    let outcome = agent
        .run_turn(SearchTurnRequest::new("apartments in chelsa", "t1"))
        .await;

    assert_eq!(llm.call_count(), 2);
    assert_eq!(outcome.retry_count, 1);
    assert!(outcome.validation_error.is_none());
    assert_eq!(outcome.filters["neighborhood"], json!(["chelsea"]));
}

#[tokio::test]
async fn exhausted_retries_force_progression_with_the_last_error() {
    let bad = || ScriptedLlm::tool_call(FILTER_TOOL, json!({ "neighborhood": ["Chelsa"] }));
    let llm = ScriptedLlm::new(vec![bad(), bad(), bad()]);
    let store = MemoryStore::with_neighborhoods(&["Chelsea"]);

    let (agent, llm, store) = agent(llm, store);
    let outcome = agent
        .run_turn(SearchTurnRequest::new("apartments in chelsa", "t1"))
        .await;

    // One initial attempt plus two retries
    assert_eq!(llm.call_count(), 3);
    assert_eq!(outcome.retry_count, 2);
    let error = outcome.validation_error.expect("last error is carried");
    assert!(error.contains("Unknown neighborhoods"));
    assert!(outcome.response_message.contains("Unknown neighborhoods"));
    // Progression was forced: the query still executed
    assert_eq!(store.executed_sql().len(), 2);
}

#[tokio::test]
async fn provider_failure_surfaces_as_a_parse_error() {
    let llm = ScriptedLlm::new(vec![ScriptedLlm::api_error(500)]);
    let store = MemoryStore::with_neighborhoods(&["Chelsea"]);

    let (agent, _llm, store) = agent(llm, store);
    let outcome = agent
        .run_turn(SearchTurnRequest::new("2br in Chelsea", "t1"))
        .await;

    assert!(outcome
        .validation_error
        .as_deref()
        .unwrap()
        .starts_with("Error parsing query"));
    assert_eq!(outcome.result_count, 0);
    assert!(store.executed_sql().is_empty());
}

#[tokio::test]
async fn store_failure_reports_empty_results_with_a_message() {
    let llm = ScriptedLlm::new(vec![ScriptedLlm::tool_call(
        FILTER_TOOL,
        json!({ "no_fee": true }),
    )]);
    let mut store = MemoryStore::with_neighborhoods(&["Chelsea"]);
    store.fail_queries = true;

    let (agent, _llm, _store) = agent(llm, store);
    let outcome = agent
        .run_turn(SearchTurnRequest::new("no fee apartments", "t1"))
        .await;

    assert_eq!(outcome.result_count, 0);
    assert!(outcome.response_message.starts_with("Search failed"));
}

#[tokio::test]
async fn null_field_in_a_follow_up_removes_the_filter() {
    let llm = ScriptedLlm::new(vec![ScriptedLlm::tool_call(
        FILTER_TOOL,
        json!({ "price": null }),
    )]);
    let store = MemoryStore::with_neighborhoods(&["Chelsea"]);

    let (agent, _llm, _store) = agent(llm, store);
    let mut request = SearchTurnRequest::new("drop the price filter", "t1");
    request.prior_filters = json!({
        "price": { "min": null, "max": 4000 },
        "neighborhood": ["chelsea"]
    })
    .as_object()
    .cloned()
    .unwrap();

    let outcome = agent.run_turn(request).await;

    assert!(!outcome.filters.contains_key("price"));
    assert_eq!(outcome.filters["neighborhood"], json!(["chelsea"]));
}

#[tokio::test]
async fn streaming_turn_emits_stage_updates_and_a_sentinel() {
    let llm = ScriptedLlm::new(vec![ScriptedLlm::tool_call(
        FILTER_TOOL,
        json!({ "no_fee": true }),
    )]);
    let store = MemoryStore::with_neighborhoods(&["Chelsea"]);

    let (agent, _llm, _store) = agent(llm, store);
    let updates: Vec<TurnUpdate> = agent
        .clone()
        .stream_turn(SearchTurnRequest::new("no fee apartments", "t1"))
        .collect()
        .await;

    assert!(matches!(updates.first(), Some(TurnUpdate::Parsed { .. })));
    assert!(updates
        .iter()
        .any(|u| matches!(u, TurnUpdate::Validated { error: None, .. })));
    assert!(updates.iter().any(|u| matches!(u, TurnUpdate::Executed { .. })));
    assert!(matches!(
        updates[updates.len() - 2],
        TurnUpdate::Formatted { .. }
    ));
    assert!(matches!(updates.last(), Some(TurnUpdate::Done)));
}
