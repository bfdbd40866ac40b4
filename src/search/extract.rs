//! Search extraction stage.
//!
//! Asks the model to either extract a partial filter set or respond
//! conversationally, classifying intent from which tool it invoked. The
//! current neighborhood and tag vocabularies are injected into the system
//! prompt so the model cannot hallucinate either.

use serde_json::Value;
use tracing::warn;

use crate::domain::{tags, NeighborhoodCatalog};
use crate::error::LlmError;
use crate::llm::{ChatMessage, LlmClient, ModelReply, ToolDefinition};

use super::filters::FilterMap;
use super::schema::{
    conversation_json_schema, filters_json_schema, CONVERSATION_TOOL_NAME, FILTER_TOOL_NAME,
};

/// Fallback reply when the model produced neither a tool call nor text
const GENERIC_HELP: &str =
    "I can help you search for NYC apartments. Try something like \"2 bedrooms in Chelsea under $4,000\".";

/// What extraction produced for this turn
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// A partial filter set to merge into prior-turn state
    Filters(FilterMap),
    /// A conversational reply; filters are left untouched
    Conversational {
        message: String,
        suggested_queries: Vec<String>,
    },
}

fn filter_tool() -> ToolDefinition {
    ToolDefinition {
        name: FILTER_TOOL_NAME.to_string(),
        description: "Extract search filters from a natural language property search query. \
                      Only include filters the user explicitly mentioned or strongly implied. \
                      For range fields use min/max objects; for an exact value set min and max \
                      to the same number. Set a field to null to remove a previously applied \
                      filter the user asked to drop."
            .to_string(),
        input_schema: filters_json_schema(),
    }
}

fn conversation_tool() -> ToolDefinition {
    ToolDefinition {
        name: CONVERSATION_TOOL_NAME.to_string(),
        description: "Respond conversationally when the user is not issuing a search request: \
                      greetings, thanks, questions about neighborhoods or how the product \
                      works. Optionally include up to three concrete follow-up search queries."
            .to_string(),
        input_schema: conversation_json_schema(),
    }
}

fn tag_vocabulary() -> Value {
    let mut categories = serde_json::Map::new();
    for (category, tag_names) in tags::TAG_CATEGORIES {
        categories.insert(
            category.to_string(),
            Value::Array(tag_names.iter().map(|t| Value::String(t.to_string())).collect()),
        );
    }
    Value::Object(categories)
}

fn system_prompt(catalog: &NeighborhoodCatalog) -> String {
    let neighborhoods =
        serde_json::to_string(&catalog.names()).unwrap_or_else(|_| "[]".to_string());
    let tag_list =
        serde_json::to_string_pretty(&tag_vocabulary()).unwrap_or_else(|_| "{}".to_string());

    format!(
        r#"You are a system that extracts search filters from natural language NYC apartment search queries.

AVAILABLE NEIGHBORHOODS:
{neighborhoods}

AVAILABLE TAGS:
{tag_list}

CRITICAL RULES:
1. Only use neighborhoods from the list above. Never invent neighborhoods, even if the user names one.
2. Only use tags from the list above, and only tags actually relevant to the query.
3. For numeric ranges, use min/max objects (e.g., {{"min": 2, "max": 2}} for exactly 2).
4. Be conservative - don't add filters the user didn't explicitly request.
5. If this is a modification request (e.g., "change the max price"), update only the mentioned fields.
6. If the user is not searching (greetings, thanks, questions about areas), respond with the conversational tool instead."#
    )
}

/// Run one extraction against the model.
///
/// `prior_filters` gives the model modification context; a validation
/// error from the previous attempt is prefixed for retry turns. Provider
/// errors propagate to the caller as a parse-stage failure.
pub async fn extract(
    llm: &dyn LlmClient,
    user_text: &str,
    prior_filters: &FilterMap,
    validation_error: Option<&str>,
    catalog: &NeighborhoodCatalog,
) -> Result<Extraction, LlmError> {
    let mut messages = Vec::new();

    if !prior_filters.is_empty() {
        let serialized = serde_json::to_string_pretty(prior_filters)
            .unwrap_or_else(|_| "{}".to_string());
        messages.push(ChatMessage::user(format!(
            "Current active filters:\n{serialized}\n\nIf the user is asking to modify these \
             filters, update only the fields they mention and preserve the rest."
        )));
    }

    let prompt = match validation_error {
        Some(error) => format!(
            "Previous attempt failed with error: {error}\n\nPlease fix the issue and try \
             again. Original query: {user_text}"
        ),
        None => user_text.to_string(),
    };
    messages.push(ChatMessage::user(prompt));

    let reply = llm
        .invoke_tools(
            &system_prompt(catalog),
            &messages,
            &[filter_tool(), conversation_tool()],
            None,
        )
        .await?;

    Ok(classify_reply(reply))
}

/// Map the model reply onto an intent
fn classify_reply(reply: ModelReply) -> Extraction {
    match reply {
        ModelReply::ToolCall { name, arguments } if name == FILTER_TOOL_NAME => {
            match arguments {
                Value::Object(map) => Extraction::Filters(map),
                other => {
                    warn!(?other, "filter tool returned a non-object; treating as empty");
                    Extraction::Filters(FilterMap::new())
                }
            }
        }
        ModelReply::ToolCall { name, arguments } if name == CONVERSATION_TOOL_NAME => {
            let message = arguments["message"].as_str().unwrap_or(GENERIC_HELP).to_string();
            let mut suggested: Vec<String> = arguments["suggested_queries"]
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|v| v.as_str().map(String::from))
                        .collect()
                })
                .unwrap_or_default();
            suggested.truncate(3);
            Extraction::Conversational {
                message,
                suggested_queries: suggested,
            }
        }
        ModelReply::ToolCall { name, .. } => {
            warn!(tool = %name, "model invoked an unknown tool; falling back to help text");
            Extraction::Conversational {
                message: GENERIC_HELP.to_string(),
                suggested_queries: Vec::new(),
            }
        }
        ModelReply::Text(content) => {
            let trimmed = content.trim();
            Extraction::Conversational {
                message: if trimmed.is_empty() {
                    GENERIC_HELP.to_string()
                } else {
                    trimmed.to_string()
                },
                suggested_queries: Vec::new(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_tool_call_classifies_as_search() {
        let reply = ModelReply::ToolCall {
            name: FILTER_TOOL_NAME.to_string(),
            arguments: json!({ "bedrooms": { "min": 2, "max": 2 } }),
        };
        match classify_reply(reply) {
            Extraction::Filters(map) => assert!(map.contains_key("bedrooms")),
            other => panic!("expected filters, got {other:?}"),
        }
    }

    #[test]
    fn conversation_tool_call_carries_suggestions() {
        let reply = ModelReply::ToolCall {
            name: CONVERSATION_TOOL_NAME.to_string(),
            arguments: json!({
                "message": "Chelsea is lovely.",
                "suggested_queries": ["2br in Chelsea", "studios in Chelsea",
                                      "no-fee in Chelsea", "a fourth"]
            }),
        };
        match classify_reply(reply) {
            Extraction::Conversational { message, suggested_queries } => {
                assert_eq!(message, "Chelsea is lovely.");
                assert_eq!(suggested_queries.len(), 3);
            }
            other => panic!("expected conversational, got {other:?}"),
        }
    }

    #[test]
    fn free_text_falls_back_to_conversational() {
        match classify_reply(ModelReply::Text("Happy to help!".into())) {
            Extraction::Conversational { message, suggested_queries } => {
                assert_eq!(message, "Happy to help!");
                assert!(suggested_queries.is_empty());
            }
            other => panic!("expected conversational, got {other:?}"),
        }
    }

    #[test]
    fn empty_text_falls_back_to_generic_help() {
        match classify_reply(ModelReply::Text("  ".into())) {
            Extraction::Conversational { message, .. } => {
                assert_eq!(message, GENERIC_HELP);
            }
            other => panic!("expected conversational, got {other:?}"),
        }
    }
}
