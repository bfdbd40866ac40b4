//! Analytics extraction stage.
//!
//! Asks the model for a complete replacement Query Specification each turn
//! (specs have cross-field dependencies, so partial patches don't
//! compose). On any model failure it falls back to deterministic keyword
//! rules: analytics must always produce *some* queryable spec.

use serde_json::{json, Value};
use tracing::warn;

use crate::llm::{ChatMessage, LlmClient, ModelReply, ToolDefinition};

use super::spec::{
    normalize_spec, Dataset, Dimension, Measure, MeasureField, MeasureOp, QuerySpec, SpecFilters,
    VizPreference,
};

pub const SPEC_TOOL_NAME: &str = "build_analytics_query_spec";

const BOROUGH_TOKENS: [&str; 5] = ["manhattan", "brooklyn", "queens", "bronx", "staten island"];

fn spec_tool() -> ToolDefinition {
    ToolDefinition {
        name: SPEC_TOOL_NAME.to_string(),
        description: "Build an aggregate analytics query spec for NYC housing data.\n\n\
                      Rules:\n\
                      1. Only aggregate-safe analytics are allowed.\n\
                      2. Never return listing-level row selections like address/id.\n\
                      3. Allowed measure ops: avg, median, min, max, count.\n\
                      4. Allowed dimensions: borough, neighborhood, zipcode, property_type, month.\n\
                      5. Use dataset=trend for time-series questions.\n\
                      6. Use vizPreference=heatmap only for geospatial density point maps.\n\
                      7. Keep limits small; never exceed 50.\n\
                      8. For follow-up prompts, apply the previous query context unless the user \
                         requests a full reset.\n\
                      9. Return only this tool call with valid JSON args."
            .to_string(),
        input_schema: spec_json_schema(),
    }
}

/// JSON schema mirroring the typed QuerySpec
pub fn spec_json_schema() -> Value {
    let number_range = json!({
        "type": "object",
        "properties": {
            "min": { "type": "number" },
            "max": { "type": "number" }
        },
        "additionalProperties": false
    });

    json!({
        "type": "object",
        "properties": {
            "dataset": { "type": "string", "enum": ["current", "trend"] },
            "measures": {
                "type": "array",
                "minItems": 1,
                "maxItems": 3,
                "items": {
                    "type": "object",
                    "properties": {
                        "op": { "type": "string", "enum": ["avg", "median", "min", "max", "count"] },
                        "field": { "type": "string", "enum": ["price", "listings"] },
                        "alias": { "type": "string", "maxLength": 50 }
                    },
                    "required": ["op", "field"]
                }
            },
            "dimensions": {
                "type": "array",
                "maxItems": 2,
                "items": {
                    "type": "string",
                    "enum": ["borough", "neighborhood", "zipcode", "property_type", "month"]
                }
            },
            "filters": {
                "type": "object",
                "properties": {
                    "borough": { "type": "array", "items": { "type": "string" }, "maxItems": 20 },
                    "neighborhood": { "type": "array", "items": { "type": "string" }, "maxItems": 50 },
                    "zipcode": { "type": "array", "items": { "type": "string" }, "maxItems": 25 },
                    "propertyType": { "type": "array", "items": { "type": "string" }, "maxItems": 10 },
                    "price": number_range.clone(),
                    "bedrooms": number_range.clone(),
                    "bathrooms": number_range,
                    "noFee": { "type": "boolean" },
                    "petFriendly": { "type": "boolean" },
                    "tags": { "type": "array", "items": { "type": "string" }, "maxItems": 10 },
                    "date": {
                        "type": "object",
                        "properties": {
                            "start": { "type": "string", "format": "date" },
                            "end": { "type": "string", "format": "date" },
                            "lastMonths": { "type": "integer", "minimum": 1, "maximum": 36 }
                        },
                        "additionalProperties": false
                    }
                },
                "additionalProperties": false
            },
            "timeBucket": { "type": "string", "enum": ["month"] },
            "sort": {
                "type": "object",
                "properties": {
                    "field": { "type": "string" },
                    "direction": { "type": "string", "enum": ["asc", "desc"] }
                },
                "required": ["field", "direction"]
            },
            "limit": { "type": "integer", "minimum": 1, "maximum": 5000 },
            "vizPreference": {
                "type": "string",
                "enum": ["auto", "table", "bar", "line", "metric", "heatmap", "map_bubble"]
            }
        },
        "required": ["dataset", "measures"]
    })
}

const SYSTEM_PROMPT: &str = r#"You transform user questions into an analytics QuerySpec for NYC apartment data.

Data source notes:
- current dataset: current active listings
- trend dataset: historical monthly snapshots

Safety:
- Aggregate-safe output only.
- No listing-level fields (id/address/url/images/agent).
- Max limit is 50.

Follow-up behavior:
- When a user asks a follow-up, keep previous intent and modify relevant fields only by returning a complete updated QuerySpec."#;

/// Infer a visualization preference from prompt keywords
pub fn infer_viz_preference(message: &str) -> VizPreference {
    let lower = message.to_lowercase();

    if lower.contains("heatmap") {
        return VizPreference::Heatmap;
    }
    if lower.contains("map") {
        return VizPreference::MapBubble;
    }
    if lower.contains("line chart") || lower.contains("trend") || lower.contains("over time") {
        return VizPreference::Line;
    }
    if lower.contains("bar chart") || lower.contains("histogram") {
        return VizPreference::Bar;
    }
    if lower.contains("table") || lower.contains("top ") {
        return VizPreference::Table;
    }
    if lower.contains("average") || lower.contains("median") || lower.contains("count") {
        return VizPreference::Metric;
    }

    VizPreference::Auto
}

/// Keyword-rule spec inference, used whenever the model fails
pub fn fallback_spec(message: &str, existing: Option<&QuerySpec>) -> QuerySpec {
    let lower = message.to_lowercase();
    let mentions_trend =
        lower.contains("trend") || lower.contains("over time") || lower.contains("monthly");

    let op = if lower.contains("median") {
        MeasureOp::Median
    } else if lower.contains("minimum") || lower.contains("lowest") {
        MeasureOp::Min
    } else if lower.contains("maximum") || lower.contains("highest") {
        MeasureOp::Max
    } else if lower.contains("count") || lower.contains("how many") {
        MeasureOp::Count
    } else {
        MeasureOp::Avg
    };

    let mut dimensions = Vec::new();
    if mentions_trend {
        dimensions.push(Dimension::Month);
    }
    if lower.contains("by neighborhood") || lower.contains("neighborhoods") {
        dimensions.push(Dimension::Neighborhood);
    } else if lower.contains("by borough") || lower.contains("boroughs") {
        dimensions.push(Dimension::Borough);
    }

    let borough_filters: Vec<String> = BOROUGH_TOKENS
        .iter()
        .filter(|token| lower.contains(*token))
        .map(|token| token.to_string())
        .collect();

    let pet_friendly = lower.contains("pet") || lower.contains("cats") || lower.contains("dogs");

    let candidate = QuerySpec {
        dataset: if mentions_trend { Dataset::Trend } else { Dataset::Current },
        measures: vec![Measure {
            op,
            field: if op == MeasureOp::Count {
                MeasureField::Listings
            } else {
                MeasureField::Price
            },
            alias: None,
        }],
        dimensions,
        filters: SpecFilters {
            borough: (!borough_filters.is_empty()).then_some(borough_filters),
            pet_friendly: pet_friendly.then_some(true),
            ..SpecFilters::default()
        },
        viz_preference: infer_viz_preference(message),
        limit: lower.contains("top 10").then_some(10),
        ..QuerySpec::default()
    };

    normalize_spec(candidate, existing)
}

/// Run one extraction. Never fails: any model error degrades to the
/// keyword rules so the turn always has a queryable spec.
pub async fn extract_spec(
    llm: &dyn LlmClient,
    user_text: &str,
    existing: Option<&QuerySpec>,
    validation_error: Option<&str>,
) -> QuerySpec {
    let context = match existing {
        Some(spec) => format!(
            "Current query context:\n{}",
            serde_json::to_string_pretty(spec).unwrap_or_else(|_| "{}".to_string())
        ),
        None => "No current query context.".to_string(),
    };

    let question = match validation_error {
        Some(error) => format!(
            "Previous spec failed validation with error: {error}\n\nPlease fix the issue. \
             User question: {user_text}"
        ),
        None => format!("User question: {user_text}"),
    };

    let messages = [ChatMessage::user(context), ChatMessage::user(question)];

    let inferred_viz = infer_viz_preference(user_text);

    let reply = llm
        .invoke_tools(SYSTEM_PROMPT, &messages, &[spec_tool()], Some(SPEC_TOOL_NAME))
        .await;

    match reply {
        Ok(ModelReply::ToolCall { name, arguments }) if name == SPEC_TOOL_NAME => {
            match serde_json::from_value::<QuerySpec>(arguments) {
                Ok(mut candidate) => {
                    // A prompt-level visualization ask wins over the model's choice
                    if inferred_viz != VizPreference::Auto {
                        candidate.viz_preference = inferred_viz;
                    }
                    normalize_spec(candidate, existing)
                }
                Err(err) => {
                    warn!(error = %err, "spec tool arguments did not parse; using keyword fallback");
                    fallback_spec(user_text, existing)
                }
            }
        }
        Ok(_) => fallback_spec(user_text, existing),
        Err(err) => {
            warn!(error = %err, "analytics extraction failed; using keyword fallback");
            fallback_spec(user_text, existing)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_by_neighborhood_infers_op_and_dimension() {
        let spec = fallback_spec("median rent by neighborhood", None);
        assert_eq!(spec.measures[0].op, MeasureOp::Median);
        assert!(spec.dimensions.contains(&Dimension::Neighborhood));
        assert_eq!(spec.dataset, Dataset::Current);
    }

    #[test]
    fn trend_words_infer_trend_dataset_and_month() {
        let spec = fallback_spec("price trend over time in brooklyn", None);
        assert_eq!(spec.dataset, Dataset::Trend);
        assert!(spec.has_month_dimension());
        assert_eq!(spec.filters.borough, Some(vec!["brooklyn".to_string()]));
        assert_eq!(spec.viz_preference, VizPreference::Line);
    }

    #[test]
    fn how_many_infers_a_count_of_listings() {
        let spec = fallback_spec("how many pet friendly apartments are there?", None);
        assert_eq!(spec.measures[0].op, MeasureOp::Count);
        assert_eq!(spec.measures[0].field, MeasureField::Listings);
        assert_eq!(spec.filters.pet_friendly, Some(true));
    }

    #[test]
    fn top_10_sets_the_limit() {
        let spec = fallback_spec("top 10 neighborhoods by average price", None);
        assert_eq!(spec.limit, Some(10));
        assert!(spec.dimensions.contains(&Dimension::Neighborhood));
    }

    #[test]
    fn heatmap_keyword_wins_viz_inference() {
        assert_eq!(infer_viz_preference("show me a heatmap of prices"), VizPreference::Heatmap);
        assert_eq!(infer_viz_preference("average price"), VizPreference::Metric);
        assert_eq!(infer_viz_preference("what about queens"), VizPreference::Auto);
    }

    #[test]
    fn fallback_keeps_existing_filters_through_merge() {
        let existing = fallback_spec("average price in brooklyn", None);
        let follow_up = fallback_spec("what's the median?", Some(&existing));
        assert_eq!(follow_up.measures[0].op, MeasureOp::Median);
        assert_eq!(follow_up.filters.borough, Some(vec!["brooklyn".to_string()]));
    }
}
