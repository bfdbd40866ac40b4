//! Tool schemas for the search extraction stage.
//!
//! The same schema constrains the model's tool call and backs the
//! structural validation pass, so the two can never drift.

use serde_json::{json, Value};

pub const FILTER_TOOL_NAME: &str = "extract_search_filters";
pub const CONVERSATION_TOOL_NAME: &str = "respond_conversationally";

/// Numeric bounds enforced structurally
pub const MAX_PRICE: f64 = 100_000_000.0;
pub const MAX_ROOMS: f64 = 20.0;

fn range_schema(maximum: Option<f64>) -> Value {
    let mut bound = json!({ "type": ["number", "null"], "minimum": 0 });
    if let Some(max) = maximum {
        bound["maximum"] = json!(max);
    }
    json!({
        "type": ["object", "null"],
        "properties": { "min": bound.clone(), "max": bound },
        "additionalProperties": false
    })
}

fn string_or_list_schema() -> Value {
    json!({
        "anyOf": [
            { "type": "string" },
            { "type": "array", "items": { "type": "string" } },
            { "type": "null" }
        ]
    })
}

fn string_list_schema() -> Value {
    json!({
        "type": ["array", "null"],
        "items": { "type": "string" }
    })
}

/// JSON schema for the partial filter set the model returns.
///
/// A field set to `null` is a deletion signal for the merge engine, so
/// every field admits null.
pub fn filters_json_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "price": range_schema(Some(MAX_PRICE)),
            "bedrooms": range_schema(Some(MAX_ROOMS)),
            "bathrooms": range_schema(Some(MAX_ROOMS)),
            "sqft": range_schema(None),
            "built_in": range_schema(None),
            "brokers_fee": range_schema(None),
            "days_on_market": range_schema(None),
            "property_type": string_or_list_schema(),
            "neighborhood": string_list_schema(),
            "borough": string_or_list_schema(),
            "zipcode": string_or_list_schema(),
            "tag_list": string_list_schema(),
            "amenities": string_list_schema(),
            "no_fee": { "type": ["boolean", "null"] },
            "address": { "type": ["string", "null"] }
        }
    })
}

/// Schema for the conversational tool
pub fn conversation_json_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "message": {
                "type": "string",
                "description": "The conversational reply to show the user"
            },
            "suggested_queries": {
                "type": "array",
                "items": { "type": "string" },
                "maxItems": 3,
                "description": "Up to three concrete follow-up search queries"
            }
        },
        "required": ["message"]
    })
}

/// Validate a raw filter map against the structural schema, returning all
/// violation messages.
pub fn check_filter_shape(raw: &Value) -> Vec<String> {
    match jsonschema::validator_for(&filters_json_schema()) {
        Ok(validator) => validator
            .iter_errors(raw)
            .map(|e| format!("{}: {}", e.instance_path, e))
            .collect(),
        Err(e) => vec![format!("Invalid schema: {}", e)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_filters_pass() {
        let raw = json!({
            "price": { "min": null, "max": 3000 },
            "neighborhood": ["chelsea"],
            "no_fee": true
        });
        assert!(check_filter_shape(&raw).is_empty());
    }

    #[test]
    fn out_of_bounds_bedrooms_fail() {
        let raw = json!({ "bedrooms": { "min": 0, "max": 25 } });
        assert!(!check_filter_shape(&raw).is_empty());
    }

    #[test]
    fn scalar_range_field_fails() {
        let raw = json!({ "price": 3000 });
        assert!(!check_filter_shape(&raw).is_empty());
    }

    #[test]
    fn null_fields_are_legal_deletion_signals() {
        let raw = json!({ "neighborhood": null, "price": null });
        assert!(check_filter_shape(&raw).is_empty());
    }
}
