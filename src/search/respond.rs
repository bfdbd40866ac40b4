//! Search response formatting.
//!
//! Builds a deterministic natural-language summary from the *validated*
//! filter set (never the raw extraction) and the result count.

use crate::domain::tags;
use crate::text::{number, thousands};

use super::filters::{FilterSet, RangeFilter};

/// Compose the turn's response sentence.
pub fn format_response(
    filters: &FilterSet,
    result_count: i64,
    warning: Option<&str>,
) -> String {
    let parts = describe_filters(filters);

    let mut message = if result_count == 0 {
        "No apartments found matching your criteria. Try broadening your search.".to_string()
    } else {
        let noun = if result_count == 1 { "apartment" } else { "apartments" };
        if parts.is_empty() {
            format!("Found {result_count} {noun} matching your search.")
        } else {
            format!("Found {result_count} {noun} {}.", parts.join(", "))
        }
    };

    if let Some(warning) = warning {
        message.push(' ');
        message.push_str(warning);
    }

    message
}

/// Describe each active filter category in display order
fn describe_filters(filters: &FilterSet) -> Vec<String> {
    let mut parts = Vec::new();

    if let Some(price) = filters.price {
        if let Some(part) = describe_price(price) {
            parts.push(part);
        }
    }

    if let Some(bedrooms) = filters.bedrooms {
        if let Some(part) = describe_bedrooms(bedrooms) {
            parts.push(part);
        }
    }

    if let Some(neighborhoods) = filters.neighborhood.as_ref().filter(|n| !n.is_empty()) {
        if neighborhoods.len() <= 2 {
            parts.push(format!("in {}", neighborhoods.join(" or ")));
        } else {
            parts.push(format!("in {} neighborhoods", neighborhoods.len()));
        }
    }

    if let Some(boroughs) = filters.borough.as_ref() {
        let values = boroughs.values();
        if !values.is_empty() {
            parts.push(format!("in {}", values.join(" or ")));
        }
    }

    if filters.no_fee == Some(true) {
        parts.push("no broker fee".to_string());
    }

    if let Some(amenities) = filters.amenities.as_ref().filter(|a| !a.is_empty()) {
        parts.push(
            amenities
                .iter()
                .take(2)
                .map(|a| a.replace('_', " "))
                .collect::<Vec<_>>()
                .join(", "),
        );
    }

    if let Some(tag_list) = filters.tag_list.as_ref().filter(|t| !t.is_empty()) {
        parts.push(
            tag_list
                .iter()
                .take(3)
                .map(|t| tags::display_label(t).to_string())
                .collect::<Vec<_>>()
                .join(", "),
        );
    }

    parts
}

fn describe_price(price: RangeFilter) -> Option<String> {
    match (price.min, price.max) {
        (Some(min), Some(max)) if min > 0.0 && max > 0.0 => Some(format!(
            "${} - ${}",
            thousands(min as i64),
            thousands(max as i64)
        )),
        (_, Some(max)) if max > 0.0 => Some(format!("under ${}", thousands(max as i64))),
        (Some(min), _) if min > 0.0 => Some(format!("over ${}", thousands(min as i64))),
        _ => None,
    }
}

fn describe_bedrooms(bedrooms: RangeFilter) -> Option<String> {
    match (bedrooms.min, bedrooms.max) {
        (Some(min), Some(max)) if min == 0.0 && max == 0.0 => Some("studio".to_string()),
        (Some(min), Some(max)) if min == max => {
            let plural = if min == 1.0 { "" } else { "s" };
            Some(format!("{} bedroom{plural}", number(min)))
        }
        (Some(min), Some(max)) => Some(format!("{}-{} bedrooms", number(min), number(max))),
        (Some(min), None) if min > 0.0 => Some(format!("{}+ bedrooms", number(min))),
        (None, Some(max)) if max > 0.0 => Some(format!("up to {} bedrooms", number(max))),
        _ => None,
    }
}
