//! Search filter validation.
//!
//! Runs the ordered check sequence over the merged raw filter state:
//! structural shape, borough aliases, neighborhood allowlist, amenity
//! resolution, tag repair, range sanity. The outcome is either a repaired
//! typed filter set (possibly with a non-fatal warning) or a retryable
//! error for the orchestrator's bounded retry loop.

use serde_json::Value;
use tracing::debug;

use crate::domain::{amenities, boroughs, tags, NeighborhoodCatalog};

use super::filters::{FilterMap, FilterSet, StringOrList};
use super::schema::check_filter_shape;

/// Max suggestions offered alongside an unknown-value error
const MAX_SUGGESTIONS: usize = 3;

/// Result of one validation pass
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    /// Filters are usable; invalid tags may have been silently repaired
    Valid {
        filters: FilterSet,
        warning: Option<String>,
    },
    /// A retryable error to feed back into extraction
    Retry { error: String },
}

impl ValidationOutcome {
    fn retry(error: impl Into<String>) -> Self {
        ValidationOutcome::Retry { error: error.into() }
    }
}

/// Validate and repair a merged raw filter map.
pub fn validate_filters(raw: &FilterMap, catalog: &NeighborhoodCatalog) -> ValidationOutcome {
    // 1. Structural shape and numeric bounds
    let shape_errors = check_filter_shape(&Value::Object(raw.clone()));
    if !shape_errors.is_empty() {
        return ValidationOutcome::retry(format!(
            "Invalid filter format: {}",
            shape_errors.join("; ")
        ));
    }

    let mut filters = match FilterSet::from_map(raw) {
        Ok(filters) => filters,
        Err(e) => {
            return ValidationOutcome::retry(format!("Invalid filter format: {e}"));
        }
    };

    // 2. Boroughs normalize through the alias table
    if let Some(borough) = filters.borough.take() {
        let mut normalized = Vec::new();
        for value in borough.values() {
            match boroughs::normalize(&value) {
                Some(canonical) => {
                    if !normalized.contains(&canonical.to_string()) {
                        normalized.push(canonical.to_string());
                    }
                }
                None => {
                    let suggestions = boroughs::suggest(&value, MAX_SUGGESTIONS);
                    let hint = if suggestions.is_empty() {
                        String::new()
                    } else {
                        format!(" Did you mean: {}?", suggestions.join(", "))
                    };
                    return ValidationOutcome::retry(format!(
                        "Unknown borough: {value}.{hint}"
                    ));
                }
            }
        }
        filters.borough = match normalized.len() {
            0 => None,
            1 => Some(StringOrList::One(normalized.remove(0))),
            _ => Some(StringOrList::Many(normalized)),
        };
    }

    // 3. Neighborhoods against the cached allowlist. An empty catalog means
    //    the reference data failed to load; validation stays permissive.
    if let Some(neighborhoods) = filters.neighborhood.take() {
        if catalog.is_empty() {
            filters.neighborhood = Some(
                neighborhoods.iter().map(|n| n.to_lowercase()).collect(),
            );
        } else {
            let mut valid = Vec::new();
            let mut invalid = Vec::new();
            for name in &neighborhoods {
                let lower = name.to_lowercase();
                if catalog.contains(&lower) {
                    valid.push(lower);
                } else {
                    invalid.push(name.clone());
                }
            }

            if !invalid.is_empty() {
                let suggestions = catalog.suggest(&invalid, MAX_SUGGESTIONS);
                let hint = if suggestions.is_empty() {
                    String::new()
                } else {
                    format!(" Did you mean: {}?", suggestions.join(", "))
                };
                return ValidationOutcome::retry(format!(
                    "Unknown neighborhoods: {}.{hint}",
                    invalid.join(", ")
                ));
            }
            filters.neighborhood = Some(valid);
        }
    }

    // 4. Amenities through staged fuzzy resolution
    if let Some(requested) = filters.amenities.take() {
        let (resolved, unresolved) = amenities::resolve_all(&requested);
        if !unresolved.is_empty() {
            return ValidationOutcome::retry(format!(
                "Unknown amenities: {}. Check available amenities in the database schema.",
                unresolved.join(", ")
            ));
        }
        filters.amenities = Some(resolved.into_iter().map(String::from).collect());
    }

    // 5. Tags are repaired, never retried
    let mut warning = None;
    if let Some(requested) = filters.tag_list.take() {
        let (resolved, dropped) = tags::resolve_all(&requested);
        if !dropped.is_empty() {
            debug!(dropped = ?dropped, "dropping unknown tags");
        }
        if resolved.is_empty() && !requested.is_empty() {
            warning = Some(format!(
                "Ignored unknown tags: {}.",
                dropped.join(", ")
            ));
            filters.tag_list = None;
        } else {
            filters.tag_list = Some(resolved.into_iter().map(String::from).collect());
        }
    }

    // 6. Range sanity
    if let Some(price) = filters.price {
        if let (Some(min), Some(max)) = (price.min, price.max) {
            if min > max {
                return ValidationOutcome::retry(format!(
                    "Price min (${min}) cannot exceed max (${max})"
                ));
            }
        }
    }
    if let Some(bedrooms) = filters.bedrooms {
        if let (Some(min), Some(max)) = (bedrooms.min, bedrooms.max) {
            if min > max {
                return ValidationOutcome::retry(format!(
                    "Bedrooms min ({min}) cannot exceed max ({max})"
                ));
            }
        }
    }

    ValidationOutcome::Valid { filters, warning }
}
