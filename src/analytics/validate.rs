//! Analytics spec validation.
//!
//! Re-checks structural constraints on the extracted spec, re-derives
//! normalized state, clamps the row cap, reconciles measure compatibility
//! (surfacing a warning when an aggregate silently degrades to a count),
//! and runs the dataset/visualization support check.

use super::spec::{
    clamp_limit, normalize_spec, reconcile_measures, Dataset, Dimension, NumberRange, QuerySpec,
    VizPreference,
};

/// Result of validating one candidate spec
#[derive(Debug, Clone, PartialEq)]
pub enum SpecValidation {
    /// Normalized, executable spec; warnings describe silent repairs
    Valid {
        spec: QuerySpec,
        warnings: Vec<String>,
    },
    /// A retryable error to feed back into extraction
    Retry { error: String },
}

impl SpecValidation {
    fn retry(error: impl Into<String>) -> Self {
        SpecValidation::Retry { error: error.into() }
    }
}

/// Validate a candidate spec against the previous turn's spec.
pub fn validate_spec(candidate: &QuerySpec, existing: Option<&QuerySpec>) -> SpecValidation {
    // Structural constraints
    if candidate.measures.is_empty() {
        return SpecValidation::retry("Invalid query specification: at least one measure is required");
    }
    if candidate.measures.len() > 3 {
        return SpecValidation::retry("Invalid query specification: at most 3 measures are allowed");
    }
    if candidate.dimensions.len() > 2 {
        return SpecValidation::retry(
            "Invalid query specification: at most 2 dimensions are allowed",
        );
    }
    for measure in &candidate.measures {
        if let Some(alias) = &measure.alias {
            if alias.trim().is_empty() || alias.len() > 50 {
                return SpecValidation::retry(
                    "Invalid query specification: measure alias must be 1-50 characters",
                );
            }
        }
    }

    let filters = &candidate.filters;
    for (name, range) in [
        ("price", filters.price),
        ("bedrooms", filters.bedrooms),
        ("bathrooms", filters.bathrooms),
    ] {
        if let Some(NumberRange { min: Some(min), max: Some(max) }) = range {
            if min > max {
                return SpecValidation::retry(format!(
                    "Invalid query specification: {name} range min cannot exceed max"
                ));
            }
        }
    }

    if let Some(date) = filters.date {
        if let Some(last_months) = date.last_months {
            if !(1..=36).contains(&last_months) {
                return SpecValidation::retry(
                    "Invalid query specification: lastMonths must be between 1 and 36",
                );
            }
        }
    }

    // Re-derive normalized state, then reconcile measures
    let normalized = normalize_spec(candidate.clone(), existing);
    let (mut spec, warnings) = reconcile_measures(normalized);
    spec.limit = Some(clamp_limit(spec.limit));

    // Support check: some shapes simply cannot render
    if spec.dataset == Dataset::Trend && spec.viz_preference == VizPreference::Heatmap {
        return SpecValidation::retry("Heatmap is only supported for current listing snapshots.");
    }
    if spec.viz_preference == VizPreference::Line && !spec.dimensions.contains(&Dimension::Month) {
        return SpecValidation::retry("Line charts require a monthly time dimension.");
    }

    SpecValidation::Valid { spec, warnings }
}
