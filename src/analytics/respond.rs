//! Analytics answer composition.

use crate::text::{pluralize, thousands};

use super::render::{RenderHint, RenderPrimary};
use super::result::TabularResult;
use super::spec::{QuerySpec, MAX_ANALYTICS_ROWS};

/// Compose the one-line answer for a completed analytics turn.
pub fn format_answer(
    spec: &QuerySpec,
    result: &TabularResult,
    render_hint: &RenderHint,
    warnings: &[String],
) -> String {
    let filter_description = describe_filters(spec);

    let mut answer = if result.row_count == 0 {
        "No data matched your current analytics filters. Try broadening the geography, \
         price range, or timeframe."
            .to_string()
    } else if render_hint.primary == RenderPrimary::Metric {
        match first_numeric_value(result) {
            Some((value, key, label)) => {
                let formatted = format_metric(value, &key, &label);
                if filter_description.is_empty() {
                    format!("Here is the requested aggregate: {formatted}.")
                } else {
                    format!("Here is the requested aggregate: {formatted} {filter_description}.")
                }
            }
            None => "I computed the aggregate and returned it in the result table.".to_string(),
        }
    } else {
        let rows = pluralize(result.row_count as i64, "row", "rows");
        if filter_description.is_empty() {
            format!(
                "I found {} {rows} for your aggregate analytics query.",
                result.row_count
            )
        } else {
            format!(
                "I found {} {rows} for your aggregate analytics query {filter_description}.",
                result.row_count
            )
        }
    };

    if result.truncated {
        answer.push_str(&format!(
            " Results were truncated to the {MAX_ANALYTICS_ROWS}-row safety cap."
        ));
    }

    if let Some(reason) = &render_hint.reason {
        answer.push(' ');
        answer.push_str(reason);
    }

    for warning in warnings {
        answer.push(' ');
        answer.push_str(warning);
    }

    answer
}

/// Answer for a turn that never produced an executable spec.
pub fn format_validation_failure(error: &str) -> String {
    format!(
        "{error} Try asking for an aggregate metric like average/median/count grouped by \
         borough, neighborhood, or month."
    )
}

/// Human description of the active spec filters
pub fn describe_filters(spec: &QuerySpec) -> String {
    let filters = &spec.filters;
    let mut parts: Vec<String> = Vec::new();

    if let Some(boroughs) = filters.borough.as_ref().filter(|b| !b.is_empty()) {
        parts.push(format!("in {}", boroughs.join(", ")));
    }

    if let Some(neighborhoods) = filters.neighborhood.as_ref().filter(|n| !n.is_empty()) {
        parts.push(format!("for {}", neighborhoods.join(", ")));
    }

    if filters.pet_friendly == Some(true) {
        parts.push("for pet-friendly listings".to_string());
    }

    if let Some(range) = filters.price {
        if let Some(max) = range.max {
            parts.push(format!("under ${}", thousands(max as i64)));
        }
        if let Some(min) = range.min {
            parts.push(format!("over ${}", thousands(min as i64)));
        }
    }

    parts.join(" ")
}

/// The first numeric cell of the first row, with its column key and label
fn first_numeric_value(result: &TabularResult) -> Option<(f64, String, String)> {
    let first_row = result.rows.first()?;
    for column in result.columns.iter().filter(|c| c.kind.is_numeric()) {
        if let Some(value) = first_row.get(&column.key).and_then(|v| v.as_f64()) {
            return Some((value, column.key.clone(), column.label.clone()));
        }
    }
    None
}

fn is_currency_column(key: &str, label: &str) -> bool {
    let haystack = format!("{} {}", key, label).to_lowercase();
    ["price", "rent", "cost"]
        .iter()
        .any(|token| haystack.contains(token))
}

fn format_metric(value: f64, key: &str, label: &str) -> String {
    if is_currency_column(key, label) {
        format!("${}", thousands(value.round() as i64))
    } else if value.fract() == 0.0 {
        thousands(value as i64)
    } else {
        format!("{value:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column_for_tests(key: &str) -> ResultColumn {
        ResultColumn::new(key, ColumnKind::Float)
    }
    use crate::analytics::spec::{NumberRange, SpecFilters};
    use crate::store::rows::{ColumnKind, ResultColumn, ResultRow};
    use serde_json::json;

    fn metric_hint() -> RenderHint {
        RenderHint {
            primary: RenderPrimary::Metric,
            confidence: 0.92,
            reason: None,
        }
    }

    fn one_row_result(key: &str, value: serde_json::Value) -> TabularResult {
        let mut row = ResultRow::new();
        row.insert(key.to_string(), value);
        TabularResult {
            columns: vec![column_for_tests(key)],
            rows: vec![row],
            row_count: 1,
            truncated: false,
        }
    }

    #[test]
    fn price_metric_formats_as_currency() {
        let result = one_row_result("avg_price", json!(3847.6));
        let answer = format_answer(&QuerySpec::default(), &result, &metric_hint(), &[]);
        assert!(answer.contains("$3,848"));
    }

    #[test]
    fn count_metric_formats_as_integer() {
        let mut row = ResultRow::new();
        row.insert("count_listings".to_string(), json!(1250.0));
        let result = TabularResult {
            columns: vec![ResultColumn::new("count_listings", ColumnKind::Integer)],
            rows: vec![row],
            row_count: 1,
            truncated: false,
        };
        let answer = format_answer(&QuerySpec::default(), &result, &metric_hint(), &[]);
        assert!(answer.contains("1,250"));
        assert!(!answer.contains('$'));
    }

    #[test]
    fn zero_rows_explain_no_data() {
        let result = TabularResult::default();
        let answer = format_answer(&QuerySpec::default(), &result, &metric_hint(), &[]);
        assert!(answer.starts_with("No data matched"));
    }

    #[test]
    fn truncation_notice_is_appended() {
        let mut result = one_row_result("avg_price", json!(2000.0));
        result.truncated = true;
        let answer = format_answer(&QuerySpec::default(), &result, &metric_hint(), &[]);
        assert!(answer.contains("50-row safety cap"));
    }

    #[test]
    fn filter_description_covers_geography_and_price() {
        let spec = QuerySpec {
            filters: SpecFilters {
                borough: Some(vec!["brooklyn".into()]),
                pet_friendly: Some(true),
                price: Some(NumberRange {
                    min: None,
                    max: Some(3000.0),
                }),
                ..SpecFilters::default()
            },
            ..QuerySpec::default()
        };
        let description = describe_filters(&spec);
        assert_eq!(description, "in brooklyn for pet-friendly listings under $3,000");
    }

    #[test]
    fn warnings_are_appended_to_the_answer() {
        let result = one_row_result("avg_price", json!(2000.0));
        let answer = format_answer(
            &QuerySpec::default(),
            &result,
            &metric_hint(),
            &["\"avg of listings\" isn't a supported aggregate; computed a listing count instead."
                .to_string()],
        );
        assert!(answer.contains("listing count instead"));
    }
}
