//! Render-hint selection.
//!
//! Chooses a visualization from the *result shape*, honoring an explicit
//! preference only when the shape supports it, with table as the stated
//! fallback.

use serde::Serialize;

use crate::store::rows::ResultColumn;

use super::result::TabularResult;
use super::spec::{QuerySpec, VizPreference};

/// Chosen visualization category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderPrimary {
    Metric,
    Table,
    Bar,
    Line,
    Heatmap,
    MapBubble,
}

/// The render hint handed to presentation layers
#[derive(Debug, Clone, Serialize)]
pub struct RenderHint {
    pub primary: RenderPrimary,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RenderHint {
    fn new(primary: RenderPrimary, confidence: f64) -> Self {
        Self {
            primary,
            confidence,
            reason: None,
        }
    }

    fn with_reason(primary: RenderPrimary, confidence: f64, reason: impl Into<String>) -> Self {
        Self {
            primary,
            confidence,
            reason: Some(reason.into()),
        }
    }
}

fn primary_name(primary: RenderPrimary) -> &'static str {
    match primary {
        RenderPrimary::Metric => "metric",
        RenderPrimary::Table => "table",
        RenderPrimary::Bar => "bar",
        RenderPrimary::Line => "line",
        RenderPrimary::Heatmap => "heatmap",
        RenderPrimary::MapBubble => "map_bubble",
    }
}

fn has_column(columns: &[ResultColumn], key: &str) -> bool {
    columns.iter().any(|column| column.key == key)
}

fn numeric_count(columns: &[ResultColumn]) -> usize {
    columns.iter().filter(|c| c.kind.is_numeric()).count()
}

fn explicit_preference(viz: VizPreference) -> Option<RenderPrimary> {
    match viz {
        VizPreference::Auto => None,
        VizPreference::Table => Some(RenderPrimary::Table),
        VizPreference::Bar => Some(RenderPrimary::Bar),
        VizPreference::Line => Some(RenderPrimary::Line),
        VizPreference::Metric => Some(RenderPrimary::Metric),
        VizPreference::Heatmap => Some(RenderPrimary::Heatmap),
        VizPreference::MapBubble => Some(RenderPrimary::MapBubble),
    }
}

/// Shape-compatibility rules for an explicit preference
fn is_compatible(preferred: RenderPrimary, columns: &[ResultColumn]) -> bool {
    let numeric = numeric_count(columns);
    match preferred {
        RenderPrimary::Metric => numeric >= 1,
        RenderPrimary::Line => has_column(columns, "month") && numeric >= 1,
        RenderPrimary::Bar => columns.len() > numeric && numeric >= 1,
        RenderPrimary::Heatmap | RenderPrimary::MapBubble => {
            has_column(columns, "latitude") && has_column(columns, "longitude")
        }
        RenderPrimary::Table => true,
    }
}

/// Select the render hint for a result.
pub fn select_render_hint(result: &TabularResult, spec: &QuerySpec) -> RenderHint {
    let columns = &result.columns;
    let numeric = numeric_count(columns);
    let non_numeric = columns.len() - numeric;

    if let Some(preferred) = explicit_preference(spec.viz_preference) {
        if is_compatible(preferred, columns) {
            return RenderHint::new(preferred, 0.95);
        }
        return RenderHint::with_reason(
            RenderPrimary::Table,
            0.7,
            format!(
                "Requested visualization \"{}\" is incompatible with current result shape.",
                primary_name(preferred)
            ),
        );
    }

    if result.rows.is_empty() {
        return RenderHint::with_reason(
            RenderPrimary::Table,
            0.9,
            "No rows returned for the selected filters.",
        );
    }

    if has_column(columns, "latitude") && has_column(columns, "longitude") {
        if has_column(columns, "neighborhood") {
            return RenderHint::new(RenderPrimary::MapBubble, 0.88);
        }
        return RenderHint::new(RenderPrimary::Heatmap, 0.88);
    }

    if columns.len() == 1 && numeric == 1 {
        return RenderHint::new(RenderPrimary::Metric, 0.92);
    }

    if has_column(columns, "month") && numeric >= 1 {
        return RenderHint::new(RenderPrimary::Line, 0.9);
    }

    if non_numeric >= 1 && numeric >= 1 {
        return RenderHint::new(RenderPrimary::Bar, 0.85);
    }

    RenderHint::new(RenderPrimary::Table, 0.75)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::rows::{ColumnKind, ResultRow};

    fn result(columns: Vec<ResultColumn>, row_count: usize) -> TabularResult {
        TabularResult {
            columns,
            rows: (0..row_count).map(|_| ResultRow::new()).collect(),
            row_count,
            truncated: false,
        }
    }

    fn spec_with(viz: VizPreference) -> QuerySpec {
        QuerySpec {
            viz_preference: viz,
            ..QuerySpec::default()
        }
    }

    #[test]
    fn single_numeric_column_is_a_metric() {
        let r = result(vec![ResultColumn::new("avg_price", ColumnKind::Float)], 1);
        let hint = select_render_hint(&r, &spec_with(VizPreference::Auto));
        assert_eq!(hint.primary, RenderPrimary::Metric);
    }

    #[test]
    fn month_plus_numeric_is_a_line() {
        let r = result(
            vec![
                ResultColumn::new("month", ColumnKind::Date),
                ResultColumn::new("avg_price", ColumnKind::Float),
            ],
            4,
        );
        let hint = select_render_hint(&r, &spec_with(VizPreference::Auto));
        assert_eq!(hint.primary, RenderPrimary::Line);
    }

    #[test]
    fn category_plus_numeric_is_a_bar() {
        let r = result(
            vec![
                ResultColumn::new("borough", ColumnKind::Text),
                ResultColumn::new("avg_price", ColumnKind::Float),
            ],
            5,
        );
        let hint = select_render_hint(&r, &spec_with(VizPreference::Auto));
        assert_eq!(hint.primary, RenderPrimary::Bar);
    }

    #[test]
    fn coordinates_with_neighborhood_are_a_map_bubble() {
        let r = result(
            vec![
                ResultColumn::new("neighborhood", ColumnKind::Text),
                ResultColumn::new("avg_price", ColumnKind::Float),
                ResultColumn::new("latitude", ColumnKind::Float),
                ResultColumn::new("longitude", ColumnKind::Float),
            ],
            3,
        );
        let hint = select_render_hint(&r, &spec_with(VizPreference::Auto));
        assert_eq!(hint.primary, RenderPrimary::MapBubble);
    }

    #[test]
    fn incompatible_explicit_preference_falls_back_to_table_with_reason() {
        let r = result(
            vec![
                ResultColumn::new("borough", ColumnKind::Text),
                ResultColumn::new("avg_price", ColumnKind::Float),
            ],
            5,
        );
        let hint = select_render_hint(&r, &spec_with(VizPreference::Line));
        assert_eq!(hint.primary, RenderPrimary::Table);
        assert!(hint.reason.is_some());
    }

    #[test]
    fn compatible_explicit_preference_is_honored() {
        let r = result(
            vec![
                ResultColumn::new("borough", ColumnKind::Text),
                ResultColumn::new("avg_price", ColumnKind::Float),
            ],
            5,
        );
        let hint = select_render_hint(&r, &spec_with(VizPreference::Bar));
        assert_eq!(hint.primary, RenderPrimary::Bar);
        assert!(hint.confidence > 0.9);
    }

    #[test]
    fn empty_result_prefers_table() {
        let r = result(vec![ResultColumn::new("avg_price", ColumnKind::Float)], 0);
        let hint = select_render_hint(&r, &spec_with(VizPreference::Auto));
        assert_eq!(hint.primary, RenderPrimary::Table);
    }
}
