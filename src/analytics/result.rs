//! Tabular analytics results.

use serde::Serialize;

use crate::store::rows::{ResultColumn, ResultRow};

/// The shaped result of one analytics query
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabularResult {
    pub columns: Vec<ResultColumn>,
    pub rows: Vec<ResultRow>,
    pub row_count: usize,
    /// True when the sentinel row showed more rows exist than the cap
    pub truncated: bool,
}

impl TabularResult {
    /// Shape raw store rows: the query fetches one sentinel row past the
    /// cap so truncation is detectable without a second count query.
    pub fn from_rows(
        columns: Vec<ResultColumn>,
        mut rows: Vec<ResultRow>,
        effective_limit: usize,
    ) -> Self {
        let truncated = rows.len() > effective_limit;
        rows.truncate(effective_limit);
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
            truncated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::rows::ColumnKind;

    #[test]
    fn sentinel_row_marks_truncation() {
        let columns = vec![ResultColumn::new("metric_1", ColumnKind::Float)];
        let rows = vec![ResultRow::new(), ResultRow::new(), ResultRow::new()];
        let result = TabularResult::from_rows(columns, rows, 2);
        assert!(result.truncated);
        assert_eq!(result.row_count, 2);
    }

    #[test]
    fn under_cap_is_not_truncated() {
        let columns = vec![ResultColumn::new("metric_1", ColumnKind::Float)];
        let result = TabularResult::from_rows(columns, vec![ResultRow::new()], 2);
        assert!(!result.truncated);
        assert_eq!(result.row_count, 1);
    }
}
