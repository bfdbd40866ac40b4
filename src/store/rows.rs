//! Row models returned by the store.
//!
//! Search results decode into the typed [`PropertyRow`]; analytics results
//! are shaped by the query itself, so they decode dynamically through a
//! column plan into JSON objects ready for the API layer.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Number, Value};

/// One listing row from the materialized listings view.
///
/// Numeric columns are cast to float8/int in the SELECT so no decimal
/// coercion happens client-side.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PropertyRow {
    pub id: String,
    pub fct_id: Option<String>,
    pub address: Option<String>,
    pub neighborhood: Option<String>,
    pub borough: Option<String>,
    pub zipcode: Option<String>,
    pub property_type: Option<String>,
    pub price: Option<f64>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<f64>,
    pub sqft: Option<i32>,
    pub no_fee: Option<bool>,
    pub brokers_fee: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub listed_at: Option<NaiveDate>,
    pub available_from: Option<NaiveDate>,
    pub days_on_market: Option<i32>,
    pub tag_list: Option<Vec<String>>,
    pub amenities: Option<Vec<String>>,
    pub url: Option<String>,
    /// How many requested tags this row matched; 0 when no tags were requested
    pub tag_match_count: i64,
}

/// How a result column decodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Text,
    Integer,
    Float,
    Date,
}

impl ColumnKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Float)
    }
}

/// One column of an analytics result
#[derive(Debug, Clone, Serialize)]
pub struct ResultColumn {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: ColumnKind,
}

impl ResultColumn {
    pub fn new(key: impl Into<String>, kind: ColumnKind) -> Self {
        let key = key.into();
        let label = to_label(&key);
        Self { key, label, kind }
    }
}

/// One analytics row, keyed by column key
pub type ResultRow = Map<String, Value>;

/// "avg_price" -> "Avg Price"
pub fn to_label(key: &str) -> String {
    key.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build a JSON cell from a decoded value
pub fn float_cell(value: Option<f64>) -> Value {
    match value.and_then(Number::from_f64) {
        Some(n) => Value::Number(n),
        None => Value::Null,
    }
}

pub fn int_cell(value: Option<i64>) -> Value {
    value.map(Value::from).unwrap_or(Value::Null)
}

pub fn text_cell(value: Option<String>) -> Value {
    value.map(Value::String).unwrap_or(Value::Null)
}

pub fn date_cell(value: Option<NaiveDate>) -> Value {
    value
        .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_title_case_snake_keys() {
        assert_eq!(to_label("avg_price"), "Avg Price");
        assert_eq!(to_label("month"), "Month");
        assert_eq!(to_label("property_type"), "Property Type");
    }

    #[test]
    fn date_cells_render_iso_dates() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(date_cell(Some(date)), Value::String("2026-03-01".into()));
        assert_eq!(date_cell(None), Value::Null);
    }
}
