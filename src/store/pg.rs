//! Postgres implementation of the store boundary.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::debug;

use super::rows::{
    date_cell, float_cell, int_cell, text_cell, ColumnKind, PropertyRow, ResultColumn, ResultRow,
};
use super::statement::{SqlParam, SqlStatement};
use super::ListingStore;
use crate::domain::NeighborhoodRecord;
use crate::error::StoreError;

/// Store backed by a Postgres connection pool
#[derive(Clone)]
pub struct PgListingStore {
    pool: PgPool,
}

impl PgListingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

macro_rules! bind_params {
    ($query:expr, $statement:expr) => {{
        let mut query = $query;
        for param in $statement.params() {
            query = match param {
                SqlParam::Text(v) => query.bind(v),
                SqlParam::TextArray(v) => query.bind(v),
                SqlParam::Int(v) => query.bind(v),
                SqlParam::Float(v) => query.bind(v),
                SqlParam::Bool(v) => query.bind(v),
                SqlParam::Date(v) => query.bind(v),
            };
        }
        query
    }};
}

/// Decode one analytics row according to the column plan
fn decode_analytics_row(row: &PgRow, columns: &[ResultColumn]) -> Result<ResultRow, StoreError> {
    let mut decoded = ResultRow::new();
    for column in columns {
        let key = column.key.as_str();
        let value = match column.kind {
            ColumnKind::Float => float_cell(row.try_get(key).map_err(|e| decode_err(key, e))?),
            ColumnKind::Integer => int_cell(row.try_get(key).map_err(|e| decode_err(key, e))?),
            ColumnKind::Text => text_cell(row.try_get(key).map_err(|e| decode_err(key, e))?),
            ColumnKind::Date => date_cell(row.try_get(key).map_err(|e| decode_err(key, e))?),
        };
        decoded.insert(column.key.clone(), value);
    }
    Ok(decoded)
}

fn decode_err(column: &str, err: sqlx::Error) -> StoreError {
    StoreError::Decode {
        column: column.to_string(),
        message: err.to_string(),
    }
}

#[async_trait]
impl ListingStore for PgListingStore {
    async fn fetch_listings(
        &self,
        statement: &SqlStatement,
    ) -> Result<Vec<PropertyRow>, StoreError> {
        debug!(sql = statement.sql(), "executing search query");
        let query = sqlx::query_as::<_, PropertyRow>(statement.sql());
        let rows = bind_params!(query, statement).fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn count_listings(&self, statement: &SqlStatement) -> Result<i64, StoreError> {
        debug!(sql = statement.sql(), "executing count query");
        let query = sqlx::query_scalar::<_, i64>(statement.sql());
        let count = bind_params!(query, statement).fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn fetch_analytics(
        &self,
        statement: &SqlStatement,
        columns: &[ResultColumn],
    ) -> Result<Vec<ResultRow>, StoreError> {
        debug!(sql = statement.sql(), "executing analytics query");
        let query = sqlx::query(statement.sql());
        let rows = bind_params!(query, statement).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| decode_analytics_row(row, columns))
            .collect()
    }

    async fn load_neighborhoods(&self) -> Result<Vec<NeighborhoodRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT name, level, hierarchy_path
            FROM "real_estate"."neighborhoods_enhanced_view"
            ORDER BY level, name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(NeighborhoodRecord {
                    name: row.try_get("name").map_err(|e| decode_err("name", e))?,
                    level: row.try_get("level").map_err(|e| decode_err("level", e))?,
                    hierarchy_path: row
                        .try_get("hierarchy_path")
                        .map_err(|e| decode_err("hierarchy_path", e))?,
                })
            })
            .collect()
    }
}
