//! Relational store boundary.
//!
//! The query-synthesis stages produce [`SqlStatement`]s — one parameterized
//! statement each — and the [`ListingStore`] trait executes them. The
//! Postgres implementation lives in [`pg`]; tests use in-memory fakes.

pub mod pg;
pub mod rows;
pub mod statement;

use async_trait::async_trait;

use crate::domain::NeighborhoodRecord;
use crate::error::StoreError;
use rows::{PropertyRow, ResultColumn, ResultRow};
use statement::SqlStatement;

/// Read-only access to the listings store
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Execute a search row query, decoding into typed property rows
    async fn fetch_listings(&self, statement: &SqlStatement)
        -> Result<Vec<PropertyRow>, StoreError>;

    /// Execute a count query returning a single bigint
    async fn count_listings(&self, statement: &SqlStatement) -> Result<i64, StoreError>;

    /// Execute an analytics query, decoding each row by the column plan
    async fn fetch_analytics(
        &self,
        statement: &SqlStatement,
        columns: &[ResultColumn],
    ) -> Result<Vec<ResultRow>, StoreError>;

    /// Load the neighborhood hierarchy reference rows
    async fn load_neighborhoods(&self) -> Result<Vec<NeighborhoodRecord>, StoreError>;
}
