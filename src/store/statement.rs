//! Parameterized SQL statements.
//!
//! Query builders append SQL text and bind values through this type; the
//! store executes the finished statement. Placeholders are `$N`, numbered
//! by bind order.

use chrono::NaiveDate;

/// One bind value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    TextArray(Vec<String>),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
}

/// A SQL statement plus its bind values
#[derive(Debug, Clone, Default)]
pub struct SqlStatement {
    sql: String,
    params: Vec<SqlParam>,
}

impl SqlStatement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw SQL text
    pub fn push(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    /// Register a bind value and return its `$N` placeholder
    pub fn bind(&mut self, param: SqlParam) -> String {
        self.params.push(param);
        format!("${}", self.params.len())
    }

    /// Register a bind value and append its placeholder in one step
    pub fn push_bind(&mut self, param: SqlParam) {
        let placeholder = self.bind(param);
        self.sql.push_str(&placeholder);
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[SqlParam] {
        &self.params
    }
}
