//! Search query synthesis.
//!
//! Compiles a validated [`FilterSet`] into a parameterized statement
//! against the listings view. Tag filters additionally drive a computed
//! `tag_match_count` used as the primary sort key; a count-only variant of
//! the same compilation reports total matches.

use crate::domain::NeighborhoodCatalog;
use crate::store::statement::{SqlParam, SqlStatement};

use super::filters::{FilterSet, RangeFilter, StringOrList};

const LISTINGS_VIEW: &str = "\"real_estate\".\"latest_properties_materialized\" lp";

/// Caller-requested result ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Newest,
    LeastExpensive,
    MostExpensive,
}

impl SortOrder {
    /// Parse the UI sort token; unknown tokens mean relevance ordering
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "newest" => Some(SortOrder::Newest),
            "least_expensive" => Some(SortOrder::LeastExpensive),
            "most_expensive" => Some(SortOrder::MostExpensive),
            _ => None,
        }
    }

    fn order_expr(self) -> &'static str {
        match self {
            SortOrder::Newest => "lp.listed_at DESC",
            SortOrder::LeastExpensive => "lp.price ASC",
            SortOrder::MostExpensive => "lp.price DESC",
        }
    }
}

/// Build the row query: SELECT with tag ranking, LIMIT/OFFSET.
pub fn build_search_query(
    filters: &FilterSet,
    catalog: &NeighborhoodCatalog,
    sort: Option<SortOrder>,
    limit: i64,
    offset: i64,
) -> SqlStatement {
    let mut stmt = SqlStatement::new();

    stmt.push(
        "SELECT lp.id, lp.fct_id, lp.address, lp.neighborhood, lp.borough, lp.zipcode, \
         lp.property_type, lp.price::float8 AS price, lp.bedrooms, \
         lp.bathrooms::float8 AS bathrooms, lp.sqft, lp.no_fee, \
         lp.brokers_fee::float8 AS brokers_fee, lp.latitude::float8 AS latitude, \
         lp.longitude::float8 AS longitude, lp.listed_at, lp.available_from, \
         lp.days_on_market, lp.tag_list, lp.amenities, lp.url, ",
    );

    let has_tags = filters.tag_list.as_ref().is_some_and(|t| !t.is_empty());
    if let Some(tags) = filters.tag_list.as_ref().filter(|t| !t.is_empty()) {
        let placeholder = stmt.bind(SqlParam::TextArray(tags.clone()));
        stmt.push(&format!(
            "(SELECT COUNT(*) FROM UNNEST(lp.tag_list) t WHERE t = ANY({placeholder}))::int8 AS tag_match_count"
        ));
    } else {
        stmt.push("0::int8 AS tag_match_count");
    }

    stmt.push(" FROM ");
    stmt.push(LISTINGS_VIEW);
    push_where(&mut stmt, filters, catalog);

    // Tag relevance ranks first; any caller sort becomes the secondary key
    let mut order_parts: Vec<&str> = Vec::new();
    if has_tags {
        order_parts.push("tag_match_count DESC");
    }
    if let Some(sort) = sort {
        order_parts.push(sort.order_expr());
    }
    if !order_parts.is_empty() {
        stmt.push(" ORDER BY ");
        stmt.push(&order_parts.join(", "));
    }

    stmt.push(" LIMIT ");
    stmt.push_bind(SqlParam::Int(limit));
    stmt.push(" OFFSET ");
    stmt.push_bind(SqlParam::Int(offset));

    stmt
}

/// Build the count variant: identical filter compilation, no ranking, no
/// limit.
pub fn build_search_count_query(
    filters: &FilterSet,
    catalog: &NeighborhoodCatalog,
) -> SqlStatement {
    let mut stmt = SqlStatement::new();
    stmt.push("SELECT COUNT(*) FROM ");
    stmt.push(LISTINGS_VIEW);
    push_where(&mut stmt, filters, catalog);
    stmt
}

/// Append the shared WHERE clause for both query variants
fn push_where(stmt: &mut SqlStatement, filters: &FilterSet, catalog: &NeighborhoodCatalog) {
    stmt.push(" WHERE lp.id IS NOT NULL");

    let ranges: [(&str, Option<RangeFilter>); 7] = [
        ("lp.price", filters.price),
        ("lp.bedrooms", filters.bedrooms),
        ("lp.bathrooms", filters.bathrooms),
        ("lp.sqft", filters.sqft),
        ("lp.built_in", filters.built_in),
        ("lp.brokers_fee", filters.brokers_fee),
        ("lp.days_on_market", filters.days_on_market),
    ];
    for (column, range) in ranges {
        if let Some(range) = range {
            push_range(stmt, column, range);
        }
    }

    push_values(stmt, "lp.property_type", filters.property_type.as_ref());
    push_values(stmt, "lp.borough", filters.borough.as_ref());
    push_values(stmt, "lp.zipcode", filters.zipcode.as_ref());

    if let Some(neighborhoods) = filters.neighborhood.as_ref().filter(|n| !n.is_empty()) {
        let mut expanded: Vec<String> = Vec::new();
        for name in neighborhoods {
            for child in catalog.expand_with_descendants(name) {
                if !expanded.contains(&child) {
                    expanded.push(child);
                }
            }
        }
        push_in_list(stmt, "lp.neighborhood", &expanded);
    }

    if let Some(tags) = filters.tag_list.as_ref().filter(|t| !t.is_empty()) {
        // Zero-overlap rows are excluded outright when tags are requested
        stmt.push(" AND lp.tag_list && ");
        stmt.push_bind(SqlParam::TextArray(tags.clone()));
    }

    if let Some(amenities) = filters.amenities.as_ref().filter(|a| !a.is_empty()) {
        stmt.push(" AND lp.amenities && ");
        stmt.push_bind(SqlParam::TextArray(amenities.clone()));
    }

    if let Some(no_fee) = filters.no_fee {
        stmt.push(" AND lp.no_fee = ");
        stmt.push_bind(SqlParam::Bool(no_fee));
    }

    if let Some(address) = filters.address.as_ref().filter(|a| !a.is_empty()) {
        stmt.push(" AND lp.address ILIKE ");
        stmt.push_bind(SqlParam::Text(format!("%{address}%")));
    }
}

/// Range compilation: equality when both bounds agree (the studio case
/// included), otherwise an independent clause per positive bound.
fn push_range(stmt: &mut SqlStatement, column: &str, range: RangeFilter) {
    if let Some(exact) = range.as_exact() {
        stmt.push(&format!(" AND {column} = "));
        stmt.push_bind(number_param(exact));
        return;
    }

    if let Some(min) = range.min.filter(|v| *v > 0.0) {
        stmt.push(&format!(" AND {column} >= "));
        stmt.push_bind(number_param(min));
    }
    if let Some(max) = range.max.filter(|v| *v > 0.0) {
        stmt.push(&format!(" AND {column} <= "));
        stmt.push_bind(number_param(max));
    }
}

/// Whole numbers bind as integers so integer columns compare exactly
fn number_param(value: f64) -> SqlParam {
    if value.fract() == 0.0 {
        SqlParam::Int(value as i64)
    } else {
        SqlParam::Float(value)
    }
}

/// Scalar-or-list compilation: equality for one value, IN for several
fn push_values(stmt: &mut SqlStatement, column: &str, value: Option<&StringOrList>) {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return;
    };

    match value {
        StringOrList::One(single) => {
            stmt.push(&format!(" AND {column} = "));
            stmt.push_bind(SqlParam::Text(single.clone()));
        }
        StringOrList::Many(values) => push_in_list(stmt, column, values),
    }
}

fn push_in_list(stmt: &mut SqlStatement, column: &str, values: &[String]) {
    if values.is_empty() {
        return;
    }
    stmt.push(&format!(" AND {column} IN ("));
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            stmt.push(", ");
        }
        stmt.push_bind(SqlParam::Text(value.clone()));
    }
    stmt.push(")");
}
