//! Analytics query synthesis.
//!
//! Compiles a validated [`QuerySpec`] into one aggregate SELECT with
//! grouping, ordering, and a sentinel LIMIT of n+1 so result truncation is
//! detectable without a second count query. A heatmap preference bypasses
//! grouping entirely and selects raw coordinate/weight rows.

use crate::store::rows::{ColumnKind, ResultColumn};
use crate::store::statement::{SqlParam, SqlStatement};

use super::spec::{
    clamp_limit, Dataset, Dimension, Measure, MeasureField, MeasureOp, QuerySpec, SortDirection,
    VizPreference, MAX_ANALYTICS_ROWS,
};

const CURRENT_FROM: &str = "\"real_estate\".\"latest_properties_materialized\" lp";
const TREND_FROM: &str = "\"real_estate\".\"fct_properties\" fp \
                          INNER JOIN \"real_estate\".\"dim_property_details\" d ON d.id = fp.id";

/// Filterable columns, resolved per dataset
#[derive(Debug, Clone, Copy)]
enum Col {
    Borough,
    Neighborhood,
    Zipcode,
    PropertyType,
    Bedrooms,
    Bathrooms,
    NoFee,
    Amenities,
    Tags,
    Date,
    Latitude,
    Longitude,
    Price,
}

fn column(dataset: Dataset, col: Col) -> &'static str {
    match dataset {
        Dataset::Trend => match col {
            Col::Borough => "d.borough",
            Col::Neighborhood => "d.neighborhood",
            Col::Zipcode => "d.zipcode",
            Col::PropertyType => "d.property_type",
            Col::Bedrooms => "d.bedrooms",
            Col::Bathrooms => "d.bathrooms",
            Col::NoFee => "d.no_fee",
            Col::Amenities => "d.amenities",
            Col::Tags => "d.tag_list",
            Col::Date => "fp.date",
            Col::Latitude => "d.latitude",
            Col::Longitude => "d.longitude",
            Col::Price => "fp.price",
        },
        Dataset::Current => match col {
            Col::Borough => "lp.borough",
            Col::Neighborhood => "lp.neighborhood",
            Col::Zipcode => "lp.zipcode",
            Col::PropertyType => "lp.property_type",
            Col::Bedrooms => "lp.bedrooms",
            Col::Bathrooms => "lp.bathrooms",
            Col::NoFee => "lp.no_fee",
            Col::Amenities => "lp.amenities",
            Col::Tags => "lp.tag_list",
            Col::Date => "lp.listed_at",
            Col::Latitude => "lp.latitude",
            Col::Longitude => "lp.longitude",
            Col::Price => "lp.price",
        },
    }
}

fn from_clause(dataset: Dataset) -> &'static str {
    match dataset {
        Dataset::Trend => TREND_FROM,
        Dataset::Current => CURRENT_FROM,
    }
}

/// A compiled analytics query plus its decoding plan
#[derive(Debug, Clone)]
pub struct BuiltAnalyticsQuery {
    pub statement: SqlStatement,
    pub columns: Vec<ResultColumn>,
    pub effective_limit: usize,
    pub is_heatmap: bool,
}

/// Compile a validated spec.
pub fn build_analytics_query(spec: &QuerySpec) -> BuiltAnalyticsQuery {
    let effective_limit = clamp_limit(spec.limit);
    let sentinel_limit = (effective_limit + 1).min(MAX_ANALYTICS_ROWS + 1) as i64;

    if spec.viz_preference == VizPreference::Heatmap {
        return build_heatmap_query(spec, effective_limit as usize, sentinel_limit);
    }

    let mut stmt = SqlStatement::new();
    let mut columns = Vec::new();
    let mut group_exprs: Vec<String> = Vec::new();
    let mut sortable: Vec<String> = Vec::new();
    let mut select_parts: Vec<String> = Vec::new();

    for dimension in &spec.dimensions {
        let (select_expr, group_expr, kind) = dimension_expression(spec.dataset, *dimension);
        select_parts.push(select_expr);
        group_exprs.push(group_expr);
        columns.push(ResultColumn::new(dimension.key(), kind));
        sortable.push(dimension.key().to_string());
    }

    let mut measure_aliases = Vec::new();
    for (index, measure) in spec.measures.iter().enumerate() {
        let (select_expr, alias, kind) = measure_expression(spec.dataset, measure, index);
        select_parts.push(select_expr);
        columns.push(ResultColumn::new(alias.as_str(), kind));
        sortable.push(alias.clone());
        measure_aliases.push(alias);
    }

    // Map bubbles need coordinates to place each neighborhood group
    if spec.viz_preference == VizPreference::MapBubble
        && spec.dimensions.contains(&Dimension::Neighborhood)
    {
        let lat = column(spec.dataset, Col::Latitude);
        let lng = column(spec.dataset, Col::Longitude);
        select_parts.push(format!("AVG({lat})::float8 AS latitude"));
        select_parts.push(format!("AVG({lng})::float8 AS longitude"));
        columns.push(ResultColumn::new("latitude", ColumnKind::Float));
        columns.push(ResultColumn::new("longitude", ColumnKind::Float));
    }

    stmt.push("SELECT ");
    stmt.push(&select_parts.join(", "));
    stmt.push(" FROM ");
    stmt.push(from_clause(spec.dataset));
    push_where(&mut stmt, spec);

    if !group_exprs.is_empty() {
        stmt.push(" GROUP BY ");
        stmt.push(&group_exprs.join(", "));
    }

    push_order_by(&mut stmt, spec, &measure_aliases, &columns, &sortable);

    stmt.push(" LIMIT ");
    stmt.push_bind(SqlParam::Int(sentinel_limit));

    BuiltAnalyticsQuery {
        statement: stmt,
        columns,
        effective_limit: effective_limit as usize,
        is_heatmap: false,
    }
}

fn build_heatmap_query(
    spec: &QuerySpec,
    effective_limit: usize,
    sentinel_limit: i64,
) -> BuiltAnalyticsQuery {
    let lat = column(spec.dataset, Col::Latitude);
    let lng = column(spec.dataset, Col::Longitude);
    let price = column(spec.dataset, Col::Price);

    let mut stmt = SqlStatement::new();
    stmt.push(&format!(
        "SELECT {lat}::float8 AS latitude, {lng}::float8 AS longitude, \
         {price}::float8 AS weight FROM "
    ));
    stmt.push(from_clause(spec.dataset));
    push_where(&mut stmt, spec);
    stmt.push(&format!(" AND {lat} IS NOT NULL AND {lng} IS NOT NULL"));
    stmt.push(&format!(" ORDER BY {price} DESC LIMIT "));
    stmt.push_bind(SqlParam::Int(sentinel_limit));

    BuiltAnalyticsQuery {
        statement: stmt,
        columns: vec![
            ResultColumn::new("latitude", ColumnKind::Float),
            ResultColumn::new("longitude", ColumnKind::Float),
            ResultColumn::new("weight", ColumnKind::Float),
        ],
        effective_limit,
        is_heatmap: true,
    }
}

fn dimension_expression(dataset: Dataset, dimension: Dimension) -> (String, String, ColumnKind) {
    if dimension == Dimension::Month {
        let date = column(dataset, Col::Date);
        let expr = format!("DATE_TRUNC('month', {date})::date");
        return (format!("{expr} AS month"), expr, ColumnKind::Date);
    }

    let col = match dimension {
        Dimension::Borough => column(dataset, Col::Borough),
        Dimension::Neighborhood => column(dataset, Col::Neighborhood),
        Dimension::Zipcode => column(dataset, Col::Zipcode),
        Dimension::PropertyType => column(dataset, Col::PropertyType),
        Dimension::Month => unreachable!(),
    };
    (
        format!("{col} AS {}", dimension.key()),
        col.to_string(),
        ColumnKind::Text,
    )
}

fn measure_expression(
    dataset: Dataset,
    measure: &Measure,
    index: usize,
) -> (String, String, ColumnKind) {
    let preferred = measure
        .alias
        .clone()
        .unwrap_or_else(|| format!("{}_{}", measure.op, measure.field));
    let alias = measure_alias(index, &preferred);

    // Anything that isn't a price aggregate is a row count; validation has
    // already surfaced the substitution warning where one applies.
    if measure.op == MeasureOp::Count || measure.field != MeasureField::Price {
        return (
            format!("COUNT(*) AS {alias}"),
            alias,
            ColumnKind::Integer,
        );
    }

    let price = column(dataset, Col::Price);
    let aggregate = match measure.op {
        MeasureOp::Avg => format!("AVG({price})"),
        MeasureOp::Median => {
            format!("PERCENTILE_CONT(0.5) WITHIN GROUP (ORDER BY {price})")
        }
        MeasureOp::Min => format!("MIN({price})"),
        MeasureOp::Max => format!("MAX({price})"),
        MeasureOp::Count => unreachable!(),
    };

    (
        format!("{aggregate}::float8 AS {alias}"),
        alias,
        ColumnKind::Float,
    )
}

/// Sanitize a preferred alias into a safe SQL identifier
fn measure_alias(index: usize, preferred: &str) -> String {
    let sanitized: String = preferred
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let trimmed: String = sanitized.trim_matches('_').chars().take(40).collect();

    if trimmed.is_empty() {
        format!("metric_{}", index + 1)
    } else {
        trimmed
    }
}

fn push_where(stmt: &mut SqlStatement, spec: &QuerySpec) {
    stmt.push(" WHERE TRUE");
    let filters = &spec.filters;
    let dataset = spec.dataset;

    push_in_list(stmt, column(dataset, Col::Borough), filters.borough.as_deref());
    push_in_list(
        stmt,
        column(dataset, Col::Neighborhood),
        filters.neighborhood.as_deref(),
    );
    push_in_list(stmt, column(dataset, Col::Zipcode), filters.zipcode.as_deref());
    push_in_list(
        stmt,
        column(dataset, Col::PropertyType),
        filters.property_type.as_deref(),
    );

    if let Some(no_fee) = filters.no_fee {
        stmt.push(&format!(" AND {} = ", column(dataset, Col::NoFee)));
        stmt.push_bind(SqlParam::Bool(no_fee));
    }

    let price = column(dataset, Col::Price);
    if let Some(range) = filters.price {
        push_bounds(stmt, price, range.min, range.max);
    }
    if let Some(range) = filters.bedrooms {
        push_bounds(stmt, column(dataset, Col::Bedrooms), range.min, range.max);
    }
    if let Some(range) = filters.bathrooms {
        push_bounds(stmt, column(dataset, Col::Bathrooms), range.min, range.max);
    }

    if filters.pet_friendly == Some(true) {
        stmt.push(&format!(" AND {} && ", column(dataset, Col::Amenities)));
        stmt.push_bind(SqlParam::TextArray(vec![
            "pets".to_string(),
            "cats".to_string(),
            "dogs".to_string(),
        ]));
    }

    if let Some(tags) = filters.tags.as_ref().filter(|t| !t.is_empty()) {
        stmt.push(&format!(" AND {} && ", column(dataset, Col::Tags)));
        stmt.push_bind(SqlParam::TextArray(tags.clone()));
    }

    if let Some(date) = filters.date {
        let date_col = column(dataset, Col::Date);
        if let Some(start) = date.start {
            stmt.push(&format!(" AND {date_col} >= "));
            stmt.push_bind(SqlParam::Date(start));
        }
        if let Some(end) = date.end {
            stmt.push(&format!(" AND {date_col} <= "));
            stmt.push_bind(SqlParam::Date(end));
        }
        if let Some(last_months) = date.last_months {
            stmt.push(&format!(
                " AND {date_col} >= date_trunc('month', now()) - ("
            ));
            stmt.push_bind(SqlParam::Int(i64::from(last_months)));
            stmt.push(" * interval '1 month')");
        }
    }
}

fn push_bounds(stmt: &mut SqlStatement, col: &str, min: Option<f64>, max: Option<f64>) {
    if let Some(min) = min {
        stmt.push(&format!(" AND {col} >= "));
        stmt.push_bind(SqlParam::Float(min));
    }
    if let Some(max) = max {
        stmt.push(&format!(" AND {col} <= "));
        stmt.push_bind(SqlParam::Float(max));
    }
}

fn push_in_list(stmt: &mut SqlStatement, col: &str, values: Option<&[String]>) {
    let Some(values) = values.filter(|v| !v.is_empty()) else {
        return;
    };
    stmt.push(&format!(" AND {col} IN ("));
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            stmt.push(", ");
        }
        stmt.push_bind(SqlParam::Text(value.clone()));
    }
    stmt.push(")");
}

fn push_order_by(
    stmt: &mut SqlStatement,
    spec: &QuerySpec,
    measure_aliases: &[String],
    columns: &[ResultColumn],
    sortable: &[String],
) {
    let has_month = spec.has_month_dimension();

    let default_field = if has_month {
        Some("month".to_string())
    } else {
        measure_aliases
            .first()
            .cloned()
            .or_else(|| columns.first().map(|c| c.key.clone()))
    };

    let requested = spec
        .sort
        .as_ref()
        .filter(|sort| sortable.contains(&sort.field));

    let (field, direction) = match requested {
        Some(sort) => (Some(sort.field.clone()), sort.direction),
        None => (
            default_field,
            if has_month {
                SortDirection::Asc
            } else {
                SortDirection::Desc
            },
        ),
    };

    if let Some(field) = field {
        let dir = match direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        stmt.push(&format!(" ORDER BY {field} {dir}"));
    }
}
