//! Analytics Query Specification model, merge, and normalization.
//!
//! Unlike search filters, a spec is replaced wholesale each turn (its
//! fields have cross-field dependencies); only the numeric/date filter
//! sub-objects merge member-wise over the previous spec. Derived fields —
//! dataset, default limit, the trend month dimension — are recomputed
//! after every merge, never inherited.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Hard row cap for any analytics query
pub const MAX_ANALYTICS_ROWS: u32 = 50;
/// Default row cap when the spec doesn't ask for one
pub const DEFAULT_ANALYTICS_ROWS: u32 = 20;
/// Default trailing window for trend queries without explicit date bounds
pub const DEFAULT_TREND_MONTHS: u32 = 12;

/// Which dataset a query reads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dataset {
    #[default]
    Current,
    Trend,
}

/// Aggregate operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasureOp {
    Avg,
    Median,
    Min,
    Max,
    Count,
}

impl std::fmt::Display for MeasureOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MeasureOp::Avg => "avg",
            MeasureOp::Median => "median",
            MeasureOp::Min => "min",
            MeasureOp::Max => "max",
            MeasureOp::Count => "count",
        };
        f.write_str(name)
    }
}

/// What a measure aggregates over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasureField {
    Price,
    Listings,
}

impl std::fmt::Display for MeasureField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            MeasureField::Price => "price",
            MeasureField::Listings => "listings",
        })
    }
}

/// One requested aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    pub op: MeasureOp,
    pub field: MeasureField,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// Grouping dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Borough,
    Neighborhood,
    Zipcode,
    PropertyType,
    Month,
}

impl Dimension {
    pub fn key(self) -> &'static str {
        match self {
            Dimension::Borough => "borough",
            Dimension::Neighborhood => "neighborhood",
            Dimension::Zipcode => "zipcode",
            Dimension::PropertyType => "property_type",
            Dimension::Month => "month",
        }
    }
}

/// Time bucketing granularity (month is the only supported bucket)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeBucket {
    Month,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

/// Requested visualization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VizPreference {
    #[default]
    Auto,
    Table,
    Bar,
    Line,
    Metric,
    Heatmap,
    MapBubble,
}

/// A numeric bound pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NumberRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// Date bounds; `last_months` is a trailing window from now
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_months: Option<u32>,
}

impl DateRange {
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none() && self.last_months.is_none()
    }
}

/// Spec-level filters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpecFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub borough: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zipcode: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_type: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<NumberRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<NumberRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<NumberRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_fee: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pet_friendly: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateRange>,
}

/// A complete analytics query description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuerySpec {
    pub dataset: Dataset,
    pub measures: Vec<Measure>,
    pub dimensions: Vec<Dimension>,
    pub filters: SpecFilters,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_bucket: Option<TimeBucket>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    pub viz_preference: VizPreference,
}

impl QuerySpec {
    pub fn has_month_dimension(&self) -> bool {
        self.dimensions.contains(&Dimension::Month)
    }
}

/// Clamp a requested limit into [1, MAX_ANALYTICS_ROWS], defaulting when
/// absent.
pub fn clamp_limit(requested: Option<u32>) -> u32 {
    requested
        .unwrap_or(DEFAULT_ANALYTICS_ROWS)
        .clamp(1, MAX_ANALYTICS_ROWS)
}

/// Dataset inference is a pure function of the merged spec: a declared
/// trend dataset or any monthly bucketing means trend.
pub fn infer_dataset(spec: &QuerySpec) -> Dataset {
    if spec.dataset == Dataset::Trend
        || spec.has_month_dimension()
        || spec.time_bucket == Some(TimeBucket::Month)
    {
        Dataset::Trend
    } else {
        Dataset::Current
    }
}

/// Merge an extracted spec over the previous turn's spec and recompute all
/// derived fields.
pub fn normalize_spec(input: QuerySpec, existing: Option<&QuerySpec>) -> QuerySpec {
    let mut spec = input;

    // The whole spec replaces, but an empty measure list inherits so a
    // vague follow-up still aggregates something sensible.
    if spec.measures.is_empty() {
        spec.measures = existing
            .map(|e| e.measures.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                vec![Measure {
                    op: MeasureOp::Avg,
                    field: MeasureField::Price,
                    alias: None,
                }]
            });
    }

    if let Some(existing) = existing {
        spec.filters = merge_filters(&existing.filters, spec.filters);
    }

    lowercase_filters(&mut spec.filters);

    spec.dataset = infer_dataset(&spec);

    if spec.dataset == Dataset::Trend {
        let date = spec.filters.date.get_or_insert_with(DateRange::default);
        if date.is_empty() {
            date.last_months = Some(DEFAULT_TREND_MONTHS);
        }
        if !spec.has_month_dimension() {
            spec.dimensions.push(Dimension::Month);
        }
        spec.time_bucket = Some(TimeBucket::Month);
    }

    // Scalar aggregates pin the limit to one row; grouped queries clamp.
    if spec.dimensions.is_empty() && spec.viz_preference != VizPreference::Heatmap {
        spec.limit = Some(1);
    } else {
        spec.limit = Some(clamp_limit(spec.limit));
    }

    spec
}

/// Member-wise filter merge: a field present in `incoming` overrides, a
/// missing field inherits; range/date sub-objects merge member-by-member.
fn merge_filters(base: &SpecFilters, incoming: SpecFilters) -> SpecFilters {
    SpecFilters {
        borough: incoming.borough.or_else(|| base.borough.clone()),
        neighborhood: incoming.neighborhood.or_else(|| base.neighborhood.clone()),
        zipcode: incoming.zipcode.or_else(|| base.zipcode.clone()),
        property_type: incoming.property_type.or_else(|| base.property_type.clone()),
        price: merge_range(base.price, incoming.price),
        bedrooms: merge_range(base.bedrooms, incoming.bedrooms),
        bathrooms: merge_range(base.bathrooms, incoming.bathrooms),
        no_fee: incoming.no_fee.or(base.no_fee),
        pet_friendly: incoming.pet_friendly.or(base.pet_friendly),
        tags: incoming.tags.or_else(|| base.tags.clone()),
        date: merge_date(base.date, incoming.date),
    }
}

fn merge_range(base: Option<NumberRange>, incoming: Option<NumberRange>) -> Option<NumberRange> {
    match (base, incoming) {
        (None, None) => None,
        (base, incoming) => {
            let base = base.unwrap_or_default();
            let incoming = incoming.unwrap_or_default();
            Some(NumberRange {
                min: incoming.min.or(base.min),
                max: incoming.max.or(base.max),
            })
        }
    }
}

fn merge_date(base: Option<DateRange>, incoming: Option<DateRange>) -> Option<DateRange> {
    match (base, incoming) {
        (None, None) => None,
        (base, incoming) => {
            let base = base.unwrap_or_default();
            let incoming = incoming.unwrap_or_default();
            Some(DateRange {
                start: incoming.start.or(base.start),
                end: incoming.end.or(base.end),
                last_months: incoming.last_months.or(base.last_months),
            })
        }
    }
}

fn lowercase_filters(filters: &mut SpecFilters) {
    if let Some(boroughs) = filters.borough.as_mut() {
        for value in boroughs.iter_mut() {
            *value = value.to_lowercase();
        }
    }
    if let Some(types) = filters.property_type.as_mut() {
        for value in types.iter_mut() {
            *value = value.to_lowercase();
        }
    }
    if let Some(tags) = filters.tags.as_mut() {
        for value in tags.iter_mut() {
            *value = value.to_lowercase();
        }
    }
    if let Some(neighborhoods) = filters.neighborhood.as_mut() {
        for value in neighborhoods.iter_mut() {
            *value = value
                .to_lowercase()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join("-");
        }
    }
}

/// Reconcile measure op/field combinations, surfacing a warning when a
/// requested aggregate is silently replaced by a count.
pub fn reconcile_measures(mut spec: QuerySpec) -> (QuerySpec, Vec<String>) {
    let mut warnings = Vec::new();

    for measure in spec.measures.iter_mut() {
        if measure.field == MeasureField::Listings && measure.op != MeasureOp::Count {
            warnings.push(format!(
                "\"{} of listings\" isn't a supported aggregate; computed a listing count instead.",
                measure.op
            ));
            measure.op = MeasureOp::Count;
        }
        if measure.op == MeasureOp::Count && measure.field != MeasureField::Listings {
            measure.field = MeasureField::Listings;
        }
    }

    (spec, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn avg_price() -> Measure {
        Measure {
            op: MeasureOp::Avg,
            field: MeasureField::Price,
            alias: None,
        }
    }

    #[test]
    fn scalar_spec_is_clamped_to_one_row() {
        let spec = normalize_spec(
            QuerySpec {
                measures: vec![avg_price()],
                limit: Some(25),
                ..QuerySpec::default()
            },
            None,
        );
        assert_eq!(spec.limit, Some(1));
    }

    #[test]
    fn grouped_spec_clamps_limit_into_safety_cap() {
        let spec = normalize_spec(
            QuerySpec {
                measures: vec![avg_price()],
                dimensions: vec![Dimension::Borough],
                limit: Some(500),
                ..QuerySpec::default()
            },
            None,
        );
        assert_eq!(spec.limit, Some(MAX_ANALYTICS_ROWS));
    }

    #[test]
    fn trend_spec_gains_month_dimension_and_date_default() {
        let spec = normalize_spec(
            QuerySpec {
                dataset: Dataset::Trend,
                measures: vec![avg_price()],
                ..QuerySpec::default()
            },
            None,
        );
        assert!(spec.has_month_dimension());
        assert_eq!(spec.time_bucket, Some(TimeBucket::Month));
        assert_eq!(
            spec.filters.date.unwrap().last_months,
            Some(DEFAULT_TREND_MONTHS)
        );
    }

    #[test]
    fn month_dimension_infers_trend_dataset() {
        let spec = normalize_spec(
            QuerySpec {
                measures: vec![avg_price()],
                dimensions: vec![Dimension::Month],
                ..QuerySpec::default()
            },
            None,
        );
        assert_eq!(spec.dataset, Dataset::Trend);
    }

    #[test]
    fn explicit_date_bound_suppresses_trailing_window_default() {
        let spec = normalize_spec(
            QuerySpec {
                dataset: Dataset::Trend,
                measures: vec![avg_price()],
                filters: SpecFilters {
                    date: Some(DateRange {
                        start: NaiveDate::from_ymd_opt(2026, 1, 1),
                        ..DateRange::default()
                    }),
                    ..SpecFilters::default()
                },
                ..QuerySpec::default()
            },
            None,
        );
        let date = spec.filters.date.unwrap();
        assert!(date.last_months.is_none());
        assert!(date.start.is_some());
    }

    #[test]
    fn filter_sub_objects_merge_member_wise_over_existing() {
        let existing = normalize_spec(
            QuerySpec {
                measures: vec![avg_price()],
                dimensions: vec![Dimension::Borough],
                filters: SpecFilters {
                    price: Some(NumberRange {
                        min: Some(1000.0),
                        max: Some(5000.0),
                    }),
                    borough: Some(vec!["brooklyn".into()]),
                    ..SpecFilters::default()
                },
                ..QuerySpec::default()
            },
            None,
        );

        let merged = normalize_spec(
            QuerySpec {
                measures: vec![avg_price()],
                dimensions: vec![Dimension::Borough],
                filters: SpecFilters {
                    price: Some(NumberRange {
                        min: None,
                        max: Some(3000.0),
                    }),
                    ..SpecFilters::default()
                },
                ..QuerySpec::default()
            },
            Some(&existing),
        );

        let price = merged.filters.price.unwrap();
        assert_eq!(price.min, Some(1000.0));
        assert_eq!(price.max, Some(3000.0));
        assert_eq!(merged.filters.borough, Some(vec!["brooklyn".to_string()]));
    }

    #[test]
    fn neighborhood_filters_slugify() {
        let spec = normalize_spec(
            QuerySpec {
                measures: vec![avg_price()],
                dimensions: vec![Dimension::Neighborhood],
                filters: SpecFilters {
                    neighborhood: Some(vec!["Upper West Side".into()]),
                    ..SpecFilters::default()
                },
                ..QuerySpec::default()
            },
            None,
        );
        assert_eq!(
            spec.filters.neighborhood,
            Some(vec!["upper-west-side".to_string()])
        );
    }

    #[test]
    fn unsupported_listing_aggregate_degrades_to_count_with_warning() {
        let spec = QuerySpec {
            measures: vec![Measure {
                op: MeasureOp::Avg,
                field: MeasureField::Listings,
                alias: None,
            }],
            ..QuerySpec::default()
        };
        let (reconciled, warnings) = reconcile_measures(spec);
        assert_eq!(reconciled.measures[0].op, MeasureOp::Count);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn count_measure_normalizes_its_field_silently() {
        let spec = QuerySpec {
            measures: vec![Measure {
                op: MeasureOp::Count,
                field: MeasureField::Price,
                alias: None,
            }],
            ..QuerySpec::default()
        };
        let (reconciled, warnings) = reconcile_measures(spec);
        assert_eq!(reconciled.measures[0].field, MeasureField::Listings);
        assert!(warnings.is_empty());
    }
}
