//! Filter Set model and the merge engine.
//!
//! Raw filter state accumulates as a JSON object so a new extraction can
//! carry deletion signals (`"field": null`). Field semantics are driven by
//! a registry of tagged kinds: adding a filter field means adding one
//! registry entry, not new branching logic. The typed [`FilterSet`] is
//! produced by validation and consumed by query synthesis.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw, possibly-unvalidated filter state
pub type FilterMap = Map<String, Value>;

/// How a filter field merges and compiles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// `{min, max}` object; members merge independently
    Range,
    /// Array of strings; replaces entirely on merge
    List,
    /// Single string or array of strings; replaces on merge
    ScalarOrList,
    /// Plain scalar; overrides on merge
    Scalar,
}

/// Field registry: every known filter field and its kind
pub const FIELD_REGISTRY: &[(&str, FieldKind)] = &[
    ("price", FieldKind::Range),
    ("bedrooms", FieldKind::Range),
    ("bathrooms", FieldKind::Range),
    ("sqft", FieldKind::Range),
    ("built_in", FieldKind::Range),
    ("brokers_fee", FieldKind::Range),
    ("days_on_market", FieldKind::Range),
    ("neighborhood", FieldKind::List),
    ("tag_list", FieldKind::List),
    ("amenities", FieldKind::List),
    ("property_type", FieldKind::ScalarOrList),
    ("borough", FieldKind::ScalarOrList),
    ("zipcode", FieldKind::ScalarOrList),
    ("no_fee", FieldKind::Scalar),
    ("address", FieldKind::Scalar),
];

/// Kind lookup; unknown fields behave as plain scalars
pub fn field_kind(name: &str) -> FieldKind {
    FIELD_REGISTRY
        .iter()
        .find(|(field, _)| *field == name)
        .map(|(_, kind)| *kind)
        .unwrap_or(FieldKind::Scalar)
}

/// Merge a newly extracted partial filter set into prior-turn state.
///
/// - empty side short-circuits to the other
/// - explicit `null` in `right` removes the field
/// - range fields merge member-wise: a non-null member overrides, a null
///   member inherits from `left`
/// - arrays replace entirely, never concatenate
/// - scalars override
/// - unrelated fields from `left` are preserved verbatim
pub fn merge_filters(left: &FilterMap, right: &FilterMap) -> FilterMap {
    if left.is_empty() {
        return right.clone();
    }
    if right.is_empty() {
        return left.clone();
    }

    let mut merged = left.clone();

    for (key, value) in right {
        if value.is_null() {
            merged.remove(key);
            continue;
        }

        match field_kind(key) {
            FieldKind::Range if value.is_object() => {
                let incoming = value.as_object().expect("checked is_object");
                let merged_range = merge_range(merged.get(key).and_then(Value::as_object), incoming);
                merged.insert(key.clone(), merged_range);
            }
            _ => {
                merged.insert(key.clone(), value.clone());
            }
        }
    }

    merged
}

fn merge_range(existing: Option<&Map<String, Value>>, incoming: &Map<String, Value>) -> Value {
    let member = |name: &str| -> Value {
        match incoming.get(name) {
            Some(v) if !v.is_null() => v.clone(),
            _ => existing
                .and_then(|e| e.get(name))
                .cloned()
                .unwrap_or(Value::Null),
        }
    };

    let mut range = Map::new();
    range.insert("min".to_string(), member("min"));
    range.insert("max".to_string(), member("max"));
    Value::Object(range)
}

// ============================================================================
// Typed filter set
// ============================================================================

/// A numeric range constraint; either bound may be open
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeFilter {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl RangeFilter {
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Both bounds present and equal (the exact-value case)
    pub fn as_exact(&self) -> Option<f64> {
        match (self.min, self.max) {
            (Some(min), Some(max)) if min == max => Some(min),
            _ => None,
        }
    }
}

/// A field accepting either one value or a list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    pub fn values(&self) -> Vec<String> {
        match self {
            StringOrList::One(v) => vec![v.clone()],
            StringOrList::Many(vs) => vs.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            StringOrList::One(v) => v.is_empty(),
            StringOrList::Many(vs) => vs.is_empty(),
        }
    }
}

/// Validated search filters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<RangeFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<RangeFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<RangeFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sqft: Option<RangeFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub built_in: Option<RangeFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brokers_fee: Option<RangeFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_on_market: Option<RangeFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_type: Option<StringOrList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub borough: Option<StringOrList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zipcode: Option<StringOrList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_list: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amenities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_fee: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl FilterSet {
    /// Typed view of a raw filter map. Unknown fields are ignored.
    pub fn from_map(map: &FilterMap) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(map.clone()))
    }

    pub fn is_empty(&self) -> bool {
        *self == FilterSet::default()
    }
}
