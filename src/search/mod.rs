//! The search pipeline: natural language to listing filters to rows.

pub mod agent;
pub mod extract;
pub mod filters;
pub mod query;
pub mod respond;
pub mod schema;
pub mod validate;

pub use agent::{Intent, SearchAgent, SearchTurnOutcome, SearchTurnRequest, TurnUpdate};
pub use filters::{merge_filters, FilterMap, FilterSet, RangeFilter, StringOrList};
pub use query::SortOrder;
pub use validate::{validate_filters, ValidationOutcome};
