//! The analytics pipeline: natural language to aggregate query specs to
//! shaped tabular results with a render hint.

pub mod agent;
pub mod extract;
pub mod query;
pub mod render;
pub mod respond;
pub mod result;
pub mod spec;
pub mod validate;

pub use agent::{
    AnalyticsAgent, AnalyticsContext, AnalyticsTurnOutcome, AnalyticsTurnRequest,
    AnalyticsTurnUpdate,
};
pub use render::{RenderHint, RenderPrimary};
pub use result::TabularResult;
pub use spec::{Dataset, Dimension, Measure, MeasureField, MeasureOp, QuerySpec, VizPreference};
pub use validate::{validate_spec, SpecValidation};
