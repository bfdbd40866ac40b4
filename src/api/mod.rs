//! REST API surface.
//!
//! Endpoints:
//! - `POST /api/chat`            - search pipeline turn (JSON or SSE stream)
//! - `POST /api/analytics/chat`  - analytics pipeline turn (JSON or SSE stream)
//! - `POST /api/search`          - direct filter execution, no model call
//! - `GET  /api/health`          - health check

mod routes;
mod threads;

pub use routes::{create_router, ApiState};
pub use threads::{ThreadState, ThreadStore};
