//! In-memory per-thread state.
//!
//! Threads are ephemeral: created on first use, mutated every turn, never
//! explicitly destroyed. A caller-supplied state always wins over the
//! stored one, so clients that manage their own state round-trip it
//! through the turn API instead.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::analytics::AnalyticsContext;
use crate::search::FilterMap;

/// Accumulated state for one conversation thread
#[derive(Debug, Clone, Default)]
pub struct ThreadState {
    pub filters: FilterMap,
    pub analytics_context: Option<AnalyticsContext>,
}

/// Shared thread-state store
pub type ThreadStore = Arc<RwLock<HashMap<String, ThreadState>>>;

pub fn create_thread_store() -> ThreadStore {
    Arc::new(RwLock::new(HashMap::new()))
}
