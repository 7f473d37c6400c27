// Session cache for the most recent live table
use crate::domain::flow::{FlowSample, FlowSnapshot};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Single writer replaces, any number of readers share the same snapshot.
#[derive(Clone, Default)]
pub struct FlowStore {
    latest: Arc<RwLock<Option<Arc<FlowSnapshot>>>>,
}

impl FlowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a full batch. Readers holding the old snapshot keep it intact.
    pub async fn replace(&self, rows: Vec<FlowSample>) -> Arc<FlowSnapshot> {
        let snapshot = Arc::new(FlowSnapshot::new(rows));
        *self.latest.write().await = Some(snapshot.clone());
        tracing::debug!("Cached live table replaced with {} rows", snapshot.rows.len());
        snapshot
    }

    pub async fn latest(&self) -> Option<Arc<FlowSnapshot>> {
        self.latest.read().await.clone()
    }
}
