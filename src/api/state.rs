use crate::alert::AlertStore;
use crate::hub::BroadcastHub;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<BroadcastHub>,
    /// Event sources the configured collectors report under.
    pub sources: Arc<Vec<String>>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(hub: Arc<BroadcastHub>) -> Self {
        Self {
            hub,
            sources: Arc::new(Vec::new()),
            started_at: Utc::now(),
        }
    }

    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = Arc::new(sources);
        self
    }

    pub fn store(&self) -> &AlertStore {
        self.hub.store()
    }
}
