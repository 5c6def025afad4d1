// src/state.rs
use std::sync::Arc;
use std::time::Duration;

use crate::services::agronomist::Agronomist;
use crate::services::metrics_manager::MetricsManager;
use crate::services::session_manager::SessionManager;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub sessions: SessionManager,
    pub metrics: MetricsManager,
    pub agronomist: Arc<dyn Agronomist>,
    pub admin_key: Option<String>,
}

impl AppState {
    pub fn new(agronomist: Arc<dyn Agronomist>, session_ttl: Duration) -> Self {
        Self {
            sessions: SessionManager::new(session_ttl),
            metrics: MetricsManager::new(),
            agronomist,
            admin_key: None,
        }
    }

    pub fn with_admin_key(mut self, key: Option<String>) -> Self {
        self.admin_key = key;
        self
    }
}
