use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Diagnosis,
    Chat,
    Market,
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Diagnosis => "diagnosis",
            Feature::Chat => "chat",
            Feature::Market => "market",
        }
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct MetricsData {
    pub requests: HashMap<String, u64>,
    pub failures: HashMap<String, u64>,
}

#[derive(Debug, Clone)]
pub struct MetricsManager {
    inner: Arc<RwLock<MetricsData>>,
}

impl Default for MetricsManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsManager {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MetricsData::default())),
        }
    }

    /// Count a call that reached the model.
    pub async fn record_request(&self, feature: Feature) {
        let mut data = self.inner.write().await;
        *data.requests.entry(feature.as_str().to_string()).or_insert(0) += 1;
    }

    pub async fn record_failure(&self, feature: Feature) {
        let mut data = self.inner.write().await;
        *data.failures.entry(feature.as_str().to_string()).or_insert(0) += 1;
    }

    pub async fn get_metrics(&self) -> MetricsData {
        self.inner.read().await.clone()
    }
}
