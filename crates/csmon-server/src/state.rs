use crate::config::ServerConfig;
use chrono::{DateTime, Utc};
use csmon_upstream::collector::AlertCollector;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub collector: Arc<AlertCollector>,
    pub start_time: DateTime<Utc>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(collector: Arc<AlertCollector>, config: ServerConfig) -> Self {
        Self {
            collector,
            start_time: Utc::now(),
            config: Arc::new(config),
        }
    }
}
