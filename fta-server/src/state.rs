//! Application state management

use crate::config::ServerConfig;
use fta_core::error::Result;
use fta_core::LapAnalyzer;
use fta_sources::{DemoLapGenerator, InsertSummary, LapStore};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Uploaded laps
    pub store: Arc<RwLock<LapStore>>,

    /// Analysis engine, immutable after startup
    pub analyzer: Arc<LapAnalyzer>,

    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Build state from config, loading the model artifact if configured
    pub fn new(config: ServerConfig) -> Result<Self> {
        let analyzer = LapAnalyzer::from_config(&config.analysis, config.model_path.as_deref())?;
        Ok(Self::with_analyzer(config, analyzer))
    }

    pub fn with_analyzer(config: ServerConfig, analyzer: LapAnalyzer) -> Self {
        Self {
            store: Arc::new(RwLock::new(LapStore::new())),
            analyzer: Arc::new(analyzer),
            config: Arc::new(config),
        }
    }

    /// Load a deterministic demo session into the store
    pub async fn seed_demo(&self, laps: u32) -> Result<InsertSummary> {
        let samples = DemoLapGenerator::default().session(laps);
        let mut store = self.store.write().await;
        store.insert_batch(samples)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_analyzer(ServerConfig::default(), LapAnalyzer::default())
    }
}
