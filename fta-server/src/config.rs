//! Server configuration
//!
//! Resolution order:
//! 1. JSON file named by `FTA_CONFIG`
//! 2. `<config dir>/fta/config.json` if it exists
//! 3. Built-in defaults
//!
//! followed by the `FTA_ADDR`, `FTA_MODEL_PATH` and `FTA_DEMO_LAPS`
//! environment overrides.

use anyhow::{bail, Context, Result};
use fta_core::AnalysisConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    /// Trained lap time model artifact; the heuristic is used without one
    pub model_path: Option<PathBuf>,
    /// Synthetic laps loaded at startup
    pub demo_laps: u32,
    pub max_upload_bytes: usize,
    pub analysis: AnalysisConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 9100)),
            model_path: None,
            demo_laps: 0,
            max_upload_bytes: 64 * 1024 * 1024,
            analysis: AnalysisConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load from the usual locations plus the process environment
    pub fn load() -> Result<Self> {
        let path = std::env::var_os("FTA_CONFIG")
            .map(PathBuf::from)
            .or_else(|| Self::default_path().filter(|p| p.exists()));

        let mut config = match path {
            Some(path) => {
                info!("Loading config from {}", path.display());
                Self::from_file(&path)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("fta").join("config.json"))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Apply `FTA_*` overrides from a variable lookup
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(addr) = lookup("FTA_ADDR") {
            self.listen_addr = addr
                .parse()
                .with_context(|| format!("FTA_ADDR '{}' is not a socket address", addr))?;
        }
        if let Some(path) = lookup("FTA_MODEL_PATH") {
            self.model_path = (!path.is_empty()).then(|| PathBuf::from(path));
        }
        if let Some(laps) = lookup("FTA_DEMO_LAPS") {
            self.demo_laps = laps
                .parse()
                .with_context(|| format!("FTA_DEMO_LAPS '{}' is not a lap count", laps))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_upload_bytes == 0 {
            bail!("max_upload_bytes must be greater than zero");
        }
        self.analysis
            .validate()
            .context("Invalid analysis configuration")?;
        Ok(())
    }
}
