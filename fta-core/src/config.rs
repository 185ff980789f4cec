//! Analysis tuning
//!
//! Every constant the engine uses can be overridden from the service's JSON
//! config. Missing keys take their defaults, so `{}` is a valid config.

use crate::detect::DetectorThresholds;
use crate::error::Result;
use crate::predict::HeuristicModel;
use crate::score::ScoringWeights;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub thresholds: DetectorThresholds,
    pub scoring: ScoringWeights,
    pub heuristic: HeuristicModel,
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        self.scoring.validate()?;
        self.heuristic.validate()?;
        self.thresholds.validate()
    }
}
