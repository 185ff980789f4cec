//! Performance scoring

use crate::error::{AnalysisError, Result};
use crate::model::{Mistake, Severity};
use crate::units::round_to;
use serde::{Deserialize, Serialize};

/// Score penalties
///
/// All weights must be non-negative; otherwise adding a mistake or losing
/// more time could raise the score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Points lost per percent of deviation from the predicted time
    pub delta_weight: f64,
    pub per_mistake: f64,
    pub low_severity: f64,
    pub medium_severity: f64,
    pub high_severity: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            delta_weight: 20.0,
            per_mistake: 5.0,
            low_severity: 1.0,
            medium_severity: 3.0,
            high_severity: 6.0,
        }
    }
}

impl ScoringWeights {
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("scoring.delta_weight", self.delta_weight),
            ("scoring.per_mistake", self.per_mistake),
            ("scoring.low_severity", self.low_severity),
            ("scoring.medium_severity", self.medium_severity),
            ("scoring.high_severity", self.high_severity),
        ];
        for (field, value) in fields {
            AnalysisError::check_range(field, value, 0.0, f64::MAX)?;
        }
        Ok(())
    }

    fn severity_penalty(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Low => self.low_severity,
            Severity::Medium => self.medium_severity,
            Severity::High => self.high_severity,
        }
    }

    /// Score a lap from 0 to 100, one decimal place
    ///
    /// Symmetric in the sign of `delta`: being much faster than predicted
    /// means the prediction was off, not that the lap was perfect.
    pub fn score(&self, predicted: f64, delta: f64, mistakes: &[Mistake]) -> f64 {
        let deviation_pct = if predicted > 0.0 {
            delta.abs() / predicted * 100.0
        } else {
            0.0
        };
        let penalties: f64 = mistakes
            .iter()
            .map(|m| self.per_mistake + self.severity_penalty(m.severity))
            .sum();

        let score = 100.0 - deviation_pct * self.delta_weight - penalties;
        round_to(score.clamp(0.0, 100.0), 1)
    }
}
