//! Lap time prediction
//!
//! A [`Predictor`] answers "how fast should this lap have been" from the
//! tire and track conditions. When a trained [`LapTimeModel`] is injected it
//! is asked first; when there is none, or it fails for a given input, the
//! deterministic [`HeuristicModel`] answers instead. Callers get the same
//! [`PredictionResult`] shape either way.

use crate::error::{AnalysisError, Result};
use crate::model::{PredictionResult, TireCompound};
use crate::units::round_to;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Track temperature with the best grip
pub const OPTIMAL_TRACK_TEMP: f64 = 42.5;

/// Average lap speed the heuristic treats as neutral
pub const REFERENCE_AVG_SPEED: f64 = 210.0;

/// Validated prediction inputs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LapConditions {
    pub tire_compound: TireCompound,
    pub tire_wear: f64,
    pub track_temperature: f64,
    pub avg_speed: Option<f64>,
}

impl LapConditions {
    /// Validate inputs against the telemetry sample ranges
    pub fn new(
        tire_compound: TireCompound,
        tire_wear: f64,
        track_temperature: f64,
        avg_speed: Option<f64>,
    ) -> Result<Self> {
        AnalysisError::check_range("tire_wear", tire_wear, 0.0, 100.0)?;
        AnalysisError::check_range("track_temperature", track_temperature, 0.0, 60.0)?;
        if let Some(speed) = avg_speed {
            AnalysisError::check_range("avg_speed", speed, 0.0, 400.0)?;
        }
        Ok(Self {
            tire_compound,
            tire_wear,
            track_temperature,
            avg_speed,
        })
    }

    /// Degrees away from the optimal grip temperature
    pub fn temp_delta_from_optimal(&self) -> f64 {
        (self.track_temperature - OPTIMAL_TRACK_TEMP).abs()
    }
}

/// Raw output of a lap time model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPrediction {
    pub predicted_time: f64,
    pub confidence_interval: (f64, f64),
    pub key_factors: BTreeMap<String, f64>,
}

/// A trained lap time regression model
///
/// Implementations are loaded once and shared read-only across threads.
pub trait LapTimeModel: Send + Sync {
    /// Model name for logs (e.g. "ridge-v1")
    fn name(&self) -> &str;

    /// Predict a lap time for validated conditions
    fn predict(&self, conditions: &LapConditions) -> anyhow::Result<ModelPrediction>;
}

/// Which path produced predictions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionSource {
    Model,
    Heuristic,
}

/// Deterministic fallback formula
///
/// predicted = base + compound offset + wear x compound wear rate
///           + |temp - optimum| x temp penalty + clamped speed adjustment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicModel {
    pub base_time: f64,
    pub soft_offset: f64,
    pub medium_offset: f64,
    pub hard_offset: f64,
    /// Wear (percent) that costs nothing
    pub wear_baseline: f64,
    /// Seconds per wear point above the baseline
    pub soft_wear_rate: f64,
    pub medium_wear_rate: f64,
    pub hard_wear_rate: f64,
    /// Seconds per degree away from the optimal track temperature
    pub temp_penalty: f64,
    /// Seconds per km/h of average speed below the reference
    pub speed_sensitivity: f64,
    pub max_speed_adjustment: f64,
    /// Half-width of the confidence band on fresh tires
    pub base_margin: f64,
    /// Extra half-width per wear point
    pub wear_margin: f64,
}

impl Default for HeuristicModel {
    fn default() -> Self {
        Self {
            base_time: 89.0,
            soft_offset: -0.5,
            medium_offset: 0.0,
            hard_offset: 0.5,
            wear_baseline: 0.0,
            soft_wear_rate: 0.015,
            medium_wear_rate: 0.010,
            hard_wear_rate: 0.007,
            temp_penalty: 0.02,
            speed_sensitivity: 0.005,
            max_speed_adjustment: 0.3,
            base_margin: 0.5,
            wear_margin: 0.005,
        }
    }
}

impl HeuristicModel {
    /// Static relative importances of the heuristic's inputs
    pub fn key_factors() -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("tire_compound".to_string(), 0.35),
            ("tire_wear".to_string(), 0.30),
            ("track_temperature".to_string(), 0.20),
            ("avg_speed".to_string(), 0.15),
        ])
    }

    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("heuristic.base_time", self.base_time),
            ("heuristic.soft_wear_rate", self.soft_wear_rate),
            ("heuristic.medium_wear_rate", self.medium_wear_rate),
            ("heuristic.hard_wear_rate", self.hard_wear_rate),
            ("heuristic.temp_penalty", self.temp_penalty),
            ("heuristic.speed_sensitivity", self.speed_sensitivity),
            ("heuristic.max_speed_adjustment", self.max_speed_adjustment),
            ("heuristic.base_margin", self.base_margin),
            ("heuristic.wear_margin", self.wear_margin),
        ];
        for (field, value) in fields {
            AnalysisError::check_range(field, value, 0.0, f64::MAX)?;
        }
        if self.base_time <= self.max_speed_adjustment + 1.0 {
            return Err(AnalysisError::invalid(
                "heuristic.base_time",
                "must leave a positive lap time after all adjustments",
            ));
        }
        Ok(())
    }

    fn compound_offset(&self, compound: TireCompound) -> f64 {
        match compound {
            TireCompound::Soft => self.soft_offset,
            TireCompound::Medium => self.medium_offset,
            TireCompound::Hard => self.hard_offset,
        }
    }

    fn wear_rate(&self, compound: TireCompound) -> f64 {
        match compound {
            TireCompound::Soft => self.soft_wear_rate,
            TireCompound::Medium => self.medium_wear_rate,
            TireCompound::Hard => self.hard_wear_rate,
        }
    }

    pub fn predict(&self, conditions: &LapConditions) -> PredictionResult {
        let compound = conditions.tire_compound;
        let wear_above = (conditions.tire_wear - self.wear_baseline).max(0.0);

        let speed_adjustment = conditions
            .avg_speed
            .map(|speed| {
                ((REFERENCE_AVG_SPEED - speed) * self.speed_sensitivity)
                    .clamp(-self.max_speed_adjustment, self.max_speed_adjustment)
            })
            .unwrap_or(0.0);

        let predicted = self.base_time
            + self.compound_offset(compound)
            + wear_above * self.wear_rate(compound)
            + conditions.temp_delta_from_optimal() * self.temp_penalty
            + speed_adjustment;
        let predicted = round_to(predicted.max(0.001), 3);

        let margin = self.base_margin + conditions.tire_wear * self.wear_margin;

        PredictionResult {
            predicted_time: predicted,
            confidence_interval: (
                round_to(predicted - margin, 3),
                round_to(predicted + margin, 3),
            ),
            key_factors: Self::key_factors(),
        }
    }
}

/// Lap time predictor with an optional trained model
#[derive(Clone)]
pub struct Predictor {
    model: Option<Arc<dyn LapTimeModel>>,
    heuristic: HeuristicModel,
}

impl Predictor {
    /// Predictor that always uses the fallback formula
    pub fn heuristic(heuristic: HeuristicModel) -> Self {
        Self {
            model: None,
            heuristic,
        }
    }

    /// Predictor backed by a trained model, falling back per call on failure
    pub fn with_model(model: Arc<dyn LapTimeModel>, heuristic: HeuristicModel) -> Self {
        Self {
            model: Some(model),
            heuristic,
        }
    }

    /// Load a linear model artifact, or fall back to the heuristic
    ///
    /// A missing or unreadable artifact is never fatal.
    pub fn load(path: Option<&Path>, heuristic: HeuristicModel) -> Self {
        let Some(path) = path else {
            return Self::heuristic(heuristic);
        };

        match crate::linear::LinearLapModel::from_file(path) {
            Ok(model) => {
                tracing::info!("Loaded lap time model '{}' from {}", model.name(), path.display());
                Self::with_model(Arc::new(model), heuristic)
            }
            Err(e) => {
                warn!(
                    "Lap time model unavailable ({:#}), using heuristic predictions",
                    e
                );
                Self::heuristic(heuristic)
            }
        }
    }

    pub fn source(&self) -> PredictionSource {
        if self.model.is_some() {
            PredictionSource::Model
        } else {
            PredictionSource::Heuristic
        }
    }

    /// Predict the optimal lap time for the given conditions
    pub fn predict(
        &self,
        tire_compound: TireCompound,
        tire_wear: f64,
        track_temperature: f64,
        avg_speed: Option<f64>,
    ) -> Result<PredictionResult> {
        let conditions = LapConditions::new(tire_compound, tire_wear, track_temperature, avg_speed)?;
        Ok(self.predict_conditions(&conditions))
    }

    /// Predict for already-validated conditions
    pub fn predict_conditions(&self, conditions: &LapConditions) -> PredictionResult {
        if let Some(model) = &self.model {
            match model.predict(conditions).and_then(check_model_output) {
                Ok(prediction) => return prediction,
                Err(e) => {
                    warn!(
                        "Model '{}' failed to predict ({:#}), using heuristic",
                        model.name(),
                        e
                    );
                }
            }
        }
        self.heuristic.predict(conditions)
    }
}

impl std::fmt::Debug for Predictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predictor")
            .field("model", &self.model.as_ref().map(|m| m.name().to_string()))
            .field("heuristic", &self.heuristic)
            .finish()
    }
}

impl Default for Predictor {
    fn default() -> Self {
        Self::heuristic(HeuristicModel::default())
    }
}

/// Reject outputs that would break the result invariants
fn check_model_output(prediction: ModelPrediction) -> anyhow::Result<PredictionResult> {
    let ModelPrediction {
        predicted_time,
        confidence_interval: (lower, upper),
        key_factors,
    } = prediction;

    if !predicted_time.is_finite() || predicted_time <= 0.0 {
        anyhow::bail!("predicted time {} is not a positive lap time", predicted_time);
    }
    if !lower.is_finite() || !upper.is_finite() {
        anyhow::bail!("confidence interval ({}, {}) is not finite", lower, upper);
    }

    let predicted_time = round_to(predicted_time, 3);
    let key_factors = if key_factors.is_empty() {
        HeuristicModel::key_factors()
    } else {
        key_factors
    };

    Ok(PredictionResult {
        predicted_time,
        confidence_interval: (
            round_to(lower.min(predicted_time), 3),
            round_to(upper.max(predicted_time), 3),
        ),
        key_factors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenModel;

    impl LapTimeModel for BrokenModel {
        fn name(&self) -> &str {
            "broken"
        }

        fn predict(&self, _conditions: &LapConditions) -> anyhow::Result<ModelPrediction> {
            anyhow::bail!("weights not initialized")
        }
    }

    struct FixedModel(f64);

    impl LapTimeModel for FixedModel {
        fn name(&self) -> &str {
            "fixed"
        }

        fn predict(&self, _conditions: &LapConditions) -> anyhow::Result<ModelPrediction> {
            Ok(ModelPrediction {
                predicted_time: self.0,
                confidence_interval: (self.0 - 0.25, self.0 + 0.25),
                key_factors: BTreeMap::from([("avg_speed_sector_1".to_string(), 1.0)]),
            })
        }
    }

    #[test]
    fn test_heuristic_soft_fresh_tires() {
        let predictor = Predictor::default();
        let result = predictor.predict(TireCompound::Soft, 0.0, 42.5, None).unwrap();
        assert_eq!(result.predicted_time, 88.5);
        assert_eq!(result.confidence_interval, (88.0, 89.0));
    }

    #[test]
    fn test_heuristic_compound_pace_order() {
        let predictor = Predictor::default();
        let soft = predictor.predict(TireCompound::Soft, 10.0, 42.5, None).unwrap();
        let medium = predictor.predict(TireCompound::Medium, 10.0, 42.5, None).unwrap();
        let hard = predictor.predict(TireCompound::Hard, 10.0, 42.5, None).unwrap();
        assert!(soft.predicted_time < medium.predicted_time);
        assert!(medium.predicted_time < hard.predicted_time);
    }

    #[test]
    fn test_heuristic_soft_degrades_faster() {
        let predictor = Predictor::default();
        let soft_fresh = predictor.predict(TireCompound::Soft, 0.0, 42.5, None).unwrap();
        let soft_worn = predictor.predict(TireCompound::Soft, 60.0, 42.5, None).unwrap();
        let hard_fresh = predictor.predict(TireCompound::Hard, 0.0, 42.5, None).unwrap();
        let hard_worn = predictor.predict(TireCompound::Hard, 60.0, 42.5, None).unwrap();

        let soft_loss = soft_worn.predicted_time - soft_fresh.predicted_time;
        let hard_loss = hard_worn.predicted_time - hard_fresh.predicted_time;
        assert!(soft_loss > hard_loss);
    }

    #[test]
    fn test_heuristic_speed_adjustment_is_clamped() {
        let predictor = Predictor::default();
        let neutral = predictor.predict(TireCompound::Medium, 0.0, 42.5, None).unwrap();
        let very_fast = predictor.predict(TireCompound::Medium, 0.0, 42.5, Some(400.0)).unwrap();
        let very_slow = predictor.predict(TireCompound::Medium, 0.0, 42.5, Some(0.0)).unwrap();
        assert!((neutral.predicted_time - very_fast.predicted_time - 0.3).abs() < 1e-9);
        assert!((very_slow.predicted_time - neutral.predicted_time - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_heuristic_is_deterministic() {
        let predictor = Predictor::default();
        let a = predictor.predict(TireCompound::Hard, 47.3, 31.0, Some(198.4)).unwrap();
        let b = predictor.predict(TireCompound::Hard, 47.3, 31.0, Some(198.4)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_interval_widens_with_wear() {
        let predictor = Predictor::default();
        let fresh = predictor.predict(TireCompound::Medium, 0.0, 42.5, None).unwrap();
        let worn = predictor.predict(TireCompound::Medium, 80.0, 42.5, None).unwrap();
        let width = |r: &PredictionResult| r.confidence_interval.1 - r.confidence_interval.0;
        assert!(width(&worn) > width(&fresh));
    }

    #[test]
    fn test_predict_rejects_out_of_range_inputs() {
        let predictor = Predictor::default();
        assert!(matches!(
            predictor.predict(TireCompound::Soft, 101.0, 40.0, None),
            Err(AnalysisError::InvalidParameter { field: "tire_wear", .. })
        ));
        assert!(matches!(
            predictor.predict(TireCompound::Soft, 10.0, -1.0, None),
            Err(AnalysisError::InvalidParameter { field: "track_temperature", .. })
        ));
        assert!(matches!(
            predictor.predict(TireCompound::Soft, 10.0, 40.0, Some(450.0)),
            Err(AnalysisError::InvalidParameter { field: "avg_speed", .. })
        ));
    }

    #[test]
    fn test_model_path_used_when_available() {
        let predictor = Predictor::with_model(Arc::new(FixedModel(87.25)), HeuristicModel::default());
        assert_eq!(predictor.source(), PredictionSource::Model);
        let result = predictor.predict(TireCompound::Soft, 10.0, 40.0, None).unwrap();
        assert_eq!(result.predicted_time, 87.25);
        assert_eq!(result.confidence_interval, (87.0, 87.5));
        assert!(result.key_factors.contains_key("avg_speed_sector_1"));
    }

    #[test]
    fn test_failing_model_falls_back_to_heuristic() {
        let predictor = Predictor::with_model(Arc::new(BrokenModel), HeuristicModel::default());
        let result = predictor.predict(TireCompound::Soft, 0.0, 42.5, None).unwrap();
        assert_eq!(result.predicted_time, 88.5);
        assert_eq!(result.key_factors, HeuristicModel::key_factors());
    }

    #[test]
    fn test_nonpositive_model_output_falls_back() {
        let predictor = Predictor::with_model(Arc::new(FixedModel(-3.0)), HeuristicModel::default());
        let result = predictor.predict(TireCompound::Soft, 0.0, 42.5, None).unwrap();
        assert_eq!(result.predicted_time, 88.5);
    }

    #[test]
    fn test_load_without_artifact_uses_heuristic() {
        let predictor = Predictor::load(
            Some(Path::new("/nonexistent/lap_time_model.json")),
            HeuristicModel::default(),
        );
        assert_eq!(predictor.source(), PredictionSource::Heuristic);

        let predictor = Predictor::load(None, HeuristicModel::default());
        assert_eq!(predictor.source(), PredictionSource::Heuristic);
    }

    #[test]
    fn test_key_factors_sum_to_one() {
        let sum: f64 = HeuristicModel::key_factors().values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_heuristic_validate_rejects_negative_rates() {
        let heuristic = HeuristicModel {
            soft_wear_rate: -0.01,
            ..Default::default()
        };
        assert!(heuristic.validate().is_err());
        assert!(HeuristicModel::default().validate().is_ok());
    }
}
