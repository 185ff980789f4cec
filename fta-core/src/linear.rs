//! Linear lap time model loaded from a JSON artifact
//!
//! The artifact is produced offline by the training pipeline:
//!
//! ```json
//! {
//!   "name": "ridge-v1",
//!   "intercept": 88.1,
//!   "coefficients": { "tire_compound": 0.45, "tire_wear": 0.004, "avg_speed": -0.004 },
//!   "residual_std": 0.3,
//!   "feature_importances": { "tire_compound": 0.4, "tire_wear": 0.35, "avg_speed": 0.25 }
//! }
//! ```

use crate::predict::{LapConditions, LapTimeModel, ModelPrediction, REFERENCE_AVG_SPEED};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// z-score of the 90th percentile; the band spans the 10th-90th percentiles
const BAND_Z: f64 = 1.2816;

/// Features a linear artifact may reference
pub const FEATURE_NAMES: [&str; 6] = [
    "tire_compound",
    "tire_wear",
    "compound_wear",
    "track_temperature",
    "temp_delta_from_optimal",
    "avg_speed",
];

#[derive(Debug, Deserialize)]
struct LinearArtifact {
    name: String,
    intercept: f64,
    coefficients: BTreeMap<String, f64>,
    #[serde(default)]
    residual_std: f64,
    #[serde(default)]
    feature_importances: BTreeMap<String, f64>,
}

/// Immutable linear regression over [`FEATURE_NAMES`]
#[derive(Debug, Clone)]
pub struct LinearLapModel {
    name: String,
    intercept: f64,
    coefficients: BTreeMap<String, f64>,
    residual_std: f64,
    importances: BTreeMap<String, f64>,
}

impl LinearLapModel {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read model artifact at {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("invalid model artifact {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let artifact: LinearArtifact =
            serde_json::from_str(text).context("failed to parse model artifact JSON")?;

        if !artifact.intercept.is_finite() {
            bail!("intercept is not finite");
        }
        if !artifact.residual_std.is_finite() || artifact.residual_std < 0.0 {
            bail!("residual_std must be a non-negative number");
        }
        for (feature, coefficient) in &artifact.coefficients {
            if !FEATURE_NAMES.contains(&feature.as_str()) {
                bail!("unknown feature '{}' in coefficients", feature);
            }
            if !coefficient.is_finite() {
                bail!("coefficient for '{}' is not finite", feature);
            }
        }

        let total: f64 = artifact.feature_importances.values().sum();
        if artifact
            .feature_importances
            .values()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            bail!("feature importances must be non-negative numbers");
        }
        let importances = if total > 0.0 {
            artifact
                .feature_importances
                .into_iter()
                .map(|(k, v)| (k, v / total))
                .collect()
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            name: artifact.name,
            intercept: artifact.intercept,
            coefficients: artifact.coefficients,
            residual_std: artifact.residual_std,
            importances,
        })
    }

    /// Feature vector for the given conditions, keyed by feature name
    ///
    /// `compound_wear` weights wear by softness (soft 3, medium 2, hard 1),
    /// so softer compounds lose more time per point of wear.
    pub fn features(conditions: &LapConditions) -> BTreeMap<&'static str, f64> {
        let compound = conditions.tire_compound.index();
        BTreeMap::from([
            ("tire_compound", compound),
            ("tire_wear", conditions.tire_wear),
            ("compound_wear", (4.0 - compound) * conditions.tire_wear),
            ("track_temperature", conditions.track_temperature),
            ("temp_delta_from_optimal", conditions.temp_delta_from_optimal()),
            ("avg_speed", conditions.avg_speed.unwrap_or(REFERENCE_AVG_SPEED)),
        ])
    }
}

impl LapTimeModel for LinearLapModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, conditions: &LapConditions) -> Result<ModelPrediction> {
        let features = Self::features(conditions);
        let predicted = self.intercept
            + self
                .coefficients
                .iter()
                .map(|(name, coefficient)| {
                    coefficient * features.get(name.as_str()).copied().unwrap_or(0.0)
                })
                .sum::<f64>();

        let margin = BAND_Z * self.residual_std;
        Ok(ModelPrediction {
            predicted_time: predicted,
            confidence_interval: (predicted - margin, predicted + margin),
            key_factors: self.importances.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TireCompound;

    const ARTIFACT: &str = r#"{
        "name": "ridge-test",
        "intercept": 88.0,
        "coefficients": { "tire_compound": 0.5, "tire_wear": 0.01 },
        "residual_std": 0.5,
        "feature_importances": { "tire_compound": 3.0, "tire_wear": 1.0 }
    }"#;

    fn conditions() -> LapConditions {
        LapConditions::new(TireCompound::Medium, 20.0, 42.5, None).unwrap()
    }

    #[test]
    fn test_linear_prediction() {
        let model = LinearLapModel::from_json(ARTIFACT).unwrap();
        let prediction = model.predict(&conditions()).unwrap();
        // 88.0 + 0.5 * 2 + 0.01 * 20
        assert!((prediction.predicted_time - 89.2).abs() < 1e-9);
        let (lower, upper) = prediction.confidence_interval;
        assert!((upper - lower - 2.0 * BAND_Z * 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_importances_are_normalized() {
        let model = LinearLapModel::from_json(ARTIFACT).unwrap();
        let prediction = model.predict(&conditions()).unwrap();
        assert!((prediction.key_factors["tire_compound"] - 0.75).abs() < 1e-9);
        assert!((prediction.key_factors["tire_wear"] - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_feature_rejected() {
        let text = r#"{"name":"x","intercept":88.0,"coefficients":{"fuel_load":0.03}}"#;
        let err = LinearLapModel::from_json(text).unwrap_err();
        assert!(err.to_string().contains("fuel_load"));
    }

    #[test]
    fn test_negative_residual_std_rejected() {
        let text = r#"{"name":"x","intercept":88.0,"coefficients":{},"residual_std":-1.0}"#;
        assert!(LinearLapModel::from_json(text).is_err());
    }

    #[test]
    fn test_compound_wear_weights_softer_compounds() {
        let soft = LapConditions::new(TireCompound::Soft, 50.0, 42.5, None).unwrap();
        let hard = LapConditions::new(TireCompound::Hard, 50.0, 42.5, None).unwrap();
        assert_eq!(LinearLapModel::features(&soft)["compound_wear"], 150.0);
        assert_eq!(LinearLapModel::features(&hard)["compound_wear"], 50.0);
    }

    #[test]
    fn test_bundled_artifact_softs_degrade_fastest() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../models/lap_time_model.json");
        let model = LinearLapModel::from_file(&path).unwrap();

        let wear_loss = |compound| {
            let fresh = LapConditions::new(compound, 0.0, 42.5, Some(210.0)).unwrap();
            let worn = LapConditions::new(compound, 60.0, 42.5, Some(210.0)).unwrap();
            model.predict(&worn).unwrap().predicted_time - model.predict(&fresh).unwrap().predicted_time
        };

        let soft = wear_loss(TireCompound::Soft);
        let medium = wear_loss(TireCompound::Medium);
        let hard = wear_loss(TireCompound::Hard);
        assert!(soft > medium && medium > hard, "soft {} medium {} hard {}", soft, medium, hard);
        assert!(hard > 0.0);

        // Fresh softs are still the quickest
        let fresh = |compound| {
            let conditions = LapConditions::new(compound, 0.0, 42.5, None).unwrap();
            model.predict(&conditions).unwrap().predicted_time
        };
        assert!(fresh(TireCompound::Soft) < fresh(TireCompound::Hard));
    }

    #[test]
    fn test_bundled_artifact_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../models/lap_time_model.json");
        let model = LinearLapModel::from_file(&path).unwrap();
        let prediction = model.predict(&conditions()).unwrap();
        assert!(prediction.predicted_time > 80.0 && prediction.predicted_time < 100.0);
        let sum: f64 = prediction.key_factors.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }
}
