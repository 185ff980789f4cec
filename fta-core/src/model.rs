//! Lap telemetry data model
//!
//! Defines the per-sample sensor reading that uploads carry and the derived
//! records the analysis engine produces. The JSON shapes of [`LapAnalysis`]
//! and [`PredictionResult`] are consumed by presentation layers as-is, so
//! field names here are part of the wire contract.

use crate::error::{AnalysisError, Result};
use crate::units::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const MAX_SECTORS: u8 = 3;
pub const MAX_GEAR: u8 = 8;

/// One sensor reading at a point in time within a lap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Lap number (1-based)
    pub lap_number: u32,

    /// Track sector (1-3)
    pub sector: u8,

    /// Seconds since lap start
    pub timestamp: Seconds,

    pub speed: KilometersPerHour,

    pub throttle: Percent,

    pub brake: Percent,

    /// Steering wheel angle (-540 to 540)
    pub steering_angle: Degrees,

    /// Gear (0 = neutral, 1-8)
    pub gear: u8,

    pub tire_compound: TireCompound,

    pub tire_wear: Percent,

    pub track_temperature: Celsius,

    /// Completed lap time, present only once the lap is finished
    #[serde(default)]
    pub lap_time: Option<Seconds>,
}

impl TelemetrySample {
    /// Check every field against its documented range
    pub fn validate(&self) -> Result<()> {
        if self.lap_number < 1 {
            return Err(AnalysisError::invalid("lap_number", "must be at least 1"));
        }
        if !(1..=MAX_SECTORS).contains(&self.sector) {
            return Err(AnalysisError::out_of_range(
                "sector",
                self.sector as f64,
                1.0,
                MAX_SECTORS as f64,
            ));
        }
        AnalysisError::check_range("timestamp", self.timestamp.0, 0.0, f64::MAX)?;
        AnalysisError::check_range("speed", self.speed.0, 0.0, 400.0)?;
        AnalysisError::check_range("throttle", self.throttle.0, 0.0, 100.0)?;
        AnalysisError::check_range("brake", self.brake.0, 0.0, 100.0)?;
        AnalysisError::check_range("steering_angle", self.steering_angle.0, -540.0, 540.0)?;
        if self.gear > MAX_GEAR {
            return Err(AnalysisError::out_of_range(
                "gear",
                self.gear as f64,
                0.0,
                MAX_GEAR as f64,
            ));
        }
        AnalysisError::check_range("tire_wear", self.tire_wear.0, 0.0, 100.0)?;
        AnalysisError::check_range("track_temperature", self.track_temperature.0, 0.0, 60.0)?;
        if let Some(lap_time) = self.lap_time {
            AnalysisError::check_range("lap_time", lap_time.0, 0.0, f64::MAX)?;
        }
        Ok(())
    }
}

/// Tire compound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TireCompound {
    Soft,
    Medium,
    Hard,
}

impl TireCompound {
    pub fn as_str(&self) -> &'static str {
        match self {
            TireCompound::Soft => "soft",
            TireCompound::Medium => "medium",
            TireCompound::Hard => "hard",
        }
    }

    /// Numeric encoding used as a regression feature (soft=1, medium=2, hard=3)
    pub fn index(&self) -> f64 {
        match self {
            TireCompound::Soft => 1.0,
            TireCompound::Medium => 2.0,
            TireCompound::Hard => 3.0,
        }
    }
}

impl fmt::Display for TireCompound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TireCompound {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "soft" => Ok(TireCompound::Soft),
            "medium" => Ok(TireCompound::Medium),
            "hard" => Ok(TireCompound::Hard),
            other => Err(AnalysisError::invalid(
                "tire_compound",
                format!("'{}' is not one of soft, medium, hard", other),
            )),
        }
    }
}

/// Kind of driving error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MistakeType {
    LateBraking,
    ThrottleInconsistency,
    ThrottleLift,
    TireDegradation,
    LowCornerSpeed,
}

impl fmt::Display for MistakeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MistakeType::LateBraking => write!(f, "late_braking"),
            MistakeType::ThrottleInconsistency => write!(f, "throttle_inconsistency"),
            MistakeType::ThrottleLift => write!(f, "throttle_lift"),
            MistakeType::TireDegradation => write!(f, "tire_degradation"),
            MistakeType::LowCornerSpeed => write!(f, "low_corner_speed"),
        }
    }
}

/// Severity bucket, derived from estimated time lost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Bucket a time loss: < 0.1s low, 0.1-0.3s medium, > 0.3s high
    pub fn from_time_lost(time_lost: f64) -> Self {
        if time_lost < 0.1 {
            Severity::Low
        } else if time_lost <= 0.3 {
            Severity::Medium
        } else {
            Severity::High
        }
    }
}

/// A detected driving error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mistake {
    pub sector: u8,
    #[serde(rename = "type")]
    pub kind: MistakeType,
    pub severity: Severity,
    pub description: String,
    /// Estimated time lost in seconds
    pub time_lost: f64,
}

impl Mistake {
    /// Create a mistake; severity always follows from `time_lost`
    pub fn new(sector: u8, kind: MistakeType, time_lost: f64, description: impl Into<String>) -> Self {
        let time_lost = round_to(time_lost, 3);
        Self {
            sector,
            kind,
            severity: Severity::from_time_lost(time_lost),
            description: description.into(),
            time_lost,
        }
    }
}

/// Complete analysis of one lap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapAnalysis {
    pub lap_number: u32,
    pub predicted_lap_time: f64,
    pub actual_lap_time: f64,
    /// actual - predicted; positive means slower than predicted
    pub delta: f64,
    pub performance_score: f64,
    /// Most significant first
    pub feedback: Vec<String>,
    pub sector_times: BTreeMap<u8, f64>,
    /// Detection order
    pub mistakes_detected: Vec<Mistake>,
    pub created_at: DateTime<Utc>,
}

/// Predicted lap time with its uncertainty and feature weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predicted_time: f64,
    pub confidence_interval: (f64, f64),
    pub key_factors: BTreeMap<String, f64>,
}

/// Listing entry for a stored lap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapSummary {
    pub lap_number: u32,
    pub lap_time: Option<f64>,
    pub data_points: usize,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Helper to construct a valid sample for testing
    pub(crate) fn make_sample(sector: u8, timestamp: f64) -> TelemetrySample {
        TelemetrySample {
            lap_number: 12,
            sector,
            timestamp: Seconds(timestamp),
            speed: KilometersPerHour(287.5),
            throttle: Percent(98.0),
            brake: Percent(0.0),
            steering_angle: Degrees(-15.3),
            gear: 7,
            tire_compound: TireCompound::Soft,
            tire_wear: Percent(34.2),
            track_temperature: Celsius(42.5),
            lap_time: None,
        }
    }

    #[test]
    fn test_sample_validate_accepts_realistic_values() {
        assert!(make_sample(2, 23.45).validate().is_ok());
    }

    #[test]
    fn test_sample_validate_rejects_out_of_range_fields() {
        let mut s = make_sample(1, 0.0);
        s.sector = 4;
        assert!(matches!(
            s.validate(),
            Err(AnalysisError::InvalidParameter { field: "sector", .. })
        ));

        let mut s = make_sample(1, 0.0);
        s.speed = KilometersPerHour(401.0);
        assert!(matches!(
            s.validate(),
            Err(AnalysisError::InvalidParameter { field: "speed", .. })
        ));

        let mut s = make_sample(1, 0.0);
        s.gear = 9;
        assert!(matches!(
            s.validate(),
            Err(AnalysisError::InvalidParameter { field: "gear", .. })
        ));

        let mut s = make_sample(1, -0.1);
        s.timestamp = Seconds(-0.1);
        assert!(matches!(
            s.validate(),
            Err(AnalysisError::InvalidParameter { field: "timestamp", .. })
        ));

        let mut s = make_sample(1, 0.0);
        s.lap_number = 0;
        assert!(matches!(
            s.validate(),
            Err(AnalysisError::InvalidParameter { field: "lap_number", .. })
        ));
    }

    #[test]
    fn test_sample_deserializes_from_upload_json() {
        let json = r#"{
            "lap_number": 12,
            "sector": 2,
            "timestamp": 23.45,
            "speed": 287.5,
            "throttle": 98.0,
            "brake": 0.0,
            "steering_angle": -15.3,
            "gear": 7,
            "tire_compound": "soft",
            "tire_wear": 34.2,
            "track_temperature": 42.5,
            "lap_time": 89.234
        }"#;
        let sample: TelemetrySample = serde_json::from_str(json).unwrap();
        assert_eq!(sample.sector, 2);
        assert_eq!(sample.tire_compound, TireCompound::Soft);
        assert_eq!(sample.lap_time, Some(Seconds(89.234)));
    }

    #[test]
    fn test_sample_lap_time_defaults_to_none() {
        let json = r#"{"lap_number":1,"sector":1,"timestamp":0.0,"speed":120.0,
            "throttle":50.0,"brake":0.0,"steering_angle":0.0,"gear":3,
            "tire_compound":"hard","tire_wear":2.0,"track_temperature":30.0}"#;
        let sample: TelemetrySample = serde_json::from_str(json).unwrap();
        assert_eq!(sample.lap_time, None);
    }

    #[test]
    fn test_tire_compound_parse_case_insensitive() {
        assert_eq!("Soft".parse::<TireCompound>().unwrap(), TireCompound::Soft);
        assert_eq!(" HARD ".parse::<TireCompound>().unwrap(), TireCompound::Hard);
        assert!(matches!(
            "intermediate".parse::<TireCompound>(),
            Err(AnalysisError::InvalidParameter { field: "tire_compound", .. })
        ));
    }

    #[test]
    fn test_severity_buckets() {
        assert_eq!(Severity::from_time_lost(0.05), Severity::Low);
        assert_eq!(Severity::from_time_lost(0.1), Severity::Medium);
        assert_eq!(Severity::from_time_lost(0.3), Severity::Medium);
        assert_eq!(Severity::from_time_lost(0.31), Severity::High);
    }

    #[test]
    fn test_mistake_serializes_type_field() {
        let mistake = Mistake::new(2, MistakeType::LateBraking, 0.234, "Braking point late at Turn 7");
        let json = serde_json::to_value(&mistake).unwrap();
        assert_eq!(json["type"], "late_braking");
        assert_eq!(json["severity"], "medium");
        assert_eq!(json["sector"], 2);
    }

    #[test]
    fn test_prediction_result_interval_serializes_as_array() {
        let result = PredictionResult {
            predicted_time: 88.456,
            confidence_interval: (87.9, 89.0),
            key_factors: BTreeMap::from([("tire_wear".to_string(), 1.0)]),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json["confidence_interval"].is_array());
        assert_eq!(json["confidence_interval"][0], 87.9);
    }
}
