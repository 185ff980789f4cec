//! F1 Telemetry Analyzer Core Library
//!
//! This crate provides the lap sample model and the deterministic analysis
//! engine: sector segmentation, lap time prediction, mistake detection and
//! performance scoring. It does no I/O beyond loading an optional model
//! artifact.

pub mod analyze;
pub mod config;
pub mod detect;
pub mod error;
pub mod linear;
pub mod model;
pub mod predict;
pub mod reference;
pub mod score;
pub mod segment;
pub mod source;
pub mod units;

pub use analyze::LapAnalyzer;
pub use config::AnalysisConfig;
pub use detect::DetectorThresholds;
pub use error::{AnalysisError, Result};
pub use model::{
    LapAnalysis, LapSummary, Mistake, MistakeType, PredictionResult, Severity, TelemetrySample,
    TireCompound,
};
pub use predict::{HeuristicModel, LapConditions, LapTimeModel, PredictionSource, Predictor};
pub use reference::ReferenceLap;
pub use score::ScoringWeights;
pub use source::LapSource;
