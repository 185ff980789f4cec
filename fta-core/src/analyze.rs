//! Lap analysis pipeline
//!
//! validate -> order -> segment -> predict -> detect -> score -> feedback

use crate::config::AnalysisConfig;
use crate::detect::{detect_mistakes, DetectorThresholds, LapContext};
use crate::error::{AnalysisError, Result};
use crate::model::{LapAnalysis, TelemetrySample};
use crate::predict::{LapConditions, Predictor};
use crate::reference::ReferenceLap;
use crate::score::ScoringWeights;
use crate::segment::SectorMap;
use crate::source::{recorded_lap_time, LapSource};
use crate::units::round_to;
use chrono::Utc;
use std::path::Path;
use tracing::debug;

/// Stateless lap analyzer, safe to share across request handlers
#[derive(Debug, Clone, Default)]
pub struct LapAnalyzer {
    predictor: Predictor,
    thresholds: DetectorThresholds,
    scoring: ScoringWeights,
}

impl LapAnalyzer {
    /// Fails with `InvalidParameter` if a threshold or weight is out of range
    pub fn new(
        predictor: Predictor,
        thresholds: DetectorThresholds,
        scoring: ScoringWeights,
    ) -> Result<Self> {
        thresholds.validate()?;
        scoring.validate()?;
        Ok(Self {
            predictor,
            thresholds,
            scoring,
        })
    }

    /// Build from config, loading the model artifact if given
    pub fn from_config(config: &AnalysisConfig, model_path: Option<&Path>) -> Result<Self> {
        config.heuristic.validate()?;
        Self::new(
            Predictor::load(model_path, config.heuristic.clone()),
            config.thresholds.clone(),
            config.scoring.clone(),
        )
    }

    pub fn predictor(&self) -> &Predictor {
        &self.predictor
    }

    /// Summarize laps into a reference using this analyzer's braking threshold
    pub fn reference_lap<'a, I>(&self, laps: I) -> ReferenceLap
    where
        I: IntoIterator<Item = &'a [TelemetrySample]>,
    {
        ReferenceLap::from_laps(laps, self.thresholds.late_braking.brake_pct)
    }

    /// Analyze one lap against configured expectations
    pub fn analyze(
        &self,
        lap_number: u32,
        samples: &[TelemetrySample],
        actual_lap_time: Option<f64>,
    ) -> Result<LapAnalysis> {
        self.analyze_with_reference(lap_number, samples, actual_lap_time, None)
    }

    /// Analyze one lap, comparing against a reference lap when given
    pub fn analyze_with_reference(
        &self,
        lap_number: u32,
        samples: &[TelemetrySample],
        actual_lap_time: Option<f64>,
        reference: Option<&ReferenceLap>,
    ) -> Result<LapAnalysis> {
        if samples.is_empty() {
            return Err(AnalysisError::EmptyLapData { lap: lap_number });
        }
        for sample in samples {
            sample.validate()?;
            if sample.lap_number != lap_number {
                return Err(AnalysisError::invalid(
                    "lap_number",
                    format!(
                        "sample belongs to lap {} but lap {} was requested",
                        sample.lap_number, lap_number
                    ),
                ));
            }
        }

        let actual = actual_lap_time
            .or_else(|| recorded_lap_time(samples))
            .ok_or(AnalysisError::MissingLapTime { lap: lap_number })?;
        if !actual.is_finite() || actual <= 0.0 {
            return Err(AnalysisError::invalid(
                "actual_lap_time",
                format!("{} is not a positive lap time", actual),
            ));
        }

        let mut ordered = samples.to_vec();
        ordered.sort_by(|a, b| a.timestamp.0.total_cmp(&b.timestamp.0));
        let samples = ordered.as_slice();

        let sectors = SectorMap::build(lap_number, samples)?;

        let first = &samples[0];
        let avg_speed = samples.iter().map(|s| s.speed.0).sum::<f64>() / samples.len() as f64;
        let conditions = LapConditions::new(
            first.tire_compound,
            first.tire_wear.0,
            first.track_temperature.0,
            Some(avg_speed),
        )?;
        let prediction = self.predictor.predict_conditions(&conditions);

        let ctx = LapContext {
            lap_number,
            samples,
            sectors: &sectors,
            reference,
        };
        let mistakes = detect_mistakes(&ctx, &self.thresholds);

        let predicted = prediction.predicted_time;
        let delta = round_to(actual - predicted, 3);
        let performance_score = self.scoring.score(predicted, delta, &mistakes);

        let mut feedback = Vec::with_capacity(mistakes.len() + 1);
        feedback.push(if delta > 0.0 {
            format!("Time loss detected: {:.3}s slower than predicted optimal", delta)
        } else {
            format!("Lap faster than predicted: {:.3}s under predicted optimal", delta.abs())
        });
        feedback.extend(mistakes.iter().map(|m| m.description.clone()));

        debug!(
            "Analyzed lap {}: actual {:.3}s, predicted {:.3}s ({:?}), {} mistakes, score {:.1}",
            lap_number,
            actual,
            predicted,
            self.predictor.source(),
            mistakes.len(),
            performance_score
        );

        Ok(LapAnalysis {
            lap_number,
            predicted_lap_time: predicted,
            actual_lap_time: round_to(actual, 3),
            delta,
            performance_score,
            feedback,
            sector_times: sectors.durations(),
            mistakes_detected: mistakes,
            created_at: Utc::now(),
        })
    }

    /// Fetch a lap from a source and analyze it
    ///
    /// Without an explicit lap time, the source's recorded time is used.
    pub fn analyze_from_source(
        &self,
        source: &dyn LapSource,
        lap_number: u32,
        actual_lap_time: Option<f64>,
    ) -> Result<LapAnalysis> {
        let samples = source.lap_samples(lap_number)?;
        let actual_lap_time = actual_lap_time.or_else(|| source.recorded_lap_time(lap_number));
        self.analyze(lap_number, &samples, actual_lap_time)
    }
}
