//! In-memory lap store

use fta_core::error::{AnalysisError, Result};
use fta_core::source::recorded_lap_time;
use fta_core::{LapAnalyzer, LapSource, LapSummary, ReferenceLap, TelemetrySample};
use serde::Serialize;
use std::collections::BTreeMap;

/// Result of storing a batch of samples
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsertSummary {
    /// Laps touched by the batch, ascending
    pub lap_numbers: Vec<u32>,
    pub data_points_stored: usize,
}

/// Lap number -> samples ordered by timestamp
#[derive(Debug, Clone, Default)]
pub struct LapStore {
    laps: BTreeMap<u32, Vec<TelemetrySample>>,
}

impl LapStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store a batch; nothing is stored if any sample is invalid
    pub fn insert_batch(&mut self, samples: Vec<TelemetrySample>) -> Result<InsertSummary> {
        for (index, sample) in samples.iter().enumerate() {
            sample.validate().map_err(|e| match e {
                AnalysisError::InvalidParameter { field, reason } => AnalysisError::InvalidParameter {
                    field,
                    reason: format!("record {}: {}", index, reason),
                },
                other => other,
            })?;
        }

        let data_points_stored = samples.len();
        let mut touched = Vec::new();
        for sample in samples {
            if !touched.contains(&sample.lap_number) {
                touched.push(sample.lap_number);
            }
            self.laps.entry(sample.lap_number).or_default().push(sample);
        }

        touched.sort_unstable();
        for lap in &touched {
            if let Some(samples) = self.laps.get_mut(lap) {
                // Stable, so samples with equal timestamps keep arrival order
                samples.sort_by(|a, b| a.timestamp.0.total_cmp(&b.timestamp.0));
            }
        }

        Ok(InsertSummary {
            lap_numbers: touched,
            data_points_stored,
        })
    }

    pub fn summaries(&self) -> Vec<LapSummary> {
        self.laps
            .iter()
            .map(|(lap, samples)| LapSummary {
                lap_number: *lap,
                lap_time: recorded_lap_time(samples),
                data_points: samples.len(),
            })
            .collect()
    }

    /// Remove a lap, returning its samples
    pub fn remove(&mut self, lap_number: u32) -> Option<Vec<TelemetrySample>> {
        self.laps.remove(&lap_number)
    }

    pub fn lap_count(&self) -> usize {
        self.laps.len()
    }

    pub fn total_points(&self) -> usize {
        self.laps.values().map(Vec::len).sum()
    }

    /// Reference for analyzing `lap_number`, built from every other stored lap
    ///
    /// A lap is never its own reference, so with nothing else stored the
    /// reference is empty and the configured expectations apply.
    pub fn reference_for(&self, analyzer: &LapAnalyzer, lap_number: u32) -> ReferenceLap {
        analyzer.reference_lap(
            self.laps
                .iter()
                .filter(|(lap, _)| **lap != lap_number)
                .map(|(_, samples)| samples.as_slice()),
        )
    }
}

impl LapSource for LapStore {
    fn lap_samples(&self, lap_number: u32) -> Result<Vec<TelemetrySample>> {
        self.laps
            .get(&lap_number)
            .cloned()
            .ok_or(AnalysisError::LapNotFound { lap: lap_number })
    }

    fn recorded_lap_time(&self, lap_number: u32) -> Option<f64> {
        self.laps.get(&lap_number).and_then(|s| recorded_lap_time(s))
    }
}
