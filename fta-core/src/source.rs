//! Telemetry source trait definition

use crate::error::Result;
use crate::model::TelemetrySample;

/// Read contract for wherever lap samples are stored
///
/// Each source is responsible for:
/// - Returning a lap's samples ordered by timestamp
/// - Distinguishing an unknown lap (`LapNotFound`) from a known lap that
///   has no samples (an empty list, reported by analysis as `EmptyLapData`)
pub trait LapSource: Send + Sync {
    /// Fetch the ordered samples for a lap
    ///
    /// Returns:
    /// - `Ok(samples)` for a known lap (possibly empty)
    /// - `Err(LapNotFound)` if the lap number is unknown
    fn lap_samples(&self, lap_number: u32) -> Result<Vec<TelemetrySample>>;

    /// Actual recorded lap time, if any sample carries one
    fn recorded_lap_time(&self, lap_number: u32) -> Option<f64> {
        self.lap_samples(lap_number)
            .ok()
            .and_then(|samples| recorded_lap_time(&samples))
    }
}

/// The lap time embedded in a lap's samples (the last sample that carries one)
pub fn recorded_lap_time(samples: &[TelemetrySample]) -> Option<f64> {
    samples.iter().rev().find_map(|s| s.lap_time).map(|t| t.0)
}
