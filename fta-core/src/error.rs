//! Error types for lap analysis
//!
//! The taxonomy separates "the lap does not exist" from "the lap exists but
//! cannot be analyzed" and from "the caller passed bad input", so the service
//! layer can map each to a distinct response class:
//!
//! - [`AnalysisError::LapNotFound`]: no stored samples at all (not found)
//! - [`AnalysisError::EmptyLapData`]: the sample list is empty (data error)
//! - [`AnalysisError::MissingLapTime`]: no actual lap time to compare against (bad request)
//! - [`AnalysisError::InvalidParameter`]: an input is outside its documented range (bad request)
//!
//! None of these are retryable: the same input always fails the same way.

use thiserror::Error;

/// Result type alias for analysis operations.
pub type Result<T, E = AnalysisError> = std::result::Result<T, E>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("No telemetry data found for lap {lap}")]
    LapNotFound { lap: u32 },

    #[error("Lap {lap} has no analyzable telemetry samples")]
    EmptyLapData { lap: u32 },

    #[error("Lap {lap} does not have a recorded lap time")]
    MissingLapTime { lap: u32 },

    #[error("Invalid {field}: {reason}")]
    InvalidParameter { field: &'static str, reason: String },
}

impl AnalysisError {
    /// Build an `InvalidParameter` error for a value outside `min..=max`
    pub fn out_of_range(field: &'static str, value: f64, min: f64, max: f64) -> Self {
        AnalysisError::InvalidParameter {
            field,
            reason: format!("{} is outside the allowed range {}..={}", value, min, max),
        }
    }

    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        AnalysisError::InvalidParameter {
            field,
            reason: reason.into(),
        }
    }

    /// Validate that `value` is finite and within `min..=max`
    pub fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(Self::invalid(field, format!("{} is not a finite number", value)));
        }
        if value < min || value > max {
            return Err(Self::out_of_range(field, value, min, max));
        }
        Ok(())
    }

    /// Whether the caller supplied bad input (as opposed to missing data)
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            AnalysisError::MissingLapTime { .. } | AnalysisError::InvalidParameter { .. }
        )
    }
}
