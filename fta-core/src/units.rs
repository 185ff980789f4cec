//! Type-safe wrappers for physical units
//!
//! Telemetry samples carry their quantities in the units the car logger
//! uses (km/h, percent, degrees, Celsius). The newtypes keep those from
//! being mixed up inside the detector passes.
//!
//! All unit types serialize as bare numbers with 3 decimal places.

use serde::{Deserialize, Serialize};

/// Round f64 to 3 decimal places for compact JSON serialization
fn round3<S: serde::Serializer>(val: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(round_to(*val, 3))
}

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Seconds (timestamps within a lap, durations, lap times)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Seconds(#[serde(serialize_with = "round3")] pub f64);

/// Kilometers per hour
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct KilometersPerHour(#[serde(serialize_with = "round3")] pub f64);

/// Percentage (0.0 to 100.0)
///
/// Pedal positions and tire wear are logged as whole percentages, unlike
/// normalized 0..1 inputs.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Percent(#[serde(serialize_with = "round3")] pub f64);

/// Degrees (steering wheel angle, signed: + = right)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Degrees(#[serde(serialize_with = "round3")] pub f64);

/// Celsius
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Celsius(#[serde(serialize_with = "round3")] pub f64);
