//! Telemetry upload parsing
//!
//! Accepts the shapes the logger and the upload script produce:
//!
//! - a JSON array of samples
//! - `{ "data_points": [...] }`
//! - NDJSON, one sample per line

use anyhow::{Context, Result};
use fta_core::TelemetrySample;
use serde::Deserialize;

/// Body of a JSON upload request
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UploadRequest {
    pub data_points: Vec<TelemetrySample>,
}

#[derive(Deserialize)]
struct Envelope {
    data_points: Vec<serde_json::Value>,
}

/// Parse and validate samples from any supported text format
pub fn parse_samples(text: &str) -> Result<Vec<TelemetrySample>> {
    let trimmed = text.trim_start();

    let records: Vec<serde_json::Value> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).context("failed to parse JSON array")?
    } else if let Ok(envelope) = serde_json::from_str::<Envelope>(trimmed) {
        envelope.data_points
    } else {
        trimmed
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line).with_context(|| format!("line {}: invalid JSON", n + 1))
            })
            .collect::<Result<_>>()?
    };

    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let sample: TelemetrySample = serde_json::from_value(record)
                .with_context(|| format!("record {}: not a telemetry sample", index))?;
            sample
                .validate()
                .with_context(|| format!("record {}: failed validation", index))?;
            Ok(sample)
        })
        .collect()
}
