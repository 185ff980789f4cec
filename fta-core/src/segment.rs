//! Sector segmentation
//!
//! Groups a lap's ordered samples by their `sector` field. The groups double
//! as the sector boundaries the mistake detector attributes findings to.

use crate::error::{AnalysisError, Result};
use crate::model::TelemetrySample;
use crate::units::round_to;
use std::collections::BTreeMap;

/// Samples belonging to one sector, in lap order
#[derive(Debug, Clone)]
pub struct Sector<'a> {
    pub number: u8,
    pub samples: Vec<&'a TelemetrySample>,
}

impl<'a> Sector<'a> {
    /// First timestamp in the sector
    pub fn start(&self) -> f64 {
        self.samples
            .iter()
            .map(|s| s.timestamp.0)
            .fold(f64::INFINITY, f64::min)
    }

    /// Last timestamp in the sector
    pub fn end(&self) -> f64 {
        self.samples
            .iter()
            .map(|s| s.timestamp.0)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// max(timestamp) - min(timestamp); zero for a single sample
    pub fn duration(&self) -> f64 {
        self.end() - self.start()
    }

    /// Lowest speed seen in the sector (typically the slowest apex)
    pub fn min_speed(&self) -> f64 {
        self.samples
            .iter()
            .map(|s| s.speed.0)
            .fold(f64::INFINITY, f64::min)
    }
}

/// Lap samples partitioned by sector number
#[derive(Debug, Clone)]
pub struct SectorMap<'a> {
    sectors: Vec<Sector<'a>>,
}

impl<'a> SectorMap<'a> {
    /// Partition samples by sector, preserving their order within each sector
    pub fn build(lap_number: u32, samples: &'a [TelemetrySample]) -> Result<Self> {
        if samples.is_empty() {
            return Err(AnalysisError::EmptyLapData { lap: lap_number });
        }

        let mut grouped: BTreeMap<u8, Vec<&'a TelemetrySample>> = BTreeMap::new();
        for sample in samples {
            grouped.entry(sample.sector).or_default().push(sample);
        }

        let sectors = grouped
            .into_iter()
            .map(|(number, samples)| Sector { number, samples })
            .collect();

        Ok(Self { sectors })
    }

    /// Sectors in ascending order
    pub fn iter(&self) -> impl Iterator<Item = &Sector<'a>> {
        self.sectors.iter()
    }

    pub fn get(&self, number: u8) -> Option<&Sector<'a>> {
        self.sectors.iter().find(|s| s.number == number)
    }

    /// Sector number -> elapsed seconds, rounded to milliseconds
    pub fn durations(&self) -> BTreeMap<u8, f64> {
        self.sectors
            .iter()
            .map(|s| (s.number, round_to(s.duration(), 3)))
            .collect()
    }
}

/// Sector number -> elapsed seconds for one lap's samples
pub fn sector_times(lap_number: u32, samples: &[TelemetrySample]) -> Result<BTreeMap<u8, f64>> {
    Ok(SectorMap::build(lap_number, samples)?.durations())
}
