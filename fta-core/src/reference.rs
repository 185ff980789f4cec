//! Reference lap built from a set of recorded laps
//!
//! Gives the detector something better than fixed expectations: the best
//! corner speeds the driver has actually managed, and where they braked on
//! their fastest lap.

use crate::detect::braking_events;
use crate::model::TelemetrySample;
use crate::segment::SectorMap;
use crate::source::recorded_lap_time;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReferenceLap {
    /// Sector -> highest minimum speed seen across all laps
    pub best_min_speeds: BTreeMap<u8, f64>,
    /// Sector -> heavy braking onsets of the fastest lap, in seconds from sector start
    pub braking_onsets: BTreeMap<u8, Vec<f64>>,
    /// Lap the braking onsets were taken from
    pub fastest_lap: Option<u32>,
}

impl ReferenceLap {
    /// Summarize laps whose samples are already ordered by timestamp
    ///
    /// `heavy_brake_pct` should match the late braking threshold so onsets
    /// are comparable.
    pub fn from_laps<'a, I>(laps: I, heavy_brake_pct: f64) -> Self
    where
        I: IntoIterator<Item = &'a [TelemetrySample]>,
    {
        let mut reference = Self::default();
        let mut fastest: Option<(f64, &'a [TelemetrySample])> = None;

        for samples in laps {
            let Some(first) = samples.first() else {
                continue;
            };
            let Ok(sectors) = SectorMap::build(first.lap_number, samples) else {
                continue;
            };

            for sector in sectors.iter() {
                let min_speed = sector.min_speed();
                reference
                    .best_min_speeds
                    .entry(sector.number)
                    .and_modify(|best| *best = best.max(min_speed))
                    .or_insert(min_speed);
            }

            if let Some(time) = recorded_lap_time(samples).filter(|t| *t > 0.0) {
                if fastest.map_or(true, |(best, _)| time < best) {
                    fastest = Some((time, samples));
                }
            }
        }

        if let Some((_, samples)) = fastest {
            reference.fastest_lap = samples.first().map(|s| s.lap_number);
            if let Ok(sectors) = SectorMap::build(samples[0].lap_number, samples) {
                for event in braking_events(samples, heavy_brake_pct) {
                    let onset = &samples[event.onset];
                    let start = sectors.get(onset.sector).map(|s| s.start()).unwrap_or(0.0);
                    reference
                        .braking_onsets
                        .entry(onset.sector)
                        .or_default()
                        .push(onset.timestamp.0 - start);
                }
            }
        }

        reference
    }

    pub fn best_min_speed(&self, sector: u8) -> Option<f64> {
        self.best_min_speeds.get(&sector).copied()
    }

    /// Reference onset closest to `offset` seconds into `sector`
    pub fn nearest_braking_onset(&self, sector: u8, offset: f64) -> Option<f64> {
        self.braking_onsets
            .get(&sector)?
            .iter()
            .copied()
            .min_by(|a, b| (a - offset).abs().total_cmp(&(b - offset).abs()))
    }
}
