//! Driving mistake detection
//!
//! Detection is a fixed, ordered list of independent passes. Each pass is a
//! pure function over the lap's ordered samples and sector groups, and may
//! emit any number of [`Mistake`]s. Results are concatenated in pass order,
//! then in lap order within a pass, so identical input always produces an
//! identical list.
//!
//! Every mistake is attributed to the sector of the sample that triggered it.

use crate::error::{AnalysisError, Result};
use crate::model::{Mistake, MistakeType, TelemetrySample, TireCompound};
use crate::reference::ReferenceLap;
use crate::segment::SectorMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything a detection pass may look at
pub struct LapContext<'a> {
    pub lap_number: u32,
    /// Ordered by timestamp
    pub samples: &'a [TelemetrySample],
    pub sectors: &'a SectorMap<'a>,
    pub reference: Option<&'a ReferenceLap>,
}

/// A single heuristic pass
pub type DetectionPass = fn(&LapContext<'_>, &DetectorThresholds) -> Vec<Mistake>;

/// Passes in the order their findings are reported
pub const PASSES: [(MistakeType, DetectionPass); 5] = [
    (MistakeType::LateBraking, late_braking),
    (MistakeType::ThrottleInconsistency, throttle_inconsistency),
    (MistakeType::ThrottleLift, throttle_lift),
    (MistakeType::TireDegradation, tire_degradation),
    (MistakeType::LowCornerSpeed, low_corner_speed),
];

/// Run every pass over one lap
pub fn detect_mistakes(ctx: &LapContext<'_>, thresholds: &DetectorThresholds) -> Vec<Mistake> {
    PASSES
        .iter()
        .flat_map(|(_, pass)| pass(ctx, thresholds))
        .collect()
}

// =============================================================================
// Thresholds
// =============================================================================

/// Tunable thresholds for all passes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorThresholds {
    pub late_braking: LateBrakingThresholds,
    pub throttle_inconsistency: ThrottleInconsistencyThresholds,
    pub throttle_lift: ThrottleLiftThresholds,
    pub tire_degradation: TireDegradationThresholds,
    pub corner_speed: CornerSpeedThresholds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LateBrakingThresholds {
    /// Brake pressure (%) above which braking counts as heavy
    pub brake_pct: f64,
    /// Entry speed (km/h) above which heavy braking counts as late
    pub entry_speed: f64,
    /// Time lost when there is no reference braking point
    pub default_loss: f64,
    /// Seconds lost per second later than the reference braking point
    pub loss_per_second_late: f64,
    pub min_loss: f64,
    pub max_loss: f64,
}

impl Default for LateBrakingThresholds {
    fn default() -> Self {
        Self {
            brake_pct: 80.0,
            entry_speed: 250.0,
            default_loss: 0.2,
            loss_per_second_late: 0.5,
            min_loss: 0.1,
            max_loss: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleInconsistencyThresholds {
    /// Percentage-point drop between consecutive samples that counts as sudden
    pub drop_pct: f64,
    /// Longest gap (seconds) between the two samples of a drop
    pub window: f64,
    /// Brake pressure at which a lift is a normal lift-to-brake and not
    /// counted; `null` counts every drop
    pub brake_application_pct: Option<f64>,
    pub min_drops: usize,
    pub loss_per_drop: f64,
    pub loss_per_excess_pct: f64,
    pub max_loss: f64,
}

impl Default for ThrottleInconsistencyThresholds {
    fn default() -> Self {
        Self {
            drop_pct: 30.0,
            window: 0.5,
            brake_application_pct: Some(10.0),
            min_drops: 2,
            loss_per_drop: 0.04,
            loss_per_excess_pct: 0.002,
            max_loss: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleLiftThresholds {
    /// Sustained speed (km/h) that marks a full-throttle zone
    pub zone_speed: f64,
    /// Minimum gear in a full-throttle zone
    pub zone_gear: u8,
    /// Minimum zone length in seconds
    pub min_zone_duration: f64,
    /// Throttle (%) the driver is expected to reach in the zone
    pub full_throttle_pct: f64,
    pub loss_factor: f64,
    pub min_loss: f64,
    pub max_loss: f64,
}

impl Default for ThrottleLiftThresholds {
    fn default() -> Self {
        Self {
            zone_speed: 250.0,
            zone_gear: 7,
            min_zone_duration: 1.0,
            full_throttle_pct: 90.0,
            loss_factor: 0.5,
            min_loss: 0.05,
            max_loss: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TireDegradationThresholds {
    /// Mean wear (%) above which each compound is considered degraded
    pub soft_wear_limit: f64,
    pub medium_wear_limit: f64,
    pub hard_wear_limit: f64,
    /// Corner speed reduction (%) versus baseline that confirms degradation
    pub corner_speed_drop_pct: f64,
    pub base_loss: f64,
    pub loss_per_wear_pct: f64,
    pub max_loss: f64,
}

impl Default for TireDegradationThresholds {
    fn default() -> Self {
        Self {
            soft_wear_limit: 40.0,
            medium_wear_limit: 60.0,
            hard_wear_limit: 75.0,
            corner_speed_drop_pct: 2.0,
            base_loss: 0.15,
            loss_per_wear_pct: 0.01,
            max_loss: 0.6,
        }
    }
}

impl TireDegradationThresholds {
    pub fn wear_limit(&self, compound: TireCompound) -> f64 {
        match compound {
            TireCompound::Soft => self.soft_wear_limit,
            TireCompound::Medium => self.medium_wear_limit,
            TireCompound::Hard => self.hard_wear_limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CornerSpeedThresholds {
    /// Expected minimum speed (km/h) per sector when no reference lap exists
    pub expected_min_speeds: BTreeMap<u8, f64>,
    pub default_expected_min_speed: f64,
    /// How far (km/h) below expected the minimum must fall to be flagged
    pub margin: f64,
    pub loss_per_kph: f64,
    pub min_loss: f64,
    pub max_loss: f64,
}

impl Default for CornerSpeedThresholds {
    fn default() -> Self {
        Self {
            expected_min_speeds: BTreeMap::from([(1, 120.0), (2, 100.0), (3, 140.0)]),
            default_expected_min_speed: 120.0,
            margin: 15.0,
            loss_per_kph: 0.01,
            min_loss: 0.05,
            max_loss: 0.8,
        }
    }
}

/// Smallest time loss a mistake can report after rounding to milliseconds
const MIN_TIME_LOST: f64 = 0.001;

impl DetectorThresholds {
    /// Check every threshold so each pass reports a positive time loss
    pub fn validate(&self) -> Result<()> {
        let (lb, ti, tl, td, cs) = (
            &self.late_braking,
            &self.throttle_inconsistency,
            &self.throttle_lift,
            &self.tire_degradation,
            &self.corner_speed,
        );

        let non_negative = [
            ("thresholds.late_braking.entry_speed", lb.entry_speed),
            ("thresholds.late_braking.default_loss", lb.default_loss),
            ("thresholds.late_braking.loss_per_second_late", lb.loss_per_second_late),
            ("thresholds.throttle_inconsistency.window", ti.window),
            ("thresholds.throttle_inconsistency.loss_per_excess_pct", ti.loss_per_excess_pct),
            ("thresholds.throttle_lift.zone_speed", tl.zone_speed),
            ("thresholds.throttle_lift.min_zone_duration", tl.min_zone_duration),
            ("thresholds.throttle_lift.loss_factor", tl.loss_factor),
            ("thresholds.tire_degradation.corner_speed_drop_pct", td.corner_speed_drop_pct),
            ("thresholds.tire_degradation.loss_per_wear_pct", td.loss_per_wear_pct),
            ("thresholds.corner_speed.default_expected_min_speed", cs.default_expected_min_speed),
            ("thresholds.corner_speed.margin", cs.margin),
            ("thresholds.corner_speed.loss_per_kph", cs.loss_per_kph),
        ];
        for (field, value) in non_negative {
            AnalysisError::check_range(field, value, 0.0, f64::MAX)?;
        }
        for speed in cs.expected_min_speeds.values() {
            AnalysisError::check_range("thresholds.corner_speed.expected_min_speeds", *speed, 0.0, f64::MAX)?;
        }

        // Floors of each pass's time loss
        let floors = [
            ("thresholds.late_braking.min_loss", lb.min_loss),
            ("thresholds.throttle_inconsistency.loss_per_drop", ti.loss_per_drop),
            ("thresholds.throttle_lift.min_loss", tl.min_loss),
            ("thresholds.tire_degradation.base_loss", td.base_loss),
            ("thresholds.corner_speed.min_loss", cs.min_loss),
        ];
        for (field, value) in floors {
            AnalysisError::check_range(field, value, MIN_TIME_LOST, f64::MAX)?;
        }

        // clamp() panics when min > max
        let bounds = [
            ("thresholds.late_braking.max_loss", lb.min_loss, lb.max_loss),
            ("thresholds.throttle_inconsistency.max_loss", MIN_TIME_LOST, ti.max_loss),
            ("thresholds.throttle_lift.max_loss", tl.min_loss, tl.max_loss),
            ("thresholds.tire_degradation.max_loss", MIN_TIME_LOST, td.max_loss),
            ("thresholds.corner_speed.max_loss", cs.min_loss, cs.max_loss),
        ];
        for (field, min, max) in bounds {
            if max.is_nan() || max < min {
                return Err(AnalysisError::invalid(field, format!("{} is below the minimum {}", max, min)));
            }
        }

        let percentages = [
            ("thresholds.late_braking.brake_pct", lb.brake_pct),
            ("thresholds.throttle_inconsistency.drop_pct", ti.drop_pct),
            (
                "thresholds.throttle_inconsistency.brake_application_pct",
                ti.brake_application_pct.unwrap_or(0.0),
            ),
            ("thresholds.throttle_lift.full_throttle_pct", tl.full_throttle_pct),
            ("thresholds.tire_degradation.soft_wear_limit", td.soft_wear_limit),
            ("thresholds.tire_degradation.medium_wear_limit", td.medium_wear_limit),
            ("thresholds.tire_degradation.hard_wear_limit", td.hard_wear_limit),
        ];
        for (field, value) in percentages {
            AnalysisError::check_range(field, value, 0.0, 100.0)?;
        }

        Ok(())
    }

    /// Expected minimum speed for a sector: reference lap first, then configuration
    pub fn expected_min_speed(&self, sector: u8, reference: Option<&ReferenceLap>) -> f64 {
        reference
            .and_then(|r| r.best_min_speed(sector))
            .or_else(|| self.corner_speed.expected_min_speeds.get(&sector).copied())
            .unwrap_or(self.corner_speed.default_expected_min_speed)
    }
}

// =============================================================================
// Passes
// =============================================================================

/// A run of consecutive heavy-braking samples
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BrakingEvent {
    /// Index of the first heavy-braking sample
    pub onset: usize,
    /// Highest of the onset speed and the speed immediately before it
    pub entry_speed: f64,
}

/// Find heavy braking runs (brake above `brake_pct`) in lap order
pub(crate) fn braking_events(samples: &[TelemetrySample], brake_pct: f64) -> Vec<BrakingEvent> {
    let mut events = Vec::new();
    let mut i = 0;
    while i < samples.len() {
        if samples[i].brake.0 <= brake_pct {
            i += 1;
            continue;
        }

        let onset = i;
        let prior_speed = if onset > 0 {
            samples[onset - 1].speed.0
        } else {
            samples[onset].speed.0
        };
        events.push(BrakingEvent {
            onset,
            entry_speed: prior_speed.max(samples[onset].speed.0),
        });

        while i < samples.len() && samples[i].brake.0 > brake_pct {
            i += 1;
        }
    }
    events
}

/// Seconds from the start of the sample's sector
fn sector_offset(ctx: &LapContext<'_>, sample: &TelemetrySample) -> f64 {
    let start = ctx
        .sectors
        .get(sample.sector)
        .map(|s| s.start())
        .unwrap_or(0.0);
    sample.timestamp.0 - start
}

/// Heavy braking that starts from very high speed
pub fn late_braking(ctx: &LapContext<'_>, thresholds: &DetectorThresholds) -> Vec<Mistake> {
    let th = &thresholds.late_braking;

    braking_events(ctx.samples, th.brake_pct)
        .into_iter()
        .filter(|event| event.entry_speed > th.entry_speed)
        .map(|event| {
            let onset = &ctx.samples[event.onset];
            let offset = sector_offset(ctx, onset);
            let reference_onset = ctx
                .reference
                .and_then(|r| r.nearest_braking_onset(onset.sector, offset));

            let (time_lost, detail) = match reference_onset {
                Some(reference) => {
                    let late_by = (offset - reference).max(0.0);
                    (
                        th.min_loss + th.loss_per_second_late * late_by,
                        format!(", {:.2}s after the reference braking point", late_by),
                    )
                }
                None => (th.default_loss, String::new()),
            };

            Mistake::new(
                onset.sector,
                MistakeType::LateBraking,
                time_lost.clamp(th.min_loss, th.max_loss),
                format!(
                    "Late braking detected in Sector {} - braking from {:.0} km/h{}",
                    onset.sector, event.entry_speed, detail
                ),
            )
        })
        .collect()
}

/// Repeated sudden throttle drops that are not lifts for braking
pub fn throttle_inconsistency(
    ctx: &LapContext<'_>,
    thresholds: &DetectorThresholds,
) -> Vec<Mistake> {
    let th = &thresholds.throttle_inconsistency;

    let drops: Vec<(u8, f64)> = ctx
        .samples
        .windows(2)
        .filter_map(|pair| {
            let (before, after) = (&pair[0], &pair[1]);
            let drop = before.throttle.0 - after.throttle.0;
            let gap = after.timestamp.0 - before.timestamp.0;
            let lift_to_brake = th
                .brake_application_pct
                .is_some_and(|pct| after.brake.0 >= pct);
            (drop > th.drop_pct && gap <= th.window && !lift_to_brake).then_some((after.sector, drop))
        })
        .collect();

    if drops.is_empty() || drops.len() < th.min_drops {
        return Vec::new();
    }

    let mut per_sector: BTreeMap<u8, usize> = BTreeMap::new();
    for (sector, _) in &drops {
        *per_sector.entry(*sector).or_default() += 1;
    }
    // Most drops wins; ties go to the earliest sector
    let mut sector = drops[0].0;
    let mut most = 0;
    for (&s, &count) in &per_sector {
        if count > most {
            sector = s;
            most = count;
        }
    }

    let excess: f64 = drops.iter().map(|(_, drop)| drop - th.drop_pct).sum();
    let largest = drops.iter().map(|(_, drop)| *drop).fold(0.0, f64::max);
    let time_lost =
        (th.loss_per_drop * drops.len() as f64 + th.loss_per_excess_pct * excess).min(th.max_loss);

    vec![Mistake::new(
        sector,
        MistakeType::ThrottleInconsistency,
        time_lost,
        format!(
            "Throttle inconsistency in Sector {} - {} sudden lifts detected (largest {:.0}%)",
            sector,
            drops.len(),
            largest
        ),
    )]
}

/// Full-throttle zones where the throttle never reached full application
pub fn throttle_lift(ctx: &LapContext<'_>, thresholds: &DetectorThresholds) -> Vec<Mistake> {
    let th = &thresholds.throttle_lift;
    let in_zone = |s: &TelemetrySample| s.speed.0 >= th.zone_speed && s.gear >= th.zone_gear;

    let mut mistakes = Vec::new();
    let samples = ctx.samples;
    let mut i = 0;
    while i < samples.len() {
        if !in_zone(&samples[i]) {
            i += 1;
            continue;
        }

        let start = i;
        while i < samples.len() && in_zone(&samples[i]) {
            i += 1;
        }
        let zone = &samples[start..i];

        let duration = zone[zone.len() - 1].timestamp.0 - zone[0].timestamp.0;
        if duration < th.min_zone_duration {
            continue;
        }

        let max_throttle = zone.iter().map(|s| s.throttle.0).fold(0.0, f64::max);
        if max_throttle >= th.full_throttle_pct {
            continue;
        }

        let time_lost = duration * (100.0 - max_throttle) / 100.0 * th.loss_factor;
        mistakes.push(Mistake::new(
            zone[0].sector,
            MistakeType::ThrottleLift,
            time_lost.clamp(th.min_loss, th.max_loss),
            format!(
                "Throttle lift in Sector {} - not reaching full throttle (max {:.0}%) on a {:.1}s straight",
                zone[0].sector, max_throttle, duration
            ),
        ));
    }
    mistakes
}

/// High wear confirmed by reduced corner speed
pub fn tire_degradation(ctx: &LapContext<'_>, thresholds: &DetectorThresholds) -> Vec<Mistake> {
    let th = &thresholds.tire_degradation;
    let Some(first) = ctx.samples.first() else {
        return Vec::new();
    };

    let compound = first.tire_compound;
    let mean_wear =
        ctx.samples.iter().map(|s| s.tire_wear.0).sum::<f64>() / ctx.samples.len() as f64;
    let limit = th.wear_limit(compound);
    if mean_wear <= limit {
        return Vec::new();
    }

    let mut ratios = Vec::new();
    let mut worst: Option<(u8, f64)> = None;
    for sector in ctx.sectors.iter() {
        let baseline = thresholds.expected_min_speed(sector.number, ctx.reference);
        if baseline <= 0.0 {
            continue;
        }
        // Faster than baseline counts as no reduction
        let ratio = (sector.min_speed() / baseline).min(1.0);
        ratios.push(ratio);
        let deficit = 1.0 - ratio;
        if worst.map_or(true, |(_, d)| deficit > d) {
            worst = Some((sector.number, deficit));
        }
    }

    let Some((sector, _)) = worst else {
        return Vec::new();
    };
    let mean_ratio = ratios.iter().sum::<f64>() / ratios.len() as f64;
    let reduction_pct = (1.0 - mean_ratio) * 100.0;
    if reduction_pct <= th.corner_speed_drop_pct {
        return Vec::new();
    }

    let time_lost = (th.base_loss + th.loss_per_wear_pct * (mean_wear - limit)).min(th.max_loss);
    vec![Mistake::new(
        sector,
        MistakeType::TireDegradation,
        time_lost,
        format!(
            "Significant tire degradation ({:.1}% wear on {} compound, {:.1}% corner speed lost) - consider pitting for fresh tires",
            mean_wear, compound, reduction_pct
        ),
    )]
}

/// Sector minimum speed well below the expected minimum
pub fn low_corner_speed(ctx: &LapContext<'_>, thresholds: &DetectorThresholds) -> Vec<Mistake> {
    let th = &thresholds.corner_speed;

    ctx.sectors
        .iter()
        .filter_map(|sector| {
            let expected = thresholds.expected_min_speed(sector.number, ctx.reference);
            let min_speed = sector.min_speed();
            let deficit = expected - min_speed;
            (deficit > th.margin).then(|| {
                Mistake::new(
                    sector.number,
                    MistakeType::LowCornerSpeed,
                    (deficit * th.loss_per_kph).clamp(th.min_loss, th.max_loss),
                    format!(
                        "Low corner speed in Sector {} ({:.1} km/h vs expected {:.0} km/h)",
                        sector.number, min_speed, expected
                    ),
                )
            })
        })
        .collect()
}
