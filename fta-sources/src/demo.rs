//! Demo lap generator that produces synthetic telemetry
//!
//! Simulates laps around a three-sector circuit. Each sector runs through
//! acceleration, braking, apex and exit phases at 10Hz, with tire compound,
//! tire wear and track temperature feeding into the lap time. Output is
//! fully deterministic for a given seed, so demo sessions are reproducible
//! and usable in tests.

use fta_core::units::*;
use fta_core::{TelemetrySample, TireCompound};

/// Samples per second
pub const SAMPLE_RATE: f64 = 10.0;

// =============================================================================
// Track definition
// =============================================================================

#[derive(Clone, Copy)]
struct SectorProfile {
    max_speed: f64,    // km/h at the end of the straight
    min_speed: f64,    // km/h at the apex
    share: f64,        // fraction of the lap spent in this sector
    max_steering: f64, // peak steering angle in degrees
}

/// Sector 1: long straights into heavy braking
/// Sector 2: technical, slow corners
/// Sector 3: fast sweepers
const SECTORS: [SectorProfile; 3] = [
    SectorProfile { max_speed: 340.0, min_speed: 120.0, share: 0.33, max_steering: 120.0 },
    SectorProfile { max_speed: 280.0, min_speed: 90.0,  share: 0.34, max_steering: 180.0 },
    SectorProfile { max_speed: 320.0, min_speed: 140.0, share: 0.33, max_steering: 120.0 },
];

/// Sector that receives injected driver errors
const ERROR_SECTOR: u8 = 2;

#[derive(Clone, Copy, PartialEq, Debug)]
enum Phase {
    Accelerate, // Full throttle, building to top speed
    Braking,    // Heavy braking into the corner
    Apex,       // Partial throttle at minimum speed
    Exit,       // Aggressive throttle out of the corner
}

impl Phase {
    /// Phase and progress (0..1) within it for a position in the sector
    fn at(progress: f64) -> (Phase, f64) {
        match progress {
            p if p < 0.3 => (Phase::Accelerate, p / 0.3),
            p if p < 0.5 => (Phase::Braking, (p - 0.3) / 0.2),
            p if p < 0.7 => (Phase::Apex, (p - 0.5) / 0.2),
            p => (Phase::Exit, (p - 0.7) / 0.3),
        }
    }
}

// =============================================================================
// Lap plan
// =============================================================================

/// Conditions for one generated lap
#[derive(Debug, Clone, PartialEq)]
pub struct LapSpec {
    pub lap_number: u32,
    pub tire_compound: TireCompound,
    /// Laps completed on this set of tires
    pub tire_age: u32,
    pub track_temperature: f64,
    /// Inject a mistake in sector 2
    pub driver_error: bool,
}

impl LapSpec {
    pub fn new(lap_number: u32, tire_compound: TireCompound) -> Self {
        Self {
            lap_number,
            tire_compound,
            tire_age: 0,
            track_temperature: 42.0,
            driver_error: false,
        }
    }
}

fn compound_pace_offset(compound: TireCompound) -> f64 {
    match compound {
        TireCompound::Soft => -0.6,
        TireCompound::Medium => 0.0,
        TireCompound::Hard => 0.4,
    }
}

/// Tire wear (%) added per lap
fn wear_per_lap(compound: TireCompound) -> f64 {
    match compound {
        TireCompound::Soft => 1.8,
        TireCompound::Medium => 1.2,
        TireCompound::Hard => 0.8,
    }
}

fn smoothstep(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn speed_to_gear(kph: f64) -> u8 {
    match kph {
        x if x < 80.0 => 2,
        x if x < 120.0 => 3,
        x if x < 160.0 => 4,
        x if x < 200.0 => 5,
        x if x < 250.0 => 6,
        x if x < 300.0 => 7,
        _ => 8,
    }
}

/// Simple deterministic noise from a seed, in 0..1
fn noise(seed: f64) -> f64 {
    let x = (seed * 12.9898 + 78.233).sin() * 43_758.547;
    x - x.floor()
}

/// Small jitter centered around 0
fn jitter(seed: f64, amplitude: f64) -> f64 {
    (noise(seed) - 0.5) * 2.0 * amplitude
}

// =============================================================================
// DemoLapGenerator
// =============================================================================

#[derive(Debug, Clone)]
pub struct DemoLapGenerator {
    base_lap_time: f64,
    seed: u64,
}

impl DemoLapGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            base_lap_time: 88.5,
            seed,
        }
    }

    /// Noise seed for one channel of one sample
    fn seed_for(&self, lap: u32, index: usize, channel: u32) -> f64 {
        (self.seed % 10_000) as f64 * 0.731
            + lap as f64 * 101.3
            + index as f64 * 1.618
            + channel as f64 * 17.17
    }

    /// Tire wear (%) for a set of tires after `tire_age` laps
    pub fn tire_wear(compound: TireCompound, tire_age: u32) -> f64 {
        (tire_age as f64 * wear_per_lap(compound)).min(100.0)
    }

    /// Lap time the generated lap will report
    pub fn lap_time(&self, spec: &LapSpec) -> f64 {
        let wear = Self::tire_wear(spec.tire_compound, spec.tire_age);
        let mut lap_time = self.base_lap_time
            + compound_pace_offset(spec.tire_compound)
            + wear * 0.01
            + (spec.track_temperature - 42.5).abs() * 0.02;

        if spec.driver_error {
            // 0.3-0.8s lost to the mistake
            lap_time += 0.3 + 0.5 * noise(self.seed_for(spec.lap_number, 0, 90));
        }
        lap_time += jitter(self.seed_for(spec.lap_number, 0, 91), 0.2);
        round_to(lap_time, 3)
    }

    /// Generate every sample for one lap, with the lap time on the last one
    pub fn generate_lap(&self, spec: &LapSpec) -> Vec<TelemetrySample> {
        let lap_time = self.lap_time(spec);
        let tire_wear = round_to(Self::tire_wear(spec.tire_compound, spec.tire_age), 1);
        let mut samples = Vec::new();
        let mut sector_start = 0.0;

        for (i, profile) in SECTORS.iter().enumerate() {
            let sector = i as u8 + 1;
            let duration = lap_time * profile.share;
            let count = (duration * SAMPLE_RATE) as usize;
            let inject_error = spec.driver_error && sector == ERROR_SECTOR;

            for j in 0..count {
                let progress = j as f64 / count as f64;
                let n = samples.len();
                let (phase, t) = Phase::at(progress);

                let speed = self.speed(profile, phase, t, inject_error, spec.lap_number, n);
                let (throttle, brake) = self.pedals(phase, t, inject_error, spec.lap_number, n);
                let steering = self.steering(profile, phase, t, spec.lap_number, n);

                samples.push(TelemetrySample {
                    lap_number: spec.lap_number,
                    sector,
                    timestamp: Seconds(round_to(sector_start + j as f64 / SAMPLE_RATE, 3)),
                    speed: KilometersPerHour(round_to(speed, 1)),
                    throttle: Percent(round_to(throttle, 1)),
                    brake: Percent(round_to(brake, 1)),
                    steering_angle: Degrees(round_to(steering, 1)),
                    gear: speed_to_gear(speed),
                    tire_compound: spec.tire_compound,
                    tire_wear: Percent(tire_wear),
                    track_temperature: Celsius(round_to(spec.track_temperature, 1)),
                    lap_time: None,
                });
            }
            sector_start += duration;
        }

        if let Some(last) = samples.last_mut() {
            last.lap_time = Some(Seconds(lap_time));
        }
        samples
    }

    fn speed(
        &self,
        profile: &SectorProfile,
        phase: Phase,
        t: f64,
        error: bool,
        lap: u32,
        n: usize,
    ) -> f64 {
        let (min, max) = (profile.min_speed, profile.max_speed);
        let speed = match phase {
            Phase::Accelerate => lerp(min, max, smoothstep(t)),
            Phase::Braking => lerp(max, min, smoothstep(t)),
            Phase::Apex => {
                // Overslowing after a late brake
                let loss = if error { 20.0 } else { 0.0 };
                min - loss + jitter(self.seed_for(lap, n, 1), 2.0)
            }
            Phase::Exit => lerp(min, max, smoothstep(t)),
        };
        (speed + jitter(self.seed_for(lap, n, 2), 1.5)).clamp(0.0, 400.0)
    }

    fn pedals(&self, phase: Phase, t: f64, error: bool, lap: u32, n: usize) -> (f64, f64) {
        let noise_at = |channel| noise(self.seed_for(lap, n, channel));
        match phase {
            Phase::Accelerate => (95.0 + 5.0 * noise_at(3), 0.0),
            Phase::Braking => {
                // Peaks mid-zone; an error means less confident braking
                let peak = if error { 90.0 } else { 100.0 };
                let brake = peak - ((t - 0.5) / 0.5).abs() * 30.0 + jitter(self.seed_for(lap, n, 4), 5.0);
                (10.0 * noise_at(5), brake.clamp(0.0, 100.0))
            }
            Phase::Apex => (30.0 + 30.0 * noise_at(6), 0.0),
            Phase::Exit => (85.0 + 15.0 * noise_at(7), 0.0),
        }
    }

    fn steering(&self, profile: &SectorProfile, phase: Phase, t: f64, lap: u32, n: usize) -> f64 {
        let envelope = match phase {
            Phase::Braking => smoothstep(t) * 0.5,
            Phase::Apex => 1.0,
            Phase::Exit => smoothstep(1.0 - t),
            Phase::Accelerate => 0.0,
        };
        let direction = if lap % 2 == 0 { 1.0 } else { -1.0 };
        direction * profile.max_steering * envelope + jitter(self.seed_for(lap, n, 8), 20.0)
    }

    /// Lap plan for a session: soft tires for laps 1-8, then mediums after a stop
    pub fn session_plan(&self, laps: u32) -> Vec<LapSpec> {
        (1..=laps)
            .map(|lap| {
                let (tire_compound, tire_age) = if lap <= 8 {
                    (TireCompound::Soft, lap - 1)
                } else {
                    (TireCompound::Medium, lap - 9)
                };
                LapSpec {
                    lap_number: lap,
                    tire_compound,
                    tire_age,
                    track_temperature: 42.0 + jitter(self.seed_for(lap, 0, 92), 3.0),
                    driver_error: noise(self.seed_for(lap, 0, 93)) < 0.1,
                }
            })
            .collect()
    }

    /// Generate a whole session, laps in order
    pub fn session(&self, laps: u32) -> Vec<TelemetrySample> {
        self.session_plan(laps)
            .iter()
            .flat_map(|spec| self.generate_lap(spec))
            .collect()
    }
}

impl Default for DemoLapGenerator {
    fn default() -> Self {
        Self::new(42)
    }
}
