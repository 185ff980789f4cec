//! Integration tests for the DemoLapGenerator

use fta_core::{LapAnalyzer, MistakeType, TireCompound};
use fta_sources::{DemoLapGenerator, LapSpec};

#[test]
fn test_demo_lap_samples_are_valid() {
    let generator = DemoLapGenerator::default();
    let samples = generator.generate_lap(&LapSpec::new(1, TireCompound::Soft));

    assert!(!samples.is_empty(), "lap should produce samples");
    for (i, sample) in samples.iter().enumerate() {
        sample
            .validate()
            .unwrap_or_else(|e| panic!("sample {} failed validation: {}", i, e));
        assert_eq!(sample.lap_number, 1);
    }
}

#[test]
fn test_demo_lap_covers_three_sectors_in_order() {
    let samples = DemoLapGenerator::default().generate_lap(&LapSpec::new(3, TireCompound::Medium));

    let sectors: Vec<u8> = samples.iter().map(|s| s.sector).collect();
    assert_eq!(sectors.first(), Some(&1));
    assert_eq!(sectors.last(), Some(&3));
    assert!(sectors.windows(2).all(|w| w[0] <= w[1]), "sectors should not go backwards");
    assert!(
        samples.windows(2).all(|w| w[0].timestamp.0 <= w[1].timestamp.0),
        "timestamps should be ordered"
    );
}

#[test]
fn test_demo_lap_time_only_on_final_sample() {
    let generator = DemoLapGenerator::default();
    let spec = LapSpec::new(2, TireCompound::Soft);
    let samples = generator.generate_lap(&spec);

    let with_time: Vec<_> = samples.iter().filter(|s| s.lap_time.is_some()).collect();
    assert_eq!(with_time.len(), 1);
    let last = samples.last().expect("lap should have samples");
    assert_eq!(last.lap_time.map(|t| t.0), Some(generator.lap_time(&spec)));
}

#[test]
fn test_demo_is_deterministic() {
    let a = DemoLapGenerator::new(7).session(3);
    let b = DemoLapGenerator::new(7).session(3);
    assert_eq!(a, b);

    let c = DemoLapGenerator::new(8).session(3);
    assert_ne!(a, c, "different seeds should give different traces");
}

#[test]
fn test_demo_compound_pace_order() {
    let generator = DemoLapGenerator::default();
    let time = |compound| generator.lap_time(&LapSpec::new(5, compound));

    assert!(time(TireCompound::Soft) < time(TireCompound::Medium));
    assert!(time(TireCompound::Medium) < time(TireCompound::Hard));
}

#[test]
fn test_demo_session_tire_strategy() {
    let plan = DemoLapGenerator::default().session_plan(12);

    assert_eq!(plan.len(), 12);
    assert_eq!(plan[0].tire_compound, TireCompound::Soft);
    assert_eq!(plan[0].tire_age, 0);
    assert_eq!(plan[7].tire_compound, TireCompound::Soft);
    assert_eq!(plan[7].tire_age, 7);
    assert_eq!(plan[8].tire_compound, TireCompound::Medium);
    assert_eq!(plan[8].tire_age, 0);
    assert!(plan.iter().all(|s| (39.0..=45.0).contains(&s.track_temperature)));
}

#[test]
fn test_demo_wear_grows_with_tire_age() {
    assert_eq!(DemoLapGenerator::tire_wear(TireCompound::Soft, 0), 0.0);
    assert!(
        DemoLapGenerator::tire_wear(TireCompound::Soft, 10)
            > DemoLapGenerator::tire_wear(TireCompound::Hard, 10)
    );
    assert_eq!(DemoLapGenerator::tire_wear(TireCompound::Soft, 500), 100.0);
}

#[test]
fn test_demo_lap_is_analyzable() {
    let generator = DemoLapGenerator::default();
    let spec = LapSpec::new(4, TireCompound::Soft);
    let samples = generator.generate_lap(&spec);

    let analysis = LapAnalyzer::default()
        .analyze(4, &samples, None)
        .expect("demo lap should analyze");

    assert_eq!(analysis.sector_times.len(), 3);
    let total: f64 = analysis.sector_times.values().sum();
    assert!((total - analysis.actual_lap_time).abs() < 1.0);
    assert!(!analysis
        .mistakes_detected
        .iter()
        .any(|m| m.kind == MistakeType::LowCornerSpeed));
}

#[test]
fn test_demo_driver_error_shows_in_sector_two() {
    let generator = DemoLapGenerator::default();
    let clean = LapSpec::new(6, TireCompound::Soft);
    let error = LapSpec {
        driver_error: true,
        ..clean.clone()
    };

    assert!(generator.lap_time(&error) > generator.lap_time(&clean));

    let analysis = LapAnalyzer::default()
        .analyze(6, &generator.generate_lap(&error), None)
        .expect("demo lap should analyze");
    assert!(analysis
        .mistakes_detected
        .iter()
        .any(|m| m.kind == MistakeType::LowCornerSpeed && m.sector == 2));
}

#[test]
fn test_demo_lap_serializes_to_json() {
    let samples = DemoLapGenerator::default().generate_lap(&LapSpec::new(1, TireCompound::Hard));

    let json = serde_json::to_string(&samples).expect("samples should serialize to JSON");
    let parsed: serde_json::Value = serde_json::from_str(&json).expect("JSON should be parseable");
    assert_eq!(parsed[0]["tire_compound"], "hard");
    assert_eq!(parsed[0]["sector"], 1);
}
