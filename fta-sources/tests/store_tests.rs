//! Integration tests for LapStore and upload parsing

use fta_core::units::*;
use fta_core::{AnalysisError, LapAnalyzer, LapSource, TelemetrySample, TireCompound};
use fta_sources::ingest::parse_samples;
use fta_sources::{DemoLapGenerator, LapStore};

fn sample(lap: u32, t: f64) -> TelemetrySample {
    TelemetrySample {
        lap_number: lap,
        sector: if t < 30.0 { 1 } else if t < 60.0 { 2 } else { 3 },
        timestamp: Seconds(t),
        speed: KilometersPerHour(250.0),
        throttle: Percent(90.0),
        brake: Percent(0.0),
        steering_angle: Degrees(4.0),
        gear: 7,
        tire_compound: TireCompound::Medium,
        tire_wear: Percent(12.0),
        track_temperature: Celsius(40.0),
        lap_time: None,
    }
}

#[test]
fn test_insert_keeps_laps_ordered() {
    let mut store = LapStore::new();
    let summary = store
        .insert_batch(vec![sample(2, 5.0), sample(1, 3.0), sample(2, 1.0), sample(1, 0.0)])
        .unwrap();

    assert_eq!(summary.lap_numbers, vec![1, 2]);
    assert_eq!(summary.data_points_stored, 4);

    let lap2 = store.lap_samples(2).unwrap();
    assert_eq!(lap2[0].timestamp.0, 1.0);
    assert_eq!(lap2[1].timestamp.0, 5.0);
}

#[test]
fn test_later_batches_merge_into_lap() {
    let mut store = LapStore::new();
    store.insert_batch(vec![sample(1, 10.0)]).unwrap();
    store.insert_batch(vec![sample(1, 2.0)]).unwrap();

    let lap = store.lap_samples(1).unwrap();
    assert_eq!(lap.len(), 2);
    assert_eq!(lap[0].timestamp.0, 2.0);
    assert_eq!(store.total_points(), 2);
}

#[test]
fn test_invalid_batch_stores_nothing() {
    let mut store = LapStore::new();
    let mut bad = sample(1, 2.0);
    bad.gear = 11;

    let err = store
        .insert_batch(vec![sample(1, 0.0), sample(1, 1.0), bad])
        .unwrap_err();

    match err {
        AnalysisError::InvalidParameter { field, reason } => {
            assert_eq!(field, "gear");
            assert!(reason.starts_with("record 2"), "reason was {}", reason);
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(store.lap_count(), 0);
}

#[test]
fn test_summaries_report_lap_time() {
    let mut store = LapStore::new();
    let mut last = sample(3, 88.0);
    last.lap_time = Some(Seconds(88.1));
    store.insert_batch(vec![sample(3, 0.0), last, sample(4, 0.0)]).unwrap();

    let summaries = store.summaries();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].lap_number, 3);
    assert_eq!(summaries[0].lap_time, Some(88.1));
    assert_eq!(summaries[0].data_points, 2);
    assert_eq!(summaries[1].lap_time, None);
    assert_eq!(store.recorded_lap_time(3), Some(88.1));
}

#[test]
fn test_unknown_lap_is_not_found() {
    let store = LapStore::new();
    assert_eq!(
        store.lap_samples(5).unwrap_err(),
        AnalysisError::LapNotFound { lap: 5 }
    );
}

#[test]
fn test_remove_lap() {
    let mut store = LapStore::new();
    store.insert_batch(vec![sample(1, 0.0), sample(2, 0.0)]).unwrap();

    assert!(store.remove(1).is_some());
    assert!(store.remove(1).is_none());
    assert_eq!(store.lap_count(), 1);
    assert!(store.lap_samples(1).is_err());
    assert!(store.lap_samples(2).is_ok());
}

#[test]
fn test_analyze_from_store() {
    let mut store = LapStore::new();
    store
        .insert_batch(DemoLapGenerator::default().session(3))
        .unwrap();
    assert_eq!(store.lap_count(), 3);

    let analyzer = LapAnalyzer::default();
    let analysis = analyzer.analyze_from_source(&store, 2, None).unwrap();
    assert_eq!(analysis.lap_number, 2);
    assert_eq!(Some(analysis.actual_lap_time), store.recorded_lap_time(2));

    assert_eq!(
        analyzer.analyze_from_source(&store, 9, None).unwrap_err(),
        AnalysisError::LapNotFound { lap: 9 }
    );
}

#[test]
fn test_reference_lap_from_store() {
    let mut store = LapStore::new();
    store
        .insert_batch(DemoLapGenerator::default().session(4))
        .unwrap();

    let analyzer = LapAnalyzer::default();
    let reference = store.reference_for(&analyzer, 1);

    assert_eq!(reference.best_min_speeds.len(), 3);
    assert!(reference.fastest_lap.is_some());
    assert_ne!(reference.fastest_lap, Some(1));
    assert!(!reference.braking_onsets.is_empty());
}

#[test]
fn test_lap_is_not_its_own_reference() {
    let mut store = LapStore::new();
    store
        .insert_batch(DemoLapGenerator::default().session(1))
        .unwrap();

    let reference = store.reference_for(&LapAnalyzer::default(), 1);
    assert_eq!(reference, fta_core::ReferenceLap::default());

    // A lap that is not stored sees every stored lap
    let reference = store.reference_for(&LapAnalyzer::default(), 2);
    assert_eq!(reference.fastest_lap, Some(1));
}

#[test]
fn test_parsed_upload_round_trips_into_store() {
    let samples = DemoLapGenerator::default().session(1);
    let text = serde_json::to_string(&serde_json::json!({ "data_points": samples })).unwrap();

    let parsed = parse_samples(&text).unwrap();
    assert_eq!(parsed.len(), samples.len());

    let mut store = LapStore::new();
    let summary = store.insert_batch(parsed).unwrap();
    assert_eq!(summary.lap_numbers, vec![1]);
}
