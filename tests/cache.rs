use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use match_reco::cache::{AnalysisCache, SingleFlight};
use match_reco::sample::synthetic_records;
use match_reco::{AnalysisMode, Engine, EngineConfig};

fn engine() -> Engine {
    Engine::new(EngineConfig::default()).expect("default config is valid")
}

#[test]
fn concurrent_callers_share_one_computation() {
    let flight: SingleFlight<String, usize> = SingleFlight::new();
    let calls = AtomicUsize::new(0);
    let (flight_ref, calls_ref) = (&flight, &calls);

    let values: Vec<usize> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(move || {
                    let (flight, calls) = (flight_ref, calls_ref);
                    flight
                        .get_or_try_compute("m1".to_string(), || {
                            thread::sleep(Duration::from_millis(20));
                            Ok::<_, ()>(calls.fetch_add(1, Ordering::SeqCst) + 100)
                        })
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(values.iter().all(|&v| v == 100));
}

#[test]
fn distinct_keys_compute_independently() {
    let flight: SingleFlight<u32, u32> = SingleFlight::new();
    let calls = AtomicUsize::new(0);
    thread::scope(|scope| {
        for key in 0..4u32 {
            let flight = &flight;
            let calls = &calls;
            scope.spawn(move || {
                for _ in 0..3 {
                    let v = flight
                        .get_or_try_compute(key, || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            Ok::<_, ()>(key * 10)
                        })
                        .unwrap();
                    assert_eq!(v, key * 10);
                }
            });
        }
    });
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(flight.len(), 4);
}

#[test]
fn analysis_cache_reuses_results_per_mode() {
    let engine = engine();
    let cache = AnalysisCache::new(&engine);
    let record = synthetic_records(3, 1).remove(0);

    let first = cache.analysis(&record, AnalysisMode::Outcome).unwrap();
    let again = cache.analysis(&record, AnalysisMode::Outcome).unwrap();
    assert!(Arc::ptr_eq(&first, &again));

    let multi = cache.analysis(&record, AnalysisMode::MultiMarket).unwrap();
    assert!(!Arc::ptr_eq(&first, &multi));
    assert_eq!(first.prediction, multi.prediction);
    assert_eq!(cache.len(), 2);

    assert_eq!(*first, engine.compute_analysis(&record).unwrap());
}

#[test]
fn editing_a_record_needs_invalidation() {
    let engine = engine();
    let cache = AnalysisCache::new(&engine);
    let records = synthetic_records(4, 2);
    let mut record = records[0].clone();

    let before = cache.analysis(&record, AnalysisMode::Outcome).unwrap();
    cache.analysis(&records[1], AnalysisMode::Outcome).unwrap();

    record.odds.home += 1.0;
    let stale = cache.analysis(&record, AnalysisMode::Outcome).unwrap();
    assert!(Arc::ptr_eq(&before, &stale));

    cache.invalidate_match(&record.id);
    assert_eq!(cache.len(), 1);
    let fresh = cache.analysis(&record, AnalysisMode::Outcome).unwrap();
    assert_eq!(fresh.prediction.values, engine.compute_analysis(&record).unwrap().prediction.values);
    assert_ne!(before.prediction.values, fresh.prediction.values);
}

#[test]
fn rejected_records_are_not_cached() {
    let engine = engine();
    let cache = AnalysisCache::new(&engine);
    let mut record = synthetic_records(5, 1).remove(0);
    record.away_form = "V-?-D".to_string();

    assert!(cache.analysis(&record, AnalysisMode::Outcome).is_err());
    assert!(cache.is_empty());

    record.away_form = "V-E-D".to_string();
    assert!(cache.analysis(&record, AnalysisMode::Outcome).is_ok());
    assert_eq!(cache.len(), 1);
}
