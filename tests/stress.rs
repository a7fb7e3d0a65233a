//! Stress tests for the transformation
//!
//! Run with: cargo test --release stress -- --ignored

use chrono::{Duration, NaiveDate, NaiveDateTime};
use pdp::raw::format_timestamp;
use pdp::*;
use std::time::Instant;

const USER_AGENTS: [&str; 3] = [
    "Chrome/120.0 (Windows 11; Desktop)",
    "Safari/17.1 (iOS 17; Mobile)",
    "Firefox/121.0 (Ubuntu 22.04; Desktop)",
];

fn base() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn event(i: usize, login: NaiveDateTime) -> RawEvent {
    let created = base() - Duration::days(30);
    RawEvent {
        user_id: Some(format!("user-{}", i % 5_000)),
        first_name: "Test".into(),
        last_name: format!("User{}", i % 5_000),
        is_active: if i % 7 == 0 { "no" } else { "yes" }.into(),
        login_time: Some(format_timestamp(&login)),
        logout_time: Some(format_timestamp(&(login + Duration::minutes(45)))),
        account_created: format_timestamp(&created),
        account_updated: format_timestamp(&(created + Duration::days(1))),
        session_duration_minutes: "45.00".into(),
        product_name: format!("Product {}", i % 40),
        price: format!("{}.99", 100 + (i % 40) * 100),
        purchase_status: VALID_STATUSES[i % VALID_STATUSES.len()].into(),
        user_agent: USER_AGENTS[i % USER_AGENTS.len()].into(),
        ..Default::default()
    }
}

fn events(n: usize, from: NaiveDateTime) -> Vec<RawEvent> {
    (0..n)
        .map(|i| event(i, from + Duration::seconds(i as i64)))
        .collect()
}

#[test]
#[ignore] // Run manually with --ignored
fn stress_test_full_run() {
    let raw = events(200_000, base());
    let mut store = MemoryStore::new();

    let start = Instant::now();
    let summary = Pipeline::default()
        .run(&raw, &mut store, LoadMode::Full)
        .unwrap();
    let elapsed = start.elapsed();
    let rate = raw.len() as f64 / elapsed.as_secs_f64();

    println!("Transformed {} rows in {:?}", raw.len(), elapsed);
    println!("Rate: {:.0} rows/second", rate);

    assert_eq!(summary.facts.total, raw.len());
    assert_eq!(summary.dim_user.total, 5_000);
    assert_eq!(summary.dim_product.total, 40);
    assert!(rate > 20_000.0, "Should transform at least 20k rows/s, got {:.0}", rate);
}

#[test]
#[ignore]
fn stress_test_incremental_batches() {
    let pipeline = Pipeline::default();
    let mut store = MemoryStore::new();
    let mut raw = Vec::new();

    let start = Instant::now();
    for batch in 0..10 {
        let from = base() + Duration::days(batch);
        raw.extend(events(10_000, from));
        let summary = pipeline
            .run(&raw, &mut store, LoadMode::Incremental)
            .unwrap();
        assert_eq!(summary.facts.written, 10_000, "batch {}", batch);
    }
    let elapsed = start.elapsed();

    println!("Loaded 10 incremental batches in {:?}", elapsed);
    assert_eq!(store.read_table::<FactRow>().unwrap().len(), 100_000);
}

#[test]
#[ignore]
fn stress_test_reports() {
    let raw = events(100_000, base());
    let mut store = MemoryStore::new();
    Pipeline::default()
        .run(&raw, &mut store, LoadMode::Full)
        .unwrap();

    let start = Instant::now();
    let reports = pipeline::report_all(&store).unwrap();
    let elapsed = start.elapsed();

    println!("Ran {} reports in {:?}", reports.len(), elapsed);
    assert_eq!(reports.len(), ReportName::ALL.len());
}
