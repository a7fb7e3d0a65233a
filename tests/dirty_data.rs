//! Malformed raw rows through a full run.

use pdp::*;

fn valid(user: &str, login: &str) -> RawEvent {
    RawEvent {
        user_id: Some(user.into()),
        first_name: "Grace".into(),
        is_active: "yes".into(),
        login_time: Some(login.into()),
        logout_time: None,
        account_created: "2023-12-01T08:00:00.000".into(),
        account_updated: "2023-12-02T08:00:00.000".into(),
        session_duration_minutes: "30".into(),
        product_name: "Tablet".into(),
        price: "799.00".into(),
        purchase_status: "completed".into(),
        user_agent: "Chrome/120.0 (Windows 11; Desktop)".into(),
        ..Default::default()
    }
}

fn dirty_batch() -> Vec<RawEvent> {
    vec![
        valid("u-1", "2024-01-01T10:00:00.000"),
        RawEvent {
            user_id: None,
            ..valid("ignored", "2024-01-01T10:05:00.000")
        },
        RawEvent {
            user_id: Some("   ".into()),
            ..valid("ignored", "2024-01-01T10:06:00.000")
        },
        RawEvent {
            price: "abc".into(),
            ..valid("u-2", "2024-01-01T12:00:00.000")
        },
        RawEvent {
            login_time: None,
            ..valid("u-3", "unused")
        },
    ]
}

#[test]
fn bad_rows_are_dropped_or_nulled() {
    let mut store = MemoryStore::new();
    let summary = Pipeline::default()
        .run(&dirty_batch(), &mut store, LoadMode::Full)
        .unwrap();

    assert_eq!(summary.cleaning.input_rows, 5);
    assert_eq!(summary.cleaning.dropped_null_user, 2);
    assert!(summary.cleaning.total_coercion_failures() >= 1);
    assert_eq!(summary.staging_rows, 3);

    assert_eq!(summary.dim_user.total, 2);
    assert_eq!(summary.dim_user.excluded, 1);
    assert_eq!(summary.dim_product.excluded, 1);
    assert_eq!(summary.dim_platform.excluded, 1);
    assert_eq!(summary.facts.total, 2);
    assert_eq!(summary.facts.excluded, 1);

    let facts = store.read_table::<FactRow>().unwrap();
    let u2 = facts.iter().find(|f| f.user_id == "u-2").unwrap();
    assert_eq!(u2.price, None);
    assert_eq!(u2.os.as_deref(), Some("Windows 11"));
}

#[test]
fn null_login_row_stays_in_staging() {
    let mut store = MemoryStore::new();
    Pipeline::default()
        .run(&dirty_batch(), &mut store, LoadMode::Full)
        .unwrap();

    let staging = store.read_table::<StagingRow>().unwrap();
    let u3 = staging.iter().find(|r| r.user_id == "u-3").unwrap();
    assert_eq!(u3.login_time, None);
    assert!(store
        .read_table::<FactRow>()
        .unwrap()
        .iter()
        .all(|f| f.user_id != "u-3"));
    assert!(store
        .read_table::<DimUser>()
        .unwrap()
        .iter()
        .all(|u| u.user_id != "u-3"));
}

#[test]
fn incremental_rerun_is_a_no_op() {
    let pipeline = Pipeline::default();
    let mut store = MemoryStore::new();
    pipeline
        .run(&dirty_batch(), &mut store, LoadMode::Full)
        .unwrap();

    let rerun = pipeline
        .run(&dirty_batch(), &mut store, LoadMode::Incremental)
        .unwrap();
    assert_eq!(rerun.facts.written, 0);
    assert_eq!(rerun.facts.total, 2);
    assert_eq!(rerun.dim_user.written, 0);
}
