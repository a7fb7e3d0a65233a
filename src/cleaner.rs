// PDP - Product Data Pipeline
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Raw → staging cleaning.
//!
//! [`clean`] never fails. A field that cannot be coerced becomes null and is
//! counted in the [`CleaningReport`]; only rows without a user key are
//! dropped.

use crate::raw::{parse_timestamp, RawEvent, DATE_FORMAT, VALID_STATUSES};
use crate::staging::StagingRow;
use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, info, warn};
use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::OnceLock;

/// Output of a cleaning pass.
#[derive(Debug, Clone)]
pub struct Staging {
    /// Typed rows, in input order.
    pub rows: Vec<StagingRow>,
    /// What was dropped or nulled on the way.
    pub report: CleaningReport,
}

/// Data quality counters for one cleaning pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleaningReport {
    pub input_rows: usize,
    pub output_rows: usize,
    /// Rows dropped because `user_id` was null or blank.
    pub dropped_null_user: usize,
    /// Per-column count of values that failed coercion.
    pub coercion_failures: BTreeMap<&'static str, usize>,
}

impl CleaningReport {
    fn null(&mut self, column: &'static str) {
        *self.coercion_failures.entry(column).or_insert(0) += 1;
    }

    /// Total nulled values across all columns.
    pub fn total_coercion_failures(&self) -> usize {
        self.coercion_failures.values().sum()
    }
}

/// Components extracted from a user-agent string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAgentParts {
    pub device_type: String,
    pub os: String,
    pub browser: String,
}

fn group_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\(([^)]*)\)").expect("static regex"))
}

fn browser_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"([^\s/()]+)/").expect("static regex"))
}

/// Decompose a user-agent string.
///
/// - `device_type`: content of the first parenthesized group
/// - `os`: token before the first `;` inside that group
/// - `browser`: token before the first `/` outside the group
///
/// Returns `None` unless all three are found.
pub fn parse_user_agent(ua: &str) -> Option<UserAgentParts> {
    let group = group_pattern().captures(ua)?;
    let whole = group.get(0)?;
    let inner = group.get(1)?.as_str().trim();

    let (os, _) = inner.split_once(';')?;
    let os = os.trim();
    if os.is_empty() {
        return None;
    }

    let outside = format!("{} {}", &ua[..whole.start()], &ua[whole.end()..]);
    let browser = browser_pattern().captures(&outside)?.get(1)?.as_str();

    Some(UserAgentParts {
        device_type: inner.to_string(),
        os: os.to_string(),
        browser: browser.to_string(),
    })
}

/// Clean a raw table into staging rows.
pub fn clean(raw: &[RawEvent]) -> Staging {
    let mut report = CleaningReport {
        input_rows: raw.len(),
        ..Default::default()
    };
    let mut rows = Vec::with_capacity(raw.len());

    for event in raw {
        match clean_row(event, &mut report) {
            Some(row) => rows.push(row),
            None => report.dropped_null_user += 1,
        }
    }
    report.output_rows = rows.len();

    if report.dropped_null_user > 0 {
        warn!(
            "Dropped {} rows without user_id",
            report.dropped_null_user
        );
    }
    for (column, count) in &report.coercion_failures {
        debug!("{} values nulled in column {}", count, column);
    }
    info!(
        "Cleaned {} raw rows into {} staging rows ({} values nulled)",
        report.input_rows,
        report.output_rows,
        report.total_coercion_failures()
    );

    Staging { rows, report }
}

fn clean_row(event: &RawEvent, report: &mut CleaningReport) -> Option<StagingRow> {
    let user_id = event.user_id.as_deref().and_then(text)?;
    let mut row = StagingRow::new(user_id);

    row.first_name = text(&event.first_name);
    row.last_name = text(&event.last_name);
    row.email = text(&event.email).map(|e| e.to_lowercase());
    row.address = text(&event.address);
    row.state = text(&event.state);
    row.country = text(&event.country);
    row.company = text(&event.company);
    row.job_title = text(&event.job_title);
    row.ip_address = text(&event.ip_address);
    row.product_name = text(&event.product_name);
    row.user_agent = text(&event.user_agent);

    row.date_of_birth = coerce(report, "date_of_birth", &event.date_of_birth, |s| {
        NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
    });
    row.is_active = coerce(report, "is_active", &event.is_active, parse_flag);
    row.login_time = coerce_opt(report, "login_time", event.login_time.as_deref(), parse_timestamp);
    row.logout_time = coerce_opt(report, "logout_time", event.logout_time.as_deref(), parse_timestamp);
    row.account_created = coerce(report, "account_created", &event.account_created, parse_timestamp);
    row.account_updated = coerce(report, "account_updated", &event.account_updated, parse_timestamp);
    row.account_deleted = coerce_opt(
        report,
        "account_deleted",
        event.account_deleted.as_deref(),
        parse_timestamp,
    );
    row.price = coerce(report, "price", &event.price, parse_price);
    row.purchase_status = coerce(report, "purchase_status", &event.purchase_status, parse_status);

    // A logout before login is not a session boundary we can trust.
    if let (Some(login), Some(logout)) = (row.login_time, row.logout_time) {
        if logout < login {
            row.logout_time = None;
            report.null("logout_time");
        }
    }

    row.session_duration_minutes = coerce(
        report,
        "session_duration_minutes",
        &event.session_duration_minutes,
        parse_minutes,
    )
    .or_else(|| derived_minutes(row.login_time, row.logout_time));

    if let Some(ua) = row.user_agent.as_deref() {
        match parse_user_agent(ua) {
            Some(parts) => {
                row.device_type = Some(parts.device_type);
                row.os = Some(parts.os);
                row.browser = Some(parts.browser);
            }
            None => report.null("user_agent"),
        }
    }

    Some(row)
}

fn text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Coerce a required raw column; blank or unparsable values are counted.
fn coerce<T>(
    report: &mut CleaningReport,
    column: &'static str,
    value: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    let parsed = parse(value.trim());
    if parsed.is_none() {
        report.null(column);
    }
    parsed
}

/// Coerce a nullable raw column; only present-but-unparsable values are counted.
fn coerce_opt<T>(
    report: &mut CleaningReport,
    column: &'static str,
    value: Option<&str>,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => coerce(report, column, v, parse),
        None => None,
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "yes" | "true" | "1" | "y" => Some(true),
        "no" | "false" | "0" | "n" => Some(false),
        _ => None,
    }
}

fn parse_price(value: &str) -> Option<Decimal> {
    let cleaned: String = value
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();
    let price = Decimal::from_str(cleaned.trim()).ok()?.round_dp(2);
    (price > Decimal::ZERO).then_some(price)
}

fn parse_minutes(value: &str) -> Option<f64> {
    let minutes: f64 = value.parse().ok()?;
    (minutes.is_finite() && minutes >= 0.0).then_some(minutes)
}

fn parse_status(value: &str) -> Option<String> {
    let status = value.to_lowercase();
    VALID_STATUSES
        .contains(&status.as_str())
        .then_some(status)
}

fn derived_minutes(login: Option<NaiveDateTime>, logout: Option<NaiveDateTime>) -> Option<f64> {
    let millis = (logout? - login?).num_milliseconds();
    (millis >= 0).then(|| (millis as f64 / 60_000.0 * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> RawEvent {
        RawEvent {
            user_id: Some("  u-1 ".to_string()),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "Ada.Lovelace@Example.com".to_string(),
            date_of_birth: "1990-05-17".to_string(),
            is_active: "yes".to_string(),
            login_time: Some("2024-01-01T10:00:00.000".to_string()),
            logout_time: Some("2024-01-01T11:30:00.000".to_string()),
            account_created: "2024-01-01T08:00:00.000".to_string(),
            account_updated: "2024-01-01T09:00:00.000".to_string(),
            account_deleted: None,
            session_duration_minutes: "90.00".to_string(),
            product_name: "Alpha".to_string(),
            price: "1234.567".to_string(),
            purchase_status: "Completed".to_string(),
            user_agent: "Chrome/120.0 (Windows 11; Desktop)".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_user_agent() {
        let parts = parse_user_agent("Firefox/121.0 (Ubuntu 22.04; Desktop)").unwrap();
        assert_eq!(parts.device_type, "Ubuntu 22.04; Desktop");
        assert_eq!(parts.os, "Ubuntu 22.04");
        assert_eq!(parts.browser, "Firefox");
    }

    #[test]
    fn test_parse_user_agent_browser_after_group() {
        let parts = parse_user_agent("(iOS 17; Mobile) Safari/605.1.15").unwrap();
        assert_eq!(parts.browser, "Safari");
        assert_eq!(parts.os, "iOS 17");
    }

    #[test]
    fn test_parse_user_agent_all_or_nothing() {
        assert!(parse_user_agent("curl/8.4.0").is_none());
        assert!(parse_user_agent("Chrome/120.0 (Desktop)").is_none());
        assert!(parse_user_agent("(Windows 11; Desktop)").is_none());
        assert!(parse_user_agent("").is_none());
    }

    #[test]
    fn test_clean_valid_row() {
        let staging = clean(&[sample_event()]);
        assert_eq!(staging.rows.len(), 1);
        let row = &staging.rows[0];

        assert_eq!(row.user_id, "u-1");
        assert_eq!(row.email.as_deref(), Some("ada.lovelace@example.com"));
        assert_eq!(row.is_active, Some(true));
        assert_eq!(row.price, Some(Decimal::new(123457, 2)));
        assert_eq!(row.purchase_status.as_deref(), Some("completed"));
        assert_eq!(row.session_duration_minutes, Some(90.0));
        assert_eq!(row.browser.as_deref(), Some("Chrome"));
        assert_eq!(staging.report.total_coercion_failures(), 0);
    }

    #[test]
    fn test_clean_nulls_bad_fields_and_keeps_row() {
        let mut event = sample_event();
        event.price = "free".to_string();
        event.account_created = "31/12/2023".to_string();
        event.purchase_status = "lost".to_string();
        event.user_agent = "curl/8.4.0".to_string();

        let staging = clean(&[event]);
        assert_eq!(staging.rows.len(), 1);
        let row = &staging.rows[0];

        assert_eq!(row.price, None);
        assert_eq!(row.account_created, None);
        assert_eq!(row.purchase_status, None);
        assert_eq!(row.device_type, None);
        assert_eq!(row.os, None);
        assert_eq!(row.browser, None);
        assert_eq!(staging.report.coercion_failures.get("price"), Some(&1));
        assert_eq!(staging.report.total_coercion_failures(), 4);
    }

    #[test]
    fn test_clean_drops_null_user() {
        let mut missing = sample_event();
        missing.user_id = None;
        let mut blank = sample_event();
        blank.user_id = Some("   ".to_string());

        let staging = clean(&[missing, blank, sample_event()]);
        assert_eq!(staging.rows.len(), 1);
        assert_eq!(staging.report.dropped_null_user, 2);
        assert_eq!(staging.report.input_rows, 3);
    }

    #[test]
    fn test_clean_rejects_inverted_session() {
        let mut event = sample_event();
        event.logout_time = Some("2024-01-01T09:00:00.000".to_string());
        event.session_duration_minutes = String::new();

        let staging = clean(&[event]);
        let row = &staging.rows[0];
        assert_eq!(row.logout_time, None);
        assert_eq!(row.session_duration_minutes, None);
    }

    #[test]
    fn test_clean_derives_missing_duration() {
        let mut event = sample_event();
        event.session_duration_minutes = "n/a".to_string();

        let staging = clean(&[event]);
        assert_eq!(staging.rows[0].session_duration_minutes, Some(90.0));
    }

    #[test]
    fn test_clean_null_login_is_kept() {
        let mut event = sample_event();
        event.login_time = None;

        let staging = clean(&[event]);
        assert_eq!(staging.rows.len(), 1);
        assert_eq!(staging.rows[0].login_time, None);
        // Absent is not a coercion failure.
        assert!(staging.report.coercion_failures.get("login_time").is_none());
    }

    #[test]
    fn test_clean_rejects_non_positive_price() {
        let mut event = sample_event();
        event.price = "-5.00".to_string();
        assert_eq!(clean(&[event]).rows[0].price, None);
    }
}
