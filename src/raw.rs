//! Raw event schema.
//!
//! Raw rows are textual, the way they arrive from JSON or CSV files. Typing
//! happens in [`crate::cleaner`].

use crate::storage::Table;
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Timestamp layout used for every raw timestamp column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Date layout used for `date_of_birth`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Purchase statuses accepted by the cleaner.
pub const VALID_STATUSES: [&str; 5] = ["pending", "completed", "failed", "chargeback", "refunded"];

/// Format a timestamp the way raw tables store it.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a raw timestamp. Accepts ISO-8601 with `T` or space separator,
/// optional fractional seconds, and RFC 3339 offsets (converted to UTC).
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.naive_utc())
        })
}

/// One generated user activity record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawEvent {
    pub user_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub date_of_birth: String,
    pub phone_number: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub company: String,
    pub job_title: String,
    pub ip_address: String,
    /// `"yes"` or `"no"`.
    pub is_active: String,
    pub login_time: Option<String>,
    pub logout_time: Option<String>,
    pub account_created: String,
    pub account_updated: String,
    pub account_deleted: Option<String>,
    pub session_duration_minutes: String,
    pub product_id: String,
    pub product_name: String,
    pub price: String,
    pub purchase_status: String,
    pub user_agent: String,
}

impl Table for RawEvent {
    const NAME: &'static str = "raw_user_activity";

    fn watermark(&self) -> Option<NaiveDateTime> {
        self.login_time.as_deref().and_then(parse_timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_format_timestamp_millis() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_milli_opt(10, 30, 5, 42)
            .unwrap();
        assert_eq!(format_timestamp(&ts), "2024-01-01T10:30:05.042");
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(8, 15, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2024-03-09T08:15:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-09 08:15:00.000"), Some(expected));
        assert_eq!(parse_timestamp(" 2024-03-09T08:15:00.000 "), Some(expected));
        assert_eq!(parse_timestamp("2024-03-09T10:15:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("not a time"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn test_raw_watermark_reads_login_time() {
        let event = RawEvent {
            login_time: Some("2024-01-01T10:30:05.042".to_string()),
            ..Default::default()
        };
        assert!(event.watermark().is_some());

        let broken = RawEvent {
            login_time: Some("yesterday".to_string()),
            ..Default::default()
        };
        assert!(broken.watermark().is_none());
    }
}
