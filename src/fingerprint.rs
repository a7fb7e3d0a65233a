//! Content-derived surrogate keys.
//!
//! A key is the 128-bit XXH3 digest of its fields in a fixed order, joined
//! with a unit separator so `("ab", "c")` and `("a", "bc")` differ.

use crate::raw::format_timestamp;
use chrono::{NaiveDateTime, Timelike};
use xxhash_rust::xxh3::xxh3_128;

const FIELD_SEPARATOR: u8 = 0x1f;

/// Fingerprint an ordered tuple of fields as 32 lowercase hex digits.
pub fn fingerprint(fields: &[&str]) -> String {
    let capacity = fields.iter().map(|f| f.len() + 1).sum();
    let mut data = Vec::with_capacity(capacity);
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            data.push(FIELD_SEPARATOR);
        }
        data.extend_from_slice(field.as_bytes());
    }
    format!("{:032x}", xxh3_128(&data))
}

/// Timestamp text for keys. Millisecond values use the storage format and
/// finer values keep every digit.
fn key_timestamp(ts: &NaiveDateTime) -> String {
    if ts.nanosecond() % 1_000_000 == 0 {
        format_timestamp(ts)
    } else {
        ts.format("%Y-%m-%dT%H:%M:%S%.9f").to_string()
    }
}

/// Session key over `(user_id, login_time)`.
pub fn session_id(user_id: &str, login_time: &NaiveDateTime) -> String {
    fingerprint(&[user_id, &key_timestamp(login_time)])
}

/// Transaction key over `(user_id, login_time, product_name)`.
pub fn transact_id(user_id: &str, login_time: &NaiveDateTime, product_name: &str) -> String {
    fingerprint(&[user_id, &key_timestamp(login_time), product_name])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = transact_id("u-1", &at(10, 0), "Alpha");
        let b = transact_id("u-1", &at(10, 0), "Alpha");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_sub_millisecond_logins_get_distinct_keys() {
        let login = at(10, 0);
        let later = login + chrono::Duration::microseconds(100);
        assert_ne!(session_id("u-1", &login), session_id("u-1", &later));
        assert_ne!(
            transact_id("u-1", &login, "Alpha"),
            transact_id("u-1", &later, "Alpha")
        );
        // Whole milliseconds hash the stored text.
        assert_eq!(
            session_id("u-1", &login),
            fingerprint(&["u-1", "2024-01-01T10:00:00.000"])
        );
    }

    #[test]
    fn test_fingerprint_field_boundaries() {
        assert_ne!(fingerprint(&["ab", "c"]), fingerprint(&["a", "bc"]));
    }

    #[test]
    fn test_keys_differ_by_input() {
        assert_ne!(session_id("u-1", &at(10, 0)), session_id("u-1", &at(10, 1)));
        assert_ne!(session_id("u-1", &at(10, 0)), session_id("u-2", &at(10, 0)));
        assert_ne!(
            transact_id("u-1", &at(10, 0), "Alpha"),
            transact_id("u-1", &at(10, 0), "Beta")
        );
    }
}
