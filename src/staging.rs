//! Staging schema: typed raw events.

use crate::storage::Table;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A raw event after trimming, coercion and user-agent decomposition.
///
/// Every column except `user_id` is nullable: a value that fails coercion
/// becomes `None` and the row is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagingRow {
    pub user_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub ip_address: Option<String>,
    pub is_active: Option<bool>,
    pub login_time: Option<NaiveDateTime>,
    pub logout_time: Option<NaiveDateTime>,
    pub account_created: Option<NaiveDateTime>,
    pub account_updated: Option<NaiveDateTime>,
    pub account_deleted: Option<NaiveDateTime>,
    pub session_duration_minutes: Option<f64>,
    pub product_name: Option<String>,
    pub price: Option<Decimal>,
    pub purchase_status: Option<String>,
    pub user_agent: Option<String>,
    pub device_type: Option<String>,
    pub os: Option<String>,
    pub browser: Option<String>,
}

impl StagingRow {
    /// A row with only its user key set.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            first_name: None,
            last_name: None,
            email: None,
            date_of_birth: None,
            address: None,
            state: None,
            country: None,
            company: None,
            job_title: None,
            ip_address: None,
            is_active: None,
            login_time: None,
            logout_time: None,
            account_created: None,
            account_updated: None,
            account_deleted: None,
            session_duration_minutes: None,
            product_name: None,
            price: None,
            purchase_status: None,
            user_agent: None,
            device_type: None,
            os: None,
            browser: None,
        }
    }

    /// Whether the purchase went through.
    pub fn is_completed(&self) -> bool {
        self.purchase_status.as_deref() == Some("completed")
    }
}

impl Table for StagingRow {
    const NAME: &'static str = "stg_user_activity";

    fn watermark(&self) -> Option<NaiveDateTime> {
        self.login_time
    }
}
