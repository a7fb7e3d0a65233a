// PDP - Product Data Pipeline
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Fact table: one row per user session.
//!
//! Sessions are identified by `session_id = fingerprint(user_id, login_time)`.
//! Every staging row with a login time becomes a fact row; dimension
//! attributes are attached by left join and stay null when the key is
//! missing from the dimension.

use crate::config::{EngagementBands, EngagementLevel, PriceTier};
use crate::dimensions::{DimPlatform, DimProduct, DimUser, DimensionSet};
use crate::error::IntegrityError;
use crate::fingerprint::{session_id, transact_id};
use crate::raw::format_timestamp;
use crate::staging::StagingRow;
use crate::storage::Table;
use chrono::NaiveDateTime;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One session in `fact_user_activity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactRow {
    pub session_id: String,
    pub transact_id: String,
    pub user_id: String,
    pub product_name: Option<String>,
    pub user_agent: Option<String>,
    pub login_time: NaiveDateTime,
    pub logout_time: Option<NaiveDateTime>,
    pub session_duration_minutes: Option<f64>,
    pub engagement_level: Option<EngagementLevel>,
    pub user_age_days: Option<i64>,
    pub price: Option<Decimal>,
    pub purchase_status: Option<String>,
    // dim_user
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub job_title: Option<String>,
    pub state: Option<String>,
    pub is_active: Option<bool>,
    pub account_created: Option<NaiveDateTime>,
    pub account_deleted: Option<NaiveDateTime>,
    // dim_product
    pub price_tier: Option<PriceTier>,
    // dim_platform
    pub device_type: Option<String>,
    pub os: Option<String>,
    pub browser: Option<String>,
}

impl FactRow {
    /// Whether the purchase went through.
    pub fn is_completed(&self) -> bool {
        self.purchase_status.as_deref() == Some("completed")
    }

    /// Whether the user behind this session has a deletion timestamp.
    pub fn is_churned(&self) -> bool {
        self.account_deleted.is_some()
    }
}

impl Table for FactRow {
    const NAME: &'static str = "fact_user_activity";

    fn watermark(&self) -> Option<NaiveDateTime> {
        Some(self.login_time)
    }
}

/// Fact rows missing a dimension match, per dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JoinGaps {
    pub user: usize,
    pub product: usize,
    pub platform: usize,
}

/// Result of one fact build.
#[derive(Debug, Clone)]
pub struct FactBuild {
    /// New fact rows. In incremental mode these are the rows to append.
    pub rows: Vec<FactRow>,
    /// Staging rows without a login time.
    pub excluded_rows: usize,
    /// Left-join misses.
    pub gaps: JoinGaps,
}

/// Derives fact rows from staging rows and dimensions.
#[derive(Debug, Clone, Default)]
pub struct FactBuilder {
    bands: EngagementBands,
}

impl FactBuilder {
    /// Create a builder with the given engagement bands.
    pub fn new(bands: EngagementBands) -> Self {
        Self { bands }
    }

    /// Build fact rows.
    ///
    /// With a watermark only staging rows whose `login_time` is strictly
    /// after it are considered. Session ids must be unique across `prior`
    /// and the new rows.
    pub fn build(
        &self,
        staging: &[StagingRow],
        dims: &DimensionSet,
        prior: &[FactRow],
        watermark: Option<NaiveDateTime>,
    ) -> Result<FactBuild, IntegrityError> {
        let users: HashMap<&str, &DimUser> =
            dims.users.iter().map(|d| (d.user_id.as_str(), d)).collect();
        let products: HashMap<&str, &DimProduct> = dims
            .products
            .iter()
            .map(|d| (d.product_name.as_str(), d))
            .collect();
        let platforms: HashMap<&str, &DimPlatform> = dims
            .platforms
            .iter()
            .map(|d| (d.user_agent.as_str(), d))
            .collect();

        let mut seen: HashSet<&str> = HashSet::with_capacity(prior.len());
        for fact in prior {
            if !seen.insert(fact.session_id.as_str()) {
                return Err(duplicate_session(fact));
            }
        }

        let mut rows = Vec::new();
        let mut excluded_rows = 0;
        let mut gaps = JoinGaps::default();

        for row in staging {
            let Some(login) = row.login_time else {
                excluded_rows += 1;
                continue;
            };
            if watermark.is_some_and(|mark| login <= mark) {
                continue;
            }

            let user = users.get(row.user_id.as_str()).copied();
            let product = row
                .product_name
                .as_deref()
                .and_then(|name| products.get(name).copied());
            let platform = row
                .user_agent
                .as_deref()
                .and_then(|ua| platforms.get(ua).copied());

            gaps.user += usize::from(user.is_none());
            gaps.product += usize::from(product.is_none());
            gaps.platform += usize::from(platform.is_none());

            rows.push(self.fact(row, login, user, product, platform));
        }

        for fact in &rows {
            if !seen.insert(fact.session_id.as_str()) {
                return Err(duplicate_session(fact));
            }
        }

        if excluded_rows > 0 {
            warn!("{} staging rows without login_time left out of facts", excluded_rows);
        }
        debug!(
            "Fact join gaps: user={} product={} platform={}",
            gaps.user, gaps.product, gaps.platform
        );
        info!("Built {} new fact rows", rows.len());

        Ok(FactBuild {
            rows,
            excluded_rows,
            gaps,
        })
    }

    fn fact(
        &self,
        row: &StagingRow,
        login: NaiveDateTime,
        user: Option<&DimUser>,
        product: Option<&DimProduct>,
        platform: Option<&DimPlatform>,
    ) -> FactRow {
        let product_key = row.product_name.as_deref().unwrap_or_default();
        FactRow {
            session_id: session_id(&row.user_id, &login),
            transact_id: transact_id(&row.user_id, &login, product_key),
            user_id: row.user_id.clone(),
            product_name: row.product_name.clone(),
            user_agent: row.user_agent.clone(),
            login_time: login,
            logout_time: row.logout_time,
            session_duration_minutes: row.session_duration_minutes,
            engagement_level: row
                .session_duration_minutes
                .map(|minutes| self.bands.classify(minutes)),
            user_age_days: row
                .account_created
                .map(|created| (login - created).num_days()),
            price: row.price,
            purchase_status: row.purchase_status.clone(),
            first_name: user.and_then(|u| u.first_name.clone()),
            last_name: user.and_then(|u| u.last_name.clone()),
            job_title: user.and_then(|u| u.job_title.clone()),
            state: user.and_then(|u| u.state.clone()),
            is_active: user.and_then(|u| u.is_active),
            account_created: user.and_then(|u| u.account_created),
            account_deleted: user.and_then(|u| u.account_deleted),
            price_tier: product.and_then(|p| p.price_tier),
            device_type: platform.and_then(|p| p.device_type.clone()),
            os: platform.and_then(|p| p.os.clone()),
            browser: platform.and_then(|p| p.browser.clone()),
        }
    }
}

fn duplicate_session(fact: &FactRow) -> IntegrityError {
    IntegrityError::DuplicateSessionId {
        session_id: fact.session_id.clone(),
        user_id: fact.user_id.clone(),
        login_time: format_timestamp(&fact.login_time),
    }
}
