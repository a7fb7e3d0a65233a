// PDP - Product Data Pipeline
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Dimension tables.
//!
//! Each dimension groups staging rows by its natural key and reduces the
//! group to one row, so key uniqueness comes from the grouping itself.
//!
//! Reduction rules:
//! - `dim_user`, `dim_product`: max-wins per scalar column (nulls lose).
//! - `dim_platform`: latest-seen-wins, the row with the greatest
//!   `login_time` supplies the platform columns; equal login times fall back
//!   to the greater value.
//!
//! Groups are keyed in a `BTreeMap`, so output order is key order.

use crate::config::{PriceTier, PriceTiers};
use crate::error::IntegrityError;
use crate::staging::StagingRow;
use crate::storage::Table;
use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, info};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// A dimension row with a unique natural key.
pub trait Dimension: Table {
    /// Natural key value.
    fn key(&self) -> &str;
}

/// User dimension, keyed by `user_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimUser {
    pub user_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub is_active: Option<bool>,
    pub account_created: Option<NaiveDateTime>,
    pub account_updated: Option<NaiveDateTime>,
    pub account_deleted: Option<NaiveDateTime>,
    /// `YYYY-MM` of `account_created`.
    pub cohort_month: Option<String>,
    pub session_count: u64,
    /// Sum of every priced row for the user.
    pub lifetime_value: Decimal,
}

impl Table for DimUser {
    const NAME: &'static str = "dim_user";

    fn watermark(&self) -> Option<NaiveDateTime> {
        self.account_updated
    }
}

impl Dimension for DimUser {
    fn key(&self) -> &str {
        &self.user_id
    }
}

/// Product dimension, keyed by `product_name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimProduct {
    pub product_name: String,
    pub list_price: Option<Decimal>,
    pub avg_price: Option<Decimal>,
    pub price_tier: Option<PriceTier>,
    pub order_count: u64,
    pub updated_at: Option<NaiveDateTime>,
}

impl Table for DimProduct {
    const NAME: &'static str = "dim_product";

    fn watermark(&self) -> Option<NaiveDateTime> {
        self.updated_at
    }
}

impl Dimension for DimProduct {
    fn key(&self) -> &str {
        &self.product_name
    }
}

/// Platform dimension, keyed by the raw `user_agent` string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimPlatform {
    pub user_agent: String,
    pub device_type: Option<String>,
    pub os: Option<String>,
    pub browser: Option<String>,
    pub first_seen: Option<NaiveDateTime>,
    pub last_seen: Option<NaiveDateTime>,
    pub session_count: u64,
    pub updated_at: Option<NaiveDateTime>,
}

impl Table for DimPlatform {
    const NAME: &'static str = "dim_platform";

    fn watermark(&self) -> Option<NaiveDateTime> {
        self.updated_at
    }
}

impl Dimension for DimPlatform {
    fn key(&self) -> &str {
        &self.user_agent
    }
}

/// Result of one dimension build.
#[derive(Debug, Clone)]
pub struct DimBuild<D> {
    /// Rows produced by this build. In incremental mode these are only the
    /// rows to append.
    pub rows: Vec<D>,
    /// Staging rows left out because the natural key or `login_time` was null.
    pub excluded_rows: usize,
    /// Incremental only: keys already present in the prior table.
    pub skipped_existing: usize,
}

/// All three dimensions, as the fact build and the reports see them.
#[derive(Debug, Clone, Default)]
pub struct DimensionSet {
    pub users: Vec<DimUser>,
    pub products: Vec<DimProduct>,
    pub platforms: Vec<DimPlatform>,
}

/// Builds the dimension tables from staging rows.
#[derive(Debug, Clone, Default)]
pub struct DimensionBuilder {
    tiers: PriceTiers,
}

impl DimensionBuilder {
    /// Create a builder with the given price tiers.
    pub fn new(tiers: PriceTiers) -> Self {
        Self { tiers }
    }

    /// Build `dim_user` from scratch.
    pub fn build_dim_user(&self, staging: &[StagingRow]) -> DimBuild<DimUser> {
        let refs: Vec<&StagingRow> = staging.iter().collect();
        build(&refs, |r| Some(r.user_id.as_str()), reduce_user)
    }

    /// Build `dim_product` from scratch.
    pub fn build_dim_product(&self, staging: &[StagingRow]) -> DimBuild<DimProduct> {
        let refs: Vec<&StagingRow> = staging.iter().collect();
        build(&refs, |r| r.product_name.as_deref(), |key, group| {
            reduce_product(key, group, &self.tiers)
        })
    }

    /// Build `dim_platform` from scratch.
    pub fn build_dim_platform(&self, staging: &[StagingRow]) -> DimBuild<DimPlatform> {
        let refs: Vec<&StagingRow> = staging.iter().collect();
        build(&refs, |r| r.user_agent.as_deref(), reduce_platform)
    }

    /// Build every dimension from scratch.
    pub fn build_all(&self, staging: &[StagingRow]) -> DimensionSet {
        DimensionSet {
            users: self.build_dim_user(staging).rows,
            products: self.build_dim_product(staging).rows,
            platforms: self.build_dim_platform(staging).rows,
        }
    }

    /// Rows to append to an existing `dim_user`.
    pub fn incremental_dim_user(
        &self,
        staging: &[StagingRow],
        prior: &[DimUser],
        watermark: Option<NaiveDateTime>,
    ) -> Result<DimBuild<DimUser>, IntegrityError> {
        let fresh = since(staging, watermark);
        let built = build(&fresh, |r| Some(r.user_id.as_str()), reduce_user);
        append_only(prior, built)
    }

    /// Rows to append to an existing `dim_product`.
    pub fn incremental_dim_product(
        &self,
        staging: &[StagingRow],
        prior: &[DimProduct],
        watermark: Option<NaiveDateTime>,
    ) -> Result<DimBuild<DimProduct>, IntegrityError> {
        let fresh = since(staging, watermark);
        let built = build(&fresh, |r| r.product_name.as_deref(), |key, group| {
            reduce_product(key, group, &self.tiers)
        });
        append_only(prior, built)
    }

    /// Rows to append to an existing `dim_platform`.
    pub fn incremental_dim_platform(
        &self,
        staging: &[StagingRow],
        prior: &[DimPlatform],
        watermark: Option<NaiveDateTime>,
    ) -> Result<DimBuild<DimPlatform>, IntegrityError> {
        let fresh = since(staging, watermark);
        let built = build(&fresh, |r| r.user_agent.as_deref(), reduce_platform);
        append_only(prior, built)
    }
}

/// Fail on the first repeated natural key.
pub fn verify_unique_keys<D: Dimension>(rows: &[D]) -> Result<(), IntegrityError> {
    let mut seen = HashSet::with_capacity(rows.len());
    for row in rows {
        if !seen.insert(row.key()) {
            return Err(IntegrityError::DuplicateDimensionKey {
                table: D::NAME,
                key: row.key().to_string(),
            });
        }
    }
    Ok(())
}

/// Staging rows whose `account_updated` is strictly after the watermark.
fn since(staging: &[StagingRow], watermark: Option<NaiveDateTime>) -> Vec<&StagingRow> {
    match watermark {
        None => staging.iter().collect(),
        Some(mark) => staging
            .iter()
            .filter(|r| r.account_updated.is_some_and(|u| u > mark))
            .collect(),
    }
}

fn build<'a, D, K, R>(rows: &[&'a StagingRow], key_of: K, reduce: R) -> DimBuild<D>
where
    D: Dimension,
    K: Fn(&'a StagingRow) -> Option<&'a str>,
    R: Fn(&str, &[&'a StagingRow]) -> D,
{
    let mut groups: BTreeMap<&'a str, Vec<&'a StagingRow>> = BTreeMap::new();
    let mut excluded_rows = 0;

    for &row in rows {
        // Rows without a session time feed neither facts nor dimensions.
        if row.login_time.is_none() {
            excluded_rows += 1;
            continue;
        }
        match key_of(row).filter(|k| !k.is_empty()) {
            Some(key) => groups.entry(key).or_default().push(row),
            None => excluded_rows += 1,
        }
    }

    let rows: Vec<D> = groups
        .iter()
        .map(|(key, group)| reduce(key, group))
        .collect();

    if excluded_rows > 0 {
        debug!("{}: {} rows without natural key or login time", D::NAME, excluded_rows);
    }
    info!("Built {} with {} rows", D::NAME, rows.len());

    DimBuild {
        rows,
        excluded_rows,
        skipped_existing: 0,
    }
}

fn append_only<D: Dimension>(
    prior: &[D],
    mut built: DimBuild<D>,
) -> Result<DimBuild<D>, IntegrityError> {
    verify_unique_keys(prior)?;
    let existing: HashSet<&str> = prior.iter().map(Dimension::key).collect();
    let before = built.rows.len();
    built.rows.retain(|row| !existing.contains(row.key()));
    built.skipped_existing = before - built.rows.len();

    info!(
        "{}: appending {} rows, {} keys already present",
        D::NAME,
        built.rows.len(),
        built.skipped_existing
    );
    Ok(built)
}

fn max_of<T: Ord>(group: &[&StagingRow], field: impl Fn(&StagingRow) -> Option<T>) -> Option<T> {
    group.iter().filter_map(|&r| field(r)).max()
}

fn min_of<T: Ord>(group: &[&StagingRow], field: impl Fn(&StagingRow) -> Option<T>) -> Option<T> {
    group.iter().filter_map(|&r| field(r)).min()
}

fn reduce_user(key: &str, group: &[&StagingRow]) -> DimUser {
    let account_created = max_of(group, |r| r.account_created);
    DimUser {
        user_id: key.to_string(),
        first_name: max_of(group, |r| r.first_name.clone()),
        last_name: max_of(group, |r| r.last_name.clone()),
        email: max_of(group, |r| r.email.clone()),
        date_of_birth: max_of(group, |r| r.date_of_birth),
        state: max_of(group, |r| r.state.clone()),
        country: max_of(group, |r| r.country.clone()),
        company: max_of(group, |r| r.company.clone()),
        job_title: max_of(group, |r| r.job_title.clone()),
        is_active: max_of(group, |r| r.is_active),
        account_created,
        account_updated: max_of(group, |r| r.account_updated),
        account_deleted: max_of(group, |r| r.account_deleted),
        cohort_month: account_created.map(|ts| ts.format("%Y-%m").to_string()),
        session_count: group.len() as u64,
        lifetime_value: group.iter().filter_map(|r| r.price).sum(),
    }
}

fn reduce_product(key: &str, group: &[&StagingRow], tiers: &PriceTiers) -> DimProduct {
    let prices: Vec<Decimal> = group.iter().filter_map(|r| r.price).collect();
    let list_price = prices.iter().max().copied();
    let avg_price = (!prices.is_empty()).then(|| {
        (prices.iter().sum::<Decimal>() / Decimal::from(prices.len() as u64)).round_dp(2)
    });

    DimProduct {
        product_name: key.to_string(),
        list_price,
        avg_price,
        price_tier: list_price.map(|p| tiers.classify(p)),
        order_count: group.len() as u64,
        updated_at: max_of(group, |r| r.account_updated),
    }
}

fn reduce_platform(key: &str, group: &[&StagingRow]) -> DimPlatform {
    let latest = group
        .iter()
        .max_by(|a, b| {
            (a.login_time, &a.device_type, &a.os, &a.browser)
                .cmp(&(b.login_time, &b.device_type, &b.os, &b.browser))
        })
        .copied();

    DimPlatform {
        user_agent: key.to_string(),
        device_type: latest.and_then(|r| r.device_type.clone()),
        os: latest.and_then(|r| r.os.clone()),
        browser: latest.and_then(|r| r.browser.clone()),
        first_seen: min_of(group, |r| r.login_time),
        last_seen: max_of(group, |r| r.login_time),
        session_count: group.len() as u64,
        updated_at: max_of(group, |r| r.account_updated),
    }
}
