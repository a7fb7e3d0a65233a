// PDP Testdata - Event generator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Raw event generation.
//!
//! One event is one user session: an identity pair from the pool, a login
//! inside the configured window, a session length, a purchase status, a user
//! agent and the account lifecycle timestamps around the login.

use crate::catalog;
use crate::identity::{IdentityPool, ProductIdentity, UserIdentity};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use pdp::raw::{format_timestamp, DATE_FORMAT};
use pdp::{ConfigError, RawEvent};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Exp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Session length distribution, in minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionDuration {
    /// Uniform on `[min, max]`.
    Uniform { min: f64, max: f64 },
    /// Exponential with the given mean, capped at `max`.
    BoundedExponential { mean: f64, max: f64 },
}

impl Default for SessionDuration {
    fn default() -> Self {
        // Half an hour to four hours.
        SessionDuration::Uniform {
            min: 30.0,
            max: 240.0,
        }
    }
}

impl SessionDuration {
    fn validate(&self) -> Result<(), ConfigError> {
        let ok = match *self {
            SessionDuration::Uniform { min, max } => {
                min.is_finite() && max.is_finite() && min >= 0.0 && min <= max
            }
            SessionDuration::BoundedExponential { mean, max } => {
                mean.is_finite() && max.is_finite() && mean > 0.0 && max > 0.0
            }
        };
        if ok {
            Ok(())
        } else {
            Err(ConfigError::InvalidDuration(format!("{:?}", self)))
        }
    }
}

/// Generator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Window start (inclusive).
    pub start: NaiveDateTime,
    /// Window end (exclusive).
    pub end: NaiveDateTime,
    /// Rows per batch.
    pub num_rows: usize,
    /// Relative weight per purchase status.
    pub status_weights: BTreeMap<String, f64>,
    pub user_pool_size: usize,
    pub product_pool_size: usize,
    pub session_duration: SessionDuration,
    /// Lowest product list price.
    pub price_min: f64,
    /// Highest product list price.
    pub price_max: f64,
    /// Probability that an event price is off by a factor of ten.
    pub price_outlier_rate: f64,
    /// Probability that a user is active.
    pub active_rate: f64,
    /// Random seed for reproducibility.
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let at = |y, m, d, h, min| {
            NaiveDate::from_ymd_opt(y, m, d)
                .and_then(|date| date.and_hms_opt(h, min, 0))
                .unwrap_or_default()
        };
        Self {
            start: at(2021, 1, 1, 10, 30),
            end: at(2024, 12, 31, 23, 59),
            num_rows: 10_000,
            status_weights: [
                ("completed", 0.6),
                ("pending", 0.2),
                ("failed", 0.1),
                ("chargeback", 0.05),
                ("refunded", 0.05),
            ]
            .into_iter()
            .map(|(status, weight)| (status.to_string(), weight))
            .collect(),
            user_pool_size: 1_000,
            product_pool_size: catalog::PRODUCT_NAMES.len(),
            session_duration: SessionDuration::default(),
            price_min: 100.0,
            price_max: 5_000.0,
            price_outlier_rate: 0.01,
            active_rate: 0.8,
            seed: 42,
        }
    }
}

impl GeneratorConfig {
    /// Create a new generator config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the time window `[start, end)`.
    pub fn with_window(mut self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// Set number of rows.
    pub fn with_num_rows(mut self, n: usize) -> Self {
        self.num_rows = n;
        self
    }

    /// Replace the status weights.
    pub fn with_status_weights<I, S>(mut self, weights: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        self.status_weights = weights
            .into_iter()
            .map(|(status, weight)| (status.into(), weight))
            .collect();
        self
    }

    /// Set both pool sizes.
    pub fn with_pools(mut self, users: usize, products: usize) -> Self {
        self.user_pool_size = users;
        self.product_pool_size = products;
        self
    }

    /// Set the session length distribution.
    pub fn with_session_duration(mut self, duration: SessionDuration) -> Self {
        self.session_duration = duration;
        self
    }

    /// Set the product price range.
    pub fn with_price_range(mut self, min: f64, max: f64) -> Self {
        self.price_min = min;
        self.price_max = max;
        self
    }

    /// Set the price outlier probability.
    pub fn with_price_outlier_rate(mut self, rate: f64) -> Self {
        self.price_outlier_rate = rate;
        self
    }

    /// Set the share of active users.
    pub fn with_active_rate(mut self, rate: f64) -> Self {
        self.active_rate = rate;
        self
    }

    /// Set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Window length in milliseconds.
    pub fn window_ms(&self) -> i64 {
        (self.end - self.start).num_milliseconds()
    }

    /// Check every value before any row is produced.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Logins are drawn at millisecond resolution.
        if self.window_ms() <= 0 {
            return Err(ConfigError::InvalidWindow {
                start: format_timestamp(&self.start),
                end: format_timestamp(&self.end),
            });
        }
        if self.status_weights.is_empty() {
            return Err(ConfigError::EmptyStatusSet);
        }
        if let Some((status, weight)) = self
            .status_weights
            .iter()
            .find(|(_, w)| !(w.is_finite() && **w > 0.0))
        {
            return Err(ConfigError::InvalidWeight {
                status: status.clone(),
                weight: *weight,
            });
        }
        if self.num_rows == 0 {
            return Err(ConfigError::NonPositiveRowCount(self.num_rows));
        }
        if self.user_pool_size == 0 {
            return Err(ConfigError::InvalidPoolSize { pool: "user" });
        }
        if self.product_pool_size == 0 {
            return Err(ConfigError::InvalidPoolSize { pool: "product" });
        }
        self.session_duration.validate()?;
        for (name, value) in [
            ("price_outlier_rate", self.price_outlier_rate),
            ("active_rate", self.active_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidRate { name, value });
            }
        }
        if !(self.price_min >= 0.01 && self.price_min <= self.price_max && self.price_max.is_finite()) {
            return Err(ConfigError::InvalidPriceRange {
                min: self.price_min,
                max: self.price_max,
            });
        }
        Ok(())
    }
}

/// Seeded RNG for one stream position. Streams separate rows from identities.
pub(crate) fn stream_rng(seed: u64, stream: u64, index: u64) -> StdRng {
    StdRng::seed_from_u64(splitmix64(seed ^ splitmix64(stream ^ splitmix64(index))))
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

const ROW_STREAM: u64 = 0x524f_5753;

/// RNG for row `index` of a batch.
pub fn row_rng(seed: u64, index: u64) -> StdRng {
    stream_rng(seed, ROW_STREAM, index)
}

/// Produces raw events for a validated configuration.
#[derive(Debug, Clone)]
pub struct EventGenerator {
    config: GeneratorConfig,
    statuses: Vec<String>,
    status_index: WeightedIndex<f64>,
    pool: IdentityPool,
}

impl EventGenerator {
    /// Validate the configuration and create a generator with an empty pool.
    pub fn new(config: GeneratorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let statuses: Vec<String> = config.status_weights.keys().cloned().collect();
        let weights: Vec<f64> = config.status_weights.values().copied().collect();
        let status_index = WeightedIndex::new(&weights).map_err(|_| ConfigError::EmptyStatusSet)?;
        let pool = IdentityPool::new(&config);

        Ok(Self {
            config,
            statuses,
            status_index,
            pool,
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn pool(&self) -> &IdentityPool {
        &self.pool
    }

    /// Create every pool identity so [`generate_shared`](Self::generate_shared)
    /// never builds one on the fly.
    pub fn materialize(&mut self) {
        self.pool
            .materialize(self.config.user_pool_size, self.config.product_pool_size);
    }

    /// Generate one event, growing the identity pool as needed.
    pub fn generate_event<R: Rng + ?Sized>(&mut self, rng: &mut R) -> RawEvent {
        let user = self.pool.get_or_create_user(rng, self.config.user_pool_size);
        let product = self
            .pool
            .get_or_create_product(rng, self.config.product_pool_size);
        self.compose(rng, &user, &product)
    }

    /// Generate one event without touching the pool.
    ///
    /// Draws the same values as [`generate_event`](Self::generate_event) for
    /// the same RNG state.
    pub fn generate_shared<R: Rng + ?Sized>(&self, rng: &mut R) -> RawEvent {
        let user = self
            .pool
            .user_at(IdentityPool::draw_index(rng, self.config.user_pool_size));
        let product = self
            .pool
            .product_at(IdentityPool::draw_index(rng, self.config.product_pool_size));
        self.compose(rng, &user, &product)
    }

    fn compose<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        user: &UserIdentity,
        product: &ProductIdentity,
    ) -> RawEvent {
        let start = self.config.start;
        let end = self.config.end;

        let login = start + Duration::milliseconds(rng.gen_range(0..self.config.window_ms()));
        let minutes = self.session_minutes(rng);
        let logout = (login + Duration::milliseconds((minutes * 60_000.0).round() as i64)).min(end);
        let duration = (logout - login).num_milliseconds() as f64 / 60_000.0;

        let status = &self.statuses[self.status_index.sample(rng)];

        let platform = catalog::pick(rng, catalog::PLATFORMS);
        let version = catalog::pick(rng, platform.versions);

        let created = between(rng, start, login);
        let updated = between(rng, created, login);
        // Deletion never precedes the session it closes.
        let deleted = (!user.is_active).then(|| between(rng, updated.max(logout), end));

        let price = self.event_price(rng, product.list_price);

        RawEvent {
            user_id: Some(user.user_id.clone()),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            date_of_birth: user.date_of_birth.format(DATE_FORMAT).to_string(),
            phone_number: user.phone_number.clone(),
            address: user.address.clone(),
            city: user.city.clone(),
            state: user.state.clone(),
            postal_code: user.postal_code.clone(),
            country: user.country.clone(),
            company: user.company.clone(),
            job_title: user.job_title.clone(),
            ip_address: ipv4(rng),
            is_active: if user.is_active { "yes" } else { "no" }.to_string(),
            login_time: Some(format_timestamp(&login)),
            logout_time: Some(format_timestamp(&logout)),
            account_created: format_timestamp(&created),
            account_updated: format_timestamp(&updated),
            account_deleted: deleted.map(|ts| format_timestamp(&ts)),
            session_duration_minutes: format!("{:.2}", duration),
            product_id: product.product_id.clone(),
            product_name: product.product_name.clone(),
            price: price.to_string(),
            purchase_status: status.clone(),
            user_agent: platform.user_agent(version),
        }
    }

    fn session_minutes<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self.config.session_duration {
            SessionDuration::Uniform { min, max } => {
                if min < max {
                    rng.gen_range(min..=max)
                } else {
                    min
                }
            }
            SessionDuration::BoundedExponential { mean, max } => match Exp::new(1.0 / mean) {
                Ok(exp) => exp.sample(rng).min(max),
                Err(_) => mean.min(max),
            },
        }
    }

    fn event_price<R: Rng + ?Sized>(&self, rng: &mut R, list_price: Decimal) -> Decimal {
        if !rng.gen_bool(self.config.price_outlier_rate) {
            return list_price;
        }
        let skewed = if rng.gen_bool(0.5) {
            list_price * Decimal::TEN
        } else {
            list_price / Decimal::TEN
        };
        skewed.round_dp(2).max(Decimal::new(1, 2))
    }
}

/// Uniform timestamp in `[from, to]` at millisecond resolution.
fn between<R: Rng + ?Sized>(rng: &mut R, from: NaiveDateTime, to: NaiveDateTime) -> NaiveDateTime {
    let span = (to - from).num_milliseconds();
    if span <= 0 {
        return from;
    }
    from + Duration::milliseconds(rng.gen_range(0..=span))
}

fn ipv4<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!(
        "{}.{}.{}.{}",
        rng.gen_range(1..224),
        rng.gen::<u8>(),
        rng.gen::<u8>(),
        rng.gen_range(1..255)
    )
}
