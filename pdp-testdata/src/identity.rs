// PDP Testdata - Identity pool
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Reusable user and product identities.
//!
//! Events reference identities by pool index. The attribute bundle of an
//! index is derived from its own RNG stream `(seed, kind, index)`, so it does
//! not depend on when or how often the index is drawn.

use crate::catalog;
use crate::generator::{stream_rng, GeneratorConfig};
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::Rng;
use rust_decimal::Decimal;
use std::borrow::Cow;
use std::collections::HashMap;
use uuid::Builder;

const USER_STREAM: u64 = 0x5553_4552;
const PRODUCT_STREAM: u64 = 0x5052_4f44;

const MIN_AGE_YEARS: i64 = 18;
const MAX_AGE_YEARS: i64 = 72;

/// A generated user.
#[derive(Debug, Clone, PartialEq)]
pub struct UserIdentity {
    pub index: usize,
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub date_of_birth: NaiveDate,
    pub phone_number: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub company: String,
    pub job_title: String,
    pub is_active: bool,
}

/// A generated product.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductIdentity {
    pub index: usize,
    pub product_id: String,
    pub product_name: String,
    pub list_price: Decimal,
}

/// Attribute ranges identities are drawn from.
#[derive(Debug, Clone)]
struct IdentityRules {
    seed: u64,
    reference_date: NaiveDate,
    active_rate: f64,
    price_min_cents: i64,
    price_max_cents: i64,
}

/// Lazily grown registry of identities keyed by pool index.
#[derive(Debug, Clone)]
pub struct IdentityPool {
    rules: IdentityRules,
    users: HashMap<usize, UserIdentity>,
    products: HashMap<usize, ProductIdentity>,
}

impl IdentityPool {
    /// Create an empty pool for a configuration.
    pub fn new(config: &GeneratorConfig) -> Self {
        Self {
            rules: IdentityRules {
                seed: config.seed,
                reference_date: config.start.date(),
                active_rate: config.active_rate,
                price_min_cents: (config.price_min * 100.0).round() as i64,
                price_max_cents: (config.price_max * 100.0).round() as i64,
            },
            users: HashMap::new(),
            products: HashMap::new(),
        }
    }

    /// Draw a pool index.
    pub fn draw_index<R: Rng + ?Sized>(rng: &mut R, pool_size: usize) -> usize {
        rng.gen_range(0..pool_size.max(1))
    }

    /// Draw a user index and return its identity, creating it on first use.
    pub fn get_or_create_user<R: Rng + ?Sized>(&mut self, rng: &mut R, pool_size: usize) -> UserIdentity {
        let index = Self::draw_index(rng, pool_size);
        let rules = &self.rules;
        self.users
            .entry(index)
            .or_insert_with(|| build_user(rules, index))
            .clone()
    }

    /// Draw a product index and return its identity, creating it on first use.
    pub fn get_or_create_product<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        catalog_size: usize,
    ) -> ProductIdentity {
        let index = Self::draw_index(rng, catalog_size);
        let rules = &self.rules;
        self.products
            .entry(index)
            .or_insert_with(|| build_product(rules, index))
            .clone()
    }

    /// Create every identity up front so the pool can be shared read-only.
    pub fn materialize(&mut self, user_pool: usize, product_pool: usize) {
        for index in 0..user_pool {
            let rules = &self.rules;
            self.users
                .entry(index)
                .or_insert_with(|| build_user(rules, index));
        }
        for index in 0..product_pool {
            let rules = &self.rules;
            self.products
                .entry(index)
                .or_insert_with(|| build_product(rules, index));
        }
    }

    /// Identity for an index. Falls back to building it when not cached.
    pub fn user_at(&self, index: usize) -> Cow<'_, UserIdentity> {
        match self.users.get(&index) {
            Some(user) => Cow::Borrowed(user),
            None => Cow::Owned(build_user(&self.rules, index)),
        }
    }

    /// Identity for an index. Falls back to building it when not cached.
    pub fn product_at(&self, index: usize) -> Cow<'_, ProductIdentity> {
        match self.products.get(&index) {
            Some(product) => Cow::Borrowed(product),
            None => Cow::Owned(build_product(&self.rules, index)),
        }
    }

    /// Number of cached users.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Number of cached products.
    pub fn product_count(&self) -> usize {
        self.products.len()
    }
}

fn uuid_from(rng: &mut StdRng) -> String {
    Builder::from_random_bytes(rng.gen()).into_uuid().to_string()
}

fn build_user(rules: &IdentityRules, index: usize) -> UserIdentity {
    let mut rng = stream_rng(rules.seed, USER_STREAM, index as u64);

    let user_id = uuid_from(&mut rng);
    let first_name = catalog::pick(&mut rng, catalog::FIRST_NAMES).to_string();
    let last_name = catalog::pick(&mut rng, catalog::LAST_NAMES).to_string();
    let domain = catalog::pick(&mut rng, catalog::EMAIL_DOMAINS);
    let email = format!("{}.{}@{}", first_name, last_name, domain).to_lowercase();

    let min_days = MIN_AGE_YEARS * 365;
    let max_days = MAX_AGE_YEARS * 365;
    let date_of_birth = rules.reference_date - Duration::days(rng.gen_range(min_days..=max_days));

    let phone_number = format!(
        "+1-{:03}-{:03}-{:04}",
        rng.gen_range(200..1000),
        rng.gen_range(200..1000),
        rng.gen_range(0..10_000)
    );
    let address = format!(
        "{} {} {}",
        rng.gen_range(1..10_000),
        catalog::pick(&mut rng, catalog::STREETS),
        catalog::pick(&mut rng, catalog::STREET_SUFFIXES)
    );
    let (city, state) = *catalog::pick(&mut rng, catalog::CITIES);
    let postal_code = format!("{:05}", rng.gen_range(501..100_000));
    let country = catalog::pick(&mut rng, catalog::COUNTRIES).to_string();
    let company = format!(
        "{} {}",
        catalog::pick(&mut rng, catalog::COMPANY_STEMS),
        catalog::pick(&mut rng, catalog::COMPANY_SUFFIXES)
    );
    let job_title = catalog::pick(&mut rng, catalog::JOB_TITLES).to_string();
    let is_active = rng.gen_bool(rules.active_rate);

    UserIdentity {
        index,
        user_id,
        first_name,
        last_name,
        email,
        date_of_birth,
        phone_number,
        address,
        city: city.to_string(),
        state: state.to_string(),
        postal_code,
        country,
        company,
        job_title,
        is_active,
    }
}

fn build_product(rules: &IdentityRules, index: usize) -> ProductIdentity {
    let mut rng = stream_rng(rules.seed, PRODUCT_STREAM, index as u64);
    let product_id = uuid_from(&mut rng);
    let cents = rng.gen_range(rules.price_min_cents..=rules.price_max_cents);

    ProductIdentity {
        index,
        product_id,
        product_name: catalog::product_name(index),
        list_price: Decimal::new(cents, 2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn pool() -> IdentityPool {
        IdentityPool::new(&GeneratorConfig::default().with_seed(7))
    }

    #[test]
    fn test_same_index_same_bundle() {
        let mut a = pool();
        let mut b = pool();
        let mut rng_a = StdRng::seed_from_u64(1);
        let mut rng_b = StdRng::seed_from_u64(1);

        for _ in 0..20 {
            assert_eq!(
                a.get_or_create_user(&mut rng_a, 5),
                b.get_or_create_user(&mut rng_b, 5)
            );
        }
        assert!(a.user_count() <= 5);
    }

    #[test]
    fn test_bundle_independent_of_draw_order() {
        let mut cached = pool();
        cached.materialize(10, 4);
        let fresh = pool();

        assert_eq!(cached.user_at(3).into_owned(), fresh.user_at(3).into_owned());
        assert_eq!(cached.product_at(2).into_owned(), fresh.product_at(2).into_owned());
        assert_eq!(cached.user_count(), 10);
        assert_eq!(cached.product_count(), 4);
    }

    #[test]
    fn test_user_attributes() {
        let user = pool().user_at(0).into_owned();
        let expected = format!("{}.{}@", user.first_name, user.last_name).to_lowercase();
        assert!(user.email.starts_with(&expected));
        assert_eq!(user.user_id.len(), 36);

        let start = GeneratorConfig::default().start.date();
        let age_days = (start - user.date_of_birth).num_days();
        assert!((18 * 365..=72 * 365).contains(&age_days));
    }

    #[test]
    fn test_product_price_in_range() {
        let config = GeneratorConfig::default();
        let pool = IdentityPool::new(&config);
        for index in 0..30 {
            let product = pool.product_at(index);
            assert!(product.list_price >= Decimal::from(100));
            assert!(product.list_price <= Decimal::from(5000));
        }
    }
}
