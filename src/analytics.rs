// PDP - Product Data Pipeline
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Analytical reports over the fact and dimension tables.
//!
//! Reports are read-only. Each has a fixed schema (see
//! [`ReportName::schema`]). Group keys may be null and form their own group.
//! Averages skip nulls; rates are percentages rounded to two decimals.
//!
//! | Report         | Rows                                   | Filter               |
//! |----------------|----------------------------------------|----------------------|
//! | `lifecycle`    | (os, price_tier)                       | completed            |
//! | `purchase`     | (product_name, price_tier, month)      | completed            |
//! | `demographics` | (job_title .. os), more than one user  | all                  |
//! | `business`     | device_type, more than five users      | all                  |
//! | `engagement`   | login hour                             | completed            |
//! | `churn`        | `dim_user` cohort month                | all users            |
//! | `session`      | engagement level                       | all                  |
//! | `funnel`       | stage                                  | all                  |

mod table;

pub use table::{Cell, Column, ColumnKind, ReportTable};

use crate::config::{EngagementLevel, PriceTier};
use crate::dimensions::{DimUser, DimensionSet};
use crate::error::ConfigError;
use crate::facts::FactRow;
use chrono::{Datelike, Timelike};
use log::{debug, info};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Demographic groups need more than this many distinct users.
const DEMOGRAPHICS_MIN_USERS: usize = 1;
/// Device groups need more than this many distinct users.
const BUSINESS_MIN_USERS: usize = 5;

const LIFECYCLE_COLUMNS: &[Column] = &[
    Column::text("os"),
    Column::text("price_tier"),
    Column::decimal("total_revenue"),
    Column::integer("total_customers"),
    Column::integer("total_purchases"),
];

const PURCHASE_COLUMNS: &[Column] = &[
    Column::text("product_name"),
    Column::text("price_tier"),
    Column::integer("month"),
    Column::integer("total_purchases"),
    Column::decimal("avg_price"),
    Column::decimal("total_revenue"),
    Column::integer("unique_customers"),
];

const DEMOGRAPHICS_COLUMNS: &[Column] = &[
    Column::text("job_title"),
    Column::text("price_tier"),
    Column::text("product_name"),
    Column::text("device_type"),
    Column::text("browser"),
    Column::text("os"),
    Column::integer("unique_users"),
    Column::integer("total_sessions"),
    Column::float("avg_session_duration"),
    Column::decimal("avg_purchase_value"),
];

const BUSINESS_COLUMNS: &[Column] = &[
    Column::text("device_type"),
    Column::integer("unique_users"),
    Column::integer("total_sessions"),
    Column::float("avg_session_duration"),
    Column::float("conversion_rate"),
];

const ENGAGEMENT_COLUMNS: &[Column] = &[
    Column::integer("hour"),
    Column::integer("total_sessions"),
    Column::integer("unique_users"),
    Column::float("avg_session_duration"),
    Column::decimal("revenue"),
];

const CHURN_COLUMNS: &[Column] = &[
    Column::text("cohort_month"),
    Column::integer("cohort_size"),
    Column::integer("churned_users"),
    Column::float("churn_rate"),
    Column::float("avg_days_to_churn"),
];

const SESSION_COLUMNS: &[Column] = &[
    Column::text("engagement_level"),
    Column::integer("total_sessions"),
    Column::integer("churned_sessions"),
    Column::float("churn_rate"),
    Column::float("avg_session_duration"),
];

const FUNNEL_COLUMNS: &[Column] = &[
    Column::text("stage"),
    Column::integer("sessions"),
    Column::integer("unique_users"),
    Column::float("conversion_from_previous"),
    Column::float("conversion_from_start"),
];

/// Available reports, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportName {
    Lifecycle,
    Purchase,
    Demographics,
    Business,
    Engagement,
    Churn,
    Session,
    Funnel,
}

impl ReportName {
    pub const ALL: [ReportName; 8] = [
        ReportName::Lifecycle,
        ReportName::Purchase,
        ReportName::Demographics,
        ReportName::Business,
        ReportName::Engagement,
        ReportName::Churn,
        ReportName::Session,
        ReportName::Funnel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportName::Lifecycle => "lifecycle",
            ReportName::Purchase => "purchase",
            ReportName::Demographics => "demographics",
            ReportName::Business => "business",
            ReportName::Engagement => "engagement",
            ReportName::Churn => "churn",
            ReportName::Session => "session",
            ReportName::Funnel => "funnel",
        }
    }

    /// Output columns.
    pub fn schema(&self) -> &'static [Column] {
        match self {
            ReportName::Lifecycle => LIFECYCLE_COLUMNS,
            ReportName::Purchase => PURCHASE_COLUMNS,
            ReportName::Demographics => DEMOGRAPHICS_COLUMNS,
            ReportName::Business => BUSINESS_COLUMNS,
            ReportName::Engagement => ENGAGEMENT_COLUMNS,
            ReportName::Churn => CHURN_COLUMNS,
            ReportName::Session => SESSION_COLUMNS,
            ReportName::Funnel => FUNNEL_COLUMNS,
        }
    }
}

impl fmt::Display for ReportName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportName {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReportName::ALL
            .into_iter()
            .find(|name| name.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnknownReport(s.to_string()))
    }
}

/// Run a report by name.
pub fn run(report: &str, facts: &[FactRow], dims: &DimensionSet) -> Result<ReportTable, ConfigError> {
    let name = report.parse::<ReportName>()?;
    Ok(run_report(name, facts, dims))
}

/// Run one report.
pub fn run_report(name: ReportName, facts: &[FactRow], dims: &DimensionSet) -> ReportTable {
    let table = match name {
        ReportName::Lifecycle => lifecycle(facts),
        ReportName::Purchase => purchase(facts),
        ReportName::Demographics => demographics(facts),
        ReportName::Business => business(facts),
        ReportName::Engagement => engagement(facts),
        ReportName::Churn => churn(&dims.users),
        ReportName::Session => session(facts),
        ReportName::Funnel => funnel(facts),
    };
    debug!("Report {} produced {} rows", name, table.len());
    table
}

/// Run every report in declaration order.
pub fn run_all(facts: &[FactRow], dims: &DimensionSet) -> Vec<ReportTable> {
    let tables: Vec<ReportTable> = ReportName::ALL
        .iter()
        .map(|name| run_report(*name, facts, dims))
        .collect();
    info!("Ran {} reports over {} fact rows", tables.len(), facts.len());
    tables
}

fn lifecycle(facts: &[FactRow]) -> ReportTable {
    let mut table = ReportTable::new(ReportName::Lifecycle);
    let groups = group_by(completed(facts), |f| (f.os.clone(), f.price_tier));

    for ((os, tier), group) in groups {
        table.push(vec![
            Cell::from(os),
            tier_cell(tier),
            Cell::from(revenue(&group)),
            Cell::from(distinct_users(&group)),
            Cell::from(group.len()),
        ]);
    }
    table
}

fn purchase(facts: &[FactRow]) -> ReportTable {
    let mut table = ReportTable::new(ReportName::Purchase);
    let groups = group_by(completed(facts), |f| {
        (f.product_name.clone(), f.price_tier, f.login_time.month())
    });

    let mut rows: Vec<(usize, Vec<Cell>)> = groups
        .into_iter()
        .map(|((product, tier, month), group)| {
            let row = vec![
                Cell::from(product),
                tier_cell(tier),
                Cell::Integer(i64::from(month)),
                Cell::from(group.len()),
                Cell::from(avg_decimal(group.iter().filter_map(|f| f.price))),
                Cell::from(revenue(&group)),
                Cell::from(distinct_users(&group)),
            ];
            (group.len(), row)
        })
        .collect();
    rows.sort_by(|a, b| b.0.cmp(&a.0));

    for (_, row) in rows {
        table.push(row);
    }
    table
}

fn demographics(facts: &[FactRow]) -> ReportTable {
    let mut table = ReportTable::new(ReportName::Demographics);
    let groups = group_by(facts, |f| {
        (
            f.job_title.clone(),
            f.price_tier,
            f.product_name.clone(),
            f.device_type.clone(),
            f.browser.clone(),
            f.os.clone(),
        )
    });

    let mut rows: Vec<(usize, Vec<Cell>)> = Vec::new();
    for ((job, tier, product, device, browser, os), group) in groups {
        let users = distinct_users(&group);
        if users <= DEMOGRAPHICS_MIN_USERS {
            continue;
        }
        // Sessions without a completed purchase count as zero.
        let purchase_values = group.iter().filter_map(|f| {
            if f.is_completed() {
                f.price
            } else {
                Some(Decimal::ZERO)
            }
        });
        rows.push((
            users,
            vec![
                Cell::from(job),
                tier_cell(tier),
                Cell::from(product),
                Cell::from(device),
                Cell::from(browser),
                Cell::from(os),
                Cell::from(users),
                Cell::from(group.len()),
                Cell::from(avg_minutes(&group)),
                Cell::from(avg_decimal(purchase_values)),
            ],
        ));
    }
    rows.sort_by(|a, b| b.0.cmp(&a.0));

    for (_, row) in rows {
        table.push(row);
    }
    table
}

fn business(facts: &[FactRow]) -> ReportTable {
    let mut table = ReportTable::new(ReportName::Business);
    let groups = group_by(facts, |f| f.device_type.clone());

    let mut rows: Vec<(usize, Vec<Cell>)> = Vec::new();
    for (device, group) in groups {
        let users = distinct_users(&group);
        if users <= BUSINESS_MIN_USERS {
            continue;
        }
        let completed = group.iter().filter(|f| f.is_completed()).count();
        rows.push((
            users,
            vec![
                Cell::from(device),
                Cell::from(users),
                Cell::from(group.len()),
                Cell::from(avg_minutes(&group)),
                Cell::from(percent(completed, group.len())),
            ],
        ));
    }
    rows.sort_by(|a, b| b.0.cmp(&a.0));

    for (_, row) in rows {
        table.push(row);
    }
    table
}

fn engagement(facts: &[FactRow]) -> ReportTable {
    let mut table = ReportTable::new(ReportName::Engagement);
    let groups = group_by(completed(facts), |f| f.login_time.hour());

    for (hour, group) in groups {
        // Missing durations count as zero minutes here.
        let minutes = group
            .iter()
            .map(|f| f.session_duration_minutes.unwrap_or(0.0));
        table.push(vec![
            Cell::Integer(i64::from(hour)),
            Cell::from(group.len()),
            Cell::from(distinct_users(&group)),
            Cell::from(avg_f64(minutes)),
            Cell::from(revenue(&group)),
        ]);
    }
    table
}

fn churn(users: &[DimUser]) -> ReportTable {
    let mut table = ReportTable::new(ReportName::Churn);
    let groups = group_by(users, |u| u.cohort_month.clone());

    for (cohort, group) in groups {
        let churned: Vec<&DimUser> = group
            .iter()
            .copied()
            .filter(|u| u.account_deleted.is_some())
            .collect();
        let days_to_churn = churned.iter().filter_map(|u| {
            let created = u.account_created?;
            let deleted = u.account_deleted?;
            Some((deleted - created).num_days() as f64)
        });
        table.push(vec![
            Cell::from(cohort),
            Cell::from(group.len()),
            Cell::from(churned.len()),
            Cell::from(percent(churned.len(), group.len())),
            Cell::from(avg_f64(days_to_churn)),
        ]);
    }
    table
}

fn session(facts: &[FactRow]) -> ReportTable {
    let mut table = ReportTable::new(ReportName::Session);
    let groups = group_by(facts, |f| f.engagement_level);

    let mut rows: Vec<(Option<f64>, Vec<Cell>)> = Vec::new();
    for (level, group) in groups {
        let churned = group.iter().filter(|f| f.is_active == Some(false)).count();
        let avg = avg_minutes(&group);
        rows.push((
            avg,
            vec![
                Cell::from(level.as_ref().map(EngagementLevel::as_str)),
                Cell::from(group.len()),
                Cell::from(churned),
                Cell::from(percent(churned, group.len())),
                Cell::from(avg),
            ],
        ));
    }
    // Nulls last, like an ascending SQL sort.
    rows.sort_by(|a, b| match (a.0, b.0) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    for (_, row) in rows {
        table.push(row);
    }
    table
}

/// Funnel stages, each a subset of the previous one.
const FUNNEL_STAGES: [(&str, fn(&FactRow) -> bool); 4] = [
    ("sessions", |_| true),
    ("purchase_attempted", |f| f.purchase_status.is_some()),
    ("payment_captured", |f| {
        matches!(
            f.purchase_status.as_deref(),
            Some("completed" | "refunded" | "chargeback")
        )
    }),
    ("completed", FactRow::is_completed),
];

fn funnel(facts: &[FactRow]) -> ReportTable {
    let mut table = ReportTable::new(ReportName::Funnel);
    let start = facts.len();
    let mut previous = start;

    for (stage, keep) in FUNNEL_STAGES {
        let group: Vec<&FactRow> = facts.iter().filter(|f| keep(f)).collect();
        table.push(vec![
            Cell::Text(stage.to_string()),
            Cell::from(group.len()),
            Cell::from(distinct_users(&group)),
            Cell::from(percent(group.len(), previous)),
            Cell::from(percent(group.len(), start)),
        ]);
        previous = group.len();
    }
    table
}

fn completed(facts: &[FactRow]) -> impl Iterator<Item = &FactRow> {
    facts.iter().filter(|f| f.is_completed())
}

fn group_by<'a, T: 'a, K: Ord>(
    items: impl IntoIterator<Item = &'a T>,
    key: impl Fn(&T) -> K,
) -> BTreeMap<K, Vec<&'a T>> {
    let mut groups: BTreeMap<K, Vec<&'a T>> = BTreeMap::new();
    for item in items {
        groups.entry(key(item)).or_default().push(item);
    }
    groups
}

fn tier_cell(tier: Option<PriceTier>) -> Cell {
    Cell::from(tier.as_ref().map(PriceTier::as_str))
}

fn distinct_users(group: &[&FactRow]) -> usize {
    group
        .iter()
        .map(|f| f.user_id.as_str())
        .collect::<HashSet<_>>()
        .len()
}

fn revenue(group: &[&FactRow]) -> Decimal {
    group
        .iter()
        .filter_map(|f| f.price)
        .sum::<Decimal>()
        .round_dp(2)
}

fn avg_decimal(values: impl Iterator<Item = Decimal>) -> Option<Decimal> {
    let (sum, count) = values.fold((Decimal::ZERO, 0u64), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| (sum / Decimal::from(count)).round_dp(2))
}

fn avg_minutes(group: &[&FactRow]) -> Option<f64> {
    avg_f64(group.iter().filter_map(|f| f.session_duration_minutes))
}

fn avg_f64(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0u64), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| round2(sum / count as f64))
}

fn percent(part: usize, whole: usize) -> Option<f64> {
    (whole > 0).then(|| round2(part as f64 * 100.0 / whole as f64))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn fact(user: &str, hour: u32, status: &str, price: i64, minutes: f64) -> FactRow {
        let login = at(1, hour);
        FactRow {
            session_id: format!("{user}-{hour}"),
            transact_id: format!("{user}-{hour}-t"),
            user_id: user.to_string(),
            product_name: Some("Alpha".to_string()),
            user_agent: Some("Safari/17.0 (iOS; Mobile)".to_string()),
            login_time: login,
            logout_time: Some(login + Duration::minutes(minutes as i64)),
            session_duration_minutes: Some(minutes),
            engagement_level: Some(crate::config::EngagementBands::default().classify(minutes)),
            user_age_days: Some(1),
            price: Some(Decimal::from(price)),
            purchase_status: Some(status.to_string()),
            first_name: None,
            last_name: None,
            job_title: Some("Engineer".to_string()),
            state: None,
            is_active: Some(true),
            account_created: Some(login - Duration::days(1)),
            account_deleted: None,
            price_tier: Some(PriceTier::Standard),
            device_type: Some("iOS; Mobile".to_string()),
            os: Some("iOS".to_string()),
            browser: Some("Safari".to_string()),
        }
    }

    fn sample() -> Vec<FactRow> {
        vec![
            fact("u-1", 9, "completed", 600, 20.0),
            fact("u-2", 9, "completed", 700, 40.0),
            fact("u-2", 10, "pending", 700, 90.0),
            fact("u-3", 11, "refunded", 800, 130.0),
        ]
    }

    #[test]
    fn test_unknown_report_is_config_error() {
        let err = run("revenue_forecast", &[], &DimensionSet::default()).unwrap_err();
        assert_eq!(err, ConfigError::UnknownReport("revenue_forecast".to_string()));
        assert_eq!("Funnel".parse::<ReportName>(), Ok(ReportName::Funnel));
    }

    #[test]
    fn test_run_all_declaration_order() {
        let tables = run_all(&sample(), &DimensionSet::default());
        let names: Vec<ReportName> = tables.iter().map(ReportTable::name).collect();
        assert_eq!(names, ReportName::ALL.to_vec());
        for table in &tables {
            assert_eq!(table.columns(), table.name().schema());
        }
    }

    #[test]
    fn test_lifecycle_completed_only() {
        let table = run_report(ReportName::Lifecycle, &sample(), &DimensionSet::default());
        assert_eq!(table.len(), 1);
        assert_eq!(table.value(0, "os"), Some(&Cell::Text("iOS".into())));
        assert_eq!(table.value(0, "price_tier"), Some(&Cell::Text("Standard".into())));
        assert_eq!(
            table.value(0, "total_revenue").and_then(Cell::as_decimal),
            Some(Decimal::from(1300))
        );
        assert_eq!(table.value(0, "total_customers").and_then(Cell::as_integer), Some(2));
        assert_eq!(table.value(0, "total_purchases").and_then(Cell::as_integer), Some(2));
    }

    #[test]
    fn test_purchase_by_month() {
        let table = run_report(ReportName::Purchase, &sample(), &DimensionSet::default());
        assert_eq!(table.len(), 1);
        assert_eq!(table.value(0, "month").and_then(Cell::as_integer), Some(1));
        assert_eq!(
            table.value(0, "avg_price").and_then(Cell::as_decimal),
            Some(Decimal::from(650))
        );
    }

    #[test]
    fn test_demographics_needs_two_users() {
        let table = run_report(ReportName::Demographics, &sample(), &DimensionSet::default());
        assert_eq!(table.len(), 1);
        assert_eq!(table.value(0, "unique_users").and_then(Cell::as_integer), Some(3));
        // (600 + 700 + 0 + 0) / 4
        assert_eq!(
            table.value(0, "avg_purchase_value").and_then(Cell::as_decimal),
            Some(Decimal::new(32500, 2))
        );

        let single = vec![fact("u-1", 9, "completed", 600, 20.0)];
        assert!(run_report(ReportName::Demographics, &single, &DimensionSet::default()).is_empty());
    }

    #[test]
    fn test_business_needs_six_users() {
        let few = run_report(ReportName::Business, &sample(), &DimensionSet::default());
        assert!(few.is_empty());

        let many: Vec<FactRow> = (0..6)
            .map(|i| fact(&format!("u-{i}"), 9, if i < 3 { "completed" } else { "failed" }, 100, 10.0))
            .collect();
        let table = run_report(ReportName::Business, &many, &DimensionSet::default());
        assert_eq!(table.len(), 1);
        let rate = table.value(0, "conversion_rate").and_then(Cell::as_float).unwrap();
        assert_relative_eq!(rate, 50.0);
    }

    #[test]
    fn test_engagement_by_hour() {
        let table = run_report(ReportName::Engagement, &sample(), &DimensionSet::default());
        assert_eq!(table.len(), 1);
        assert_eq!(table.value(0, "hour").and_then(Cell::as_integer), Some(9));
        let avg = table.value(0, "avg_session_duration").and_then(Cell::as_float).unwrap();
        assert_relative_eq!(avg, 30.0);
    }

    #[test]
    fn test_churn_by_cohort() {
        let created = at(1, 0);
        let user = |id: &str, deleted: Option<NaiveDateTime>| DimUser {
            user_id: id.to_string(),
            first_name: None,
            last_name: None,
            email: None,
            date_of_birth: None,
            state: None,
            country: None,
            company: None,
            job_title: None,
            is_active: Some(deleted.is_none()),
            account_created: Some(created),
            account_updated: Some(created),
            account_deleted: deleted,
            cohort_month: Some("2024-01".to_string()),
            session_count: 1,
            lifetime_value: Decimal::ZERO,
        };
        let dims = DimensionSet {
            users: vec![
                user("u-1", None),
                user("u-2", Some(created + Duration::days(4))),
                user("u-3", Some(created + Duration::days(6))),
                user("u-4", None),
            ],
            ..Default::default()
        };

        let table = run_report(ReportName::Churn, &[], &dims);
        assert_eq!(table.len(), 1);
        assert_eq!(table.value(0, "cohort_size").and_then(Cell::as_integer), Some(4));
        assert_eq!(table.value(0, "churned_users").and_then(Cell::as_integer), Some(2));
        assert_relative_eq!(table.value(0, "churn_rate").and_then(Cell::as_float).unwrap(), 50.0);
        assert_relative_eq!(
            table.value(0, "avg_days_to_churn").and_then(Cell::as_float).unwrap(),
            5.0
        );
    }

    #[test]
    fn test_session_levels_sorted_by_duration() {
        let mut facts = sample();
        facts[3].is_active = Some(false);
        let table = run_report(ReportName::Session, &facts, &DimensionSet::default());

        let levels: Vec<&str> = table
            .column_values("engagement_level")
            .into_iter()
            .filter_map(Cell::as_text)
            .collect();
        assert_eq!(levels, vec!["Very Low", "Low", "Medium", "High"]);
        assert_eq!(table.value(3, "churned_sessions").and_then(Cell::as_integer), Some(1));
    }

    #[test]
    fn test_funnel_stages_shrink() {
        let table = run_report(ReportName::Funnel, &sample(), &DimensionSet::default());
        let sessions: Vec<i64> = table
            .column_values("sessions")
            .into_iter()
            .filter_map(Cell::as_integer)
            .collect();
        assert_eq!(sessions, vec![4, 4, 3, 2]);
        assert_relative_eq!(
            table.value(3, "conversion_from_start").and_then(Cell::as_float).unwrap(),
            50.0
        );
        assert_relative_eq!(
            table.value(2, "conversion_from_previous").and_then(Cell::as_float).unwrap(),
            75.0
        );
    }

    #[test]
    fn test_empty_facts() {
        for table in run_all(&[], &DimensionSet::default()) {
            if table.name() == ReportName::Funnel {
                assert_eq!(table.len(), 4);
                assert_eq!(table.value(0, "conversion_from_start"), Some(&Cell::Null));
            } else {
                assert!(table.is_empty());
            }
        }
    }
}
