// PDP - Product Data Pipeline
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! End-to-end transformation run.
//!
//! A run cleans raw events into staging, then loads the dimension tables and
//! the fact table through a [`TableStore`]:
//!
//! - [`LoadMode::Full`] overwrites every derived table.
//! - [`LoadMode::Incremental`] reads each table's watermark and appends only
//!   newer rows. Stored rows are never rewritten.
//!
//! Staging is always overwritten.

use crate::analytics::{self, ReportName, ReportTable};
use crate::cleaner::{clean, CleaningReport};
use crate::config::PipelineConfig;
use crate::dimensions::{verify_unique_keys, DimBuild, Dimension, DimensionBuilder, DimensionSet};
use crate::dimensions::{DimPlatform, DimProduct, DimUser};
use crate::error::{IntegrityError, Result};
use crate::facts::{FactBuilder, FactRow, JoinGaps};
use crate::raw::RawEvent;
use crate::staging::StagingRow;
use crate::storage::{Table, TableStore, WriteMode};
use chrono::NaiveDateTime;
use log::{debug, info};
use serde::Serialize;

/// How derived tables are loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// Rebuild and overwrite.
    #[default]
    Full,
    /// Append rows newer than the stored watermark.
    Incremental,
}

/// Per-table outcome of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableLoad {
    pub table: &'static str,
    /// Rows written by this run.
    pub written: usize,
    /// Rows in the table after the run.
    pub total: usize,
    /// Source rows left out (null key or null login time).
    pub excluded: usize,
    /// Incremental only: candidate rows whose key was already stored.
    pub skipped_existing: usize,
    /// Watermark the run started from.
    pub watermark: Option<NaiveDateTime>,
}

/// What one run did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub mode: LoadMode,
    pub cleaning: CleaningReport,
    pub staging_rows: usize,
    pub dim_user: TableLoad,
    pub dim_product: TableLoad,
    pub dim_platform: TableLoad,
    pub facts: TableLoad,
    pub join_gaps: JoinGaps,
}

/// Runs the transformation against a table store.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    dimensions: DimensionBuilder,
    facts: FactBuilder,
}

impl Pipeline {
    /// Create a pipeline from a validated configuration.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            dimensions: DimensionBuilder::new(config.price_tiers),
            facts: FactBuilder::new(config.engagement),
        })
    }

    /// Transform `raw` and load the derived tables into `store`.
    ///
    /// Every table is built and checked before the first write, so an
    /// integrity failure leaves the store and its watermarks untouched.
    pub fn run<S: TableStore>(
        &self,
        raw: &[RawEvent],
        store: &mut S,
        mode: LoadMode,
    ) -> Result<RunSummary> {
        info!("Starting {:?} run over {} raw rows", mode, raw.len());

        let staging = clean(raw);
        let plan = match mode {
            LoadMode::Full => self.plan_full(&staging.rows)?,
            LoadMode::Incremental => self.plan_incremental(&staging.rows, store)?,
        };

        store.write_table(&staging.rows, WriteMode::Overwrite)?;
        debug!("Wrote {} staging rows", staging.rows.len());
        plan.commit(store)?;

        let summary = RunSummary {
            mode,
            staging_rows: staging.rows.len(),
            cleaning: staging.report,
            dim_user: plan.dim_user,
            dim_product: plan.dim_product,
            dim_platform: plan.dim_platform,
            facts: plan.facts,
            join_gaps: plan.join_gaps,
        };

        info!(
            "Run complete: {} users, {} products, {} platforms, {} facts (+{})",
            summary.dim_user.total,
            summary.dim_product.total,
            summary.dim_platform.total,
            summary.facts.total,
            summary.facts.written
        );
        Ok(summary)
    }

    /// Run over the raw table already held by the store.
    pub fn run_stored<S: TableStore>(&self, store: &mut S, mode: LoadMode) -> Result<RunSummary> {
        let raw = store.read_table::<RawEvent>()?;
        self.run(&raw, store, mode)
    }

    fn plan_full(&self, staging: &[StagingRow]) -> Result<LoadPlan> {
        let users = self.dimensions.build_dim_user(staging);
        let products = self.dimensions.build_dim_product(staging);
        let platforms = self.dimensions.build_dim_platform(staging);

        let dim_user = full_load(&users)?;
        let dim_product = full_load(&products)?;
        let dim_platform = full_load(&platforms)?;

        let dims = DimensionSet {
            users: users.rows,
            products: products.rows,
            platforms: platforms.rows,
        };
        let built = self.facts.build(staging, &dims, &[], None)?;

        Ok(LoadPlan {
            write: WriteMode::Overwrite,
            dim_user,
            dim_product,
            dim_platform,
            facts: TableLoad {
                table: FactRow::NAME,
                written: built.rows.len(),
                total: built.rows.len(),
                excluded: built.excluded_rows,
                skipped_existing: 0,
                watermark: None,
            },
            join_gaps: built.gaps,
            fact_rows: built.rows,
            dims,
        })
    }

    fn plan_incremental<S: TableStore>(&self, staging: &[StagingRow], store: &S) -> Result<LoadPlan> {
        let (users, new_users, dim_user) = incremental_load(store, |prior, mark| {
            self.dimensions.incremental_dim_user(staging, prior, mark)
        })?;
        let (products, new_products, dim_product) = incremental_load(store, |prior, mark| {
            self.dimensions.incremental_dim_product(staging, prior, mark)
        })?;
        let (platforms, new_platforms, dim_platform) = incremental_load(store, |prior, mark| {
            self.dimensions.incremental_dim_platform(staging, prior, mark)
        })?;

        let joined = DimensionSet {
            users,
            products,
            platforms,
        };
        let prior = store.read_table::<FactRow>()?;
        let watermark = store.watermark::<FactRow>()?;
        let built = self.facts.build(staging, &joined, &prior, watermark)?;

        Ok(LoadPlan {
            write: WriteMode::Append,
            dim_user,
            dim_product,
            dim_platform,
            facts: TableLoad {
                table: FactRow::NAME,
                written: built.rows.len(),
                total: prior.len() + built.rows.len(),
                excluded: built.excluded_rows,
                skipped_existing: 0,
                watermark,
            },
            join_gaps: built.gaps,
            fact_rows: built.rows,
            dims: DimensionSet {
                users: new_users,
                products: new_products,
                platforms: new_platforms,
            },
        })
    }
}

/// Rows a run will write, built and checked in full.
struct LoadPlan {
    write: WriteMode,
    /// Dimension rows to write: whole tables in full mode, new rows otherwise.
    dims: DimensionSet,
    fact_rows: Vec<FactRow>,
    dim_user: TableLoad,
    dim_product: TableLoad,
    dim_platform: TableLoad,
    facts: TableLoad,
    join_gaps: JoinGaps,
}

impl LoadPlan {
    fn commit<S: TableStore>(&self, store: &mut S) -> Result<()> {
        store.write_table(&self.dims.users, self.write)?;
        store.write_table(&self.dims.products, self.write)?;
        store.write_table(&self.dims.platforms, self.write)?;
        store.write_table(&self.fact_rows, self.write)?;
        debug!("Committed {} fact rows ({:?})", self.fact_rows.len(), self.write);
        Ok(())
    }
}

/// Read all three dimensions from a store.
pub fn load_dimensions<S: TableStore>(store: &S) -> Result<DimensionSet> {
    Ok(DimensionSet {
        users: store.read_table::<DimUser>()?,
        products: store.read_table::<DimProduct>()?,
        platforms: store.read_table::<DimPlatform>()?,
    })
}

/// Run one report over the tables held by a store.
pub fn report<S: TableStore>(store: &S, name: ReportName) -> Result<ReportTable> {
    let facts = store.read_table::<FactRow>()?;
    let dims = load_dimensions(store)?;
    Ok(analytics::run_report(name, &facts, &dims))
}

/// Run every report over the tables held by a store.
pub fn report_all<S: TableStore>(store: &S) -> Result<Vec<ReportTable>> {
    let facts = store.read_table::<FactRow>()?;
    let dims = load_dimensions(store)?;
    Ok(analytics::run_all(&facts, &dims))
}

fn full_load<D: Dimension>(built: &DimBuild<D>) -> Result<TableLoad> {
    verify_unique_keys(&built.rows)?;
    Ok(TableLoad {
        table: D::NAME,
        written: built.rows.len(),
        total: built.rows.len(),
        excluded: built.excluded_rows,
        skipped_existing: built.skipped_existing,
        watermark: None,
    })
}

/// Build the rows to append to a dimension.
///
/// Returns the table as it will read after the append, the new rows alone,
/// and the load outcome.
fn incremental_load<S, D, F>(store: &S, build: F) -> Result<(Vec<D>, Vec<D>, TableLoad)>
where
    S: TableStore,
    D: Dimension,
    F: FnOnce(&[D], Option<NaiveDateTime>) -> std::result::Result<DimBuild<D>, IntegrityError>,
{
    let mut prior = store.read_table::<D>()?;
    let watermark = store.watermark::<D>()?;
    let built = build(&prior, watermark)?;

    let load = TableLoad {
        table: D::NAME,
        written: built.rows.len(),
        total: prior.len() + built.rows.len(),
        excluded: built.excluded_rows,
        skipped_existing: built.skipped_existing,
        watermark,
    };
    prior.extend(built.rows.iter().cloned());
    Ok((prior, built.rows, load))
}
