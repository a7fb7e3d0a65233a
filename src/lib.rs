//! # PDP - Product Data Pipeline
//!
//! Batch transformation of raw user activity events into a star schema:
//! three dimension tables, one session fact table, and a fixed set of
//! analytical reports.
//!
//! ## Key Features
//!
//! - **Lenient cleaning**: bad fields become null and are counted, rows survive
//! - **Content-derived keys**: session and transaction ids are fingerprints
//! - **Incremental loads**: watermark-driven, append-only, idempotent
//! - **Storage agnostic**: everything goes through [`TableStore`]
//!
//! ## Quick Start
//!
//! ```rust
//! use pdp::{LoadMode, MemoryStore, Pipeline, RawEvent, ReportName};
//!
//! let event = RawEvent {
//!     user_id: Some("u-1".into()),
//!     login_time: Some("2024-01-01T09:00:00.000".into()),
//!     logout_time: Some("2024-01-01T09:40:00.000".into()),
//!     product_name: "Alpha".into(),
//!     price: "750.00".into(),
//!     purchase_status: "completed".into(),
//!     user_agent: "Firefox/121.0 (Linux; Desktop)".into(),
//!     ..Default::default()
//! };
//!
//! let mut store = MemoryStore::new();
//! let summary = Pipeline::default()
//!     .run(&[event], &mut store, LoadMode::Full)
//!     .unwrap();
//! assert_eq!(summary.facts.total, 1);
//!
//! let lifecycle = pdp::pipeline::report(&store, ReportName::Lifecycle).unwrap();
//! assert_eq!(lifecycle.len(), 1);
//! ```
//!
//! ## Modules
//!
//! - [`raw`]: Raw event schema and timestamp formats
//! - [`cleaner`]: Raw to staging coercion and user-agent decomposition
//! - [`dimensions`]: `dim_user`, `dim_product`, `dim_platform`
//! - [`facts`]: `fact_user_activity`
//! - [`analytics`]: Reports over facts and dimensions
//! - [`storage`]: Table store boundary
//! - [`pipeline`]: Full and incremental runs

// Modules
pub mod analytics;
pub mod cleaner;
pub mod config;
pub mod dimensions;
pub mod error;
pub mod facts;
pub mod fingerprint;
pub mod pipeline;
pub mod raw;
pub mod staging;
pub mod storage;

// Re-exports for convenient access
pub use analytics::{Cell, Column, ColumnKind, ReportName, ReportTable};
pub use cleaner::{clean, parse_user_agent, CleaningReport, Staging, UserAgentParts};
pub use config::{EngagementBands, EngagementLevel, PipelineConfig, PriceTier, PriceTiers};
pub use dimensions::{
    DimBuild, DimPlatform, DimProduct, DimUser, Dimension, DimensionBuilder, DimensionSet,
};
pub use error::{ConfigError, IntegrityError, PipelineError, Result, StorageError};
pub use facts::{FactBuild, FactBuilder, FactRow, JoinGaps};
pub use pipeline::{LoadMode, Pipeline, RunSummary, TableLoad};
pub use raw::{RawEvent, VALID_STATUSES};
pub use staging::StagingRow;
pub use storage::{MemoryStore, Table, TableStore, WriteMode};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
