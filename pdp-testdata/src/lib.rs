// PDP Testdata - Synthetic user activity generator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # PDP Testdata
//!
//! Synthetic user activity events for the PDP pipeline.
//!
//! Generated data is internally consistent and referentially valid:
//!
//! - **Reused identities**: users and products come from fixed-size pools
//! - **Bounded timestamps**: logins and account creation fall in `[start, end)`
//! - **Correlated fields**: duration matches login/logout, lifecycle order holds
//! - **Realistic user agents**: templated from a device/os/browser catalog
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{Duration, NaiveDate};
//! use pdp_testdata::{EventBatchBuilder, GeneratorConfig};
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1)
//!     .unwrap()
//!     .and_hms_opt(0, 0, 0)
//!     .unwrap();
//! let config = GeneratorConfig::new()
//!     .with_window(start, start + Duration::days(1))
//!     .with_pools(10, 5)
//!     .with_status_weights([("completed", 0.8), ("pending", 0.2)])
//!     .with_seed(42);
//!
//! let batch = EventBatchBuilder::new(config).build(100).unwrap();
//! assert_eq!(batch.len(), 100);
//! ```

pub mod batch;
pub mod catalog;
pub mod generator;
pub mod identity;

// Re-exports for convenience
pub use batch::{BatchError, BatchStats, EventBatch, EventBatchBuilder};
pub use generator::{row_rng, EventGenerator, GeneratorConfig, SessionDuration};
pub use identity::{IdentityPool, ProductIdentity, UserIdentity};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
