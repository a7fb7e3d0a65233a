// PDP Runner - Configuration file
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! JSON configuration file.
//!
//! Every section is optional and falls back to its defaults:
//!
//! ```json
//! {
//!   "generator": { "num_rows": 5000, "seed": 7, "user_pool_size": 200 },
//!   "pipeline": { "price_tiers": { "standard": 400, "premium": 900, "luxury": 2000 } }
//! }
//! ```

use crate::error::{Result, RunnerError};
use chrono::{NaiveDate, NaiveDateTime};
use pdp::PipelineConfig;
use pdp_testdata::GeneratorConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Generator and pipeline settings for one runner invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub generator: GeneratorConfig,
    pub pipeline: PipelineConfig,
}

impl RunnerConfig {
    /// Load from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|source| RunnerError::ConfigFile {
            path: path.display().to_string(),
            source,
        })
    }

    /// Load from `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Check both sections.
    pub fn validate(&self) -> Result<()> {
        self.generator.validate()?;
        self.pipeline.validate()?;
        Ok(())
    }
}

/// Parse a command-line timestamp. A bare date means midnight.
pub fn parse_cli_timestamp(value: &str) -> Result<NaiveDateTime> {
    if let Some(ts) = pdp::raw::parse_timestamp(value) {
        return Ok(ts);
    }
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| RunnerError::Timestamp(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "generator": {{ "num_rows": 250, "seed": 7 }} }}"#).unwrap();

        let config = RunnerConfig::load(file.path()).unwrap();
        assert_eq!(config.generator.num_rows, 250);
        assert_eq!(config.generator.seed, 7);
        assert_eq!(config.generator.user_pool_size, GeneratorConfig::default().user_pool_size);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_malformed_file_names_path() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = RunnerConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, RunnerError::ConfigFile { .. }));
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = RunnerConfig::default();
        config.generator.user_pool_size = 0;
        assert!(matches!(config.validate(), Err(RunnerError::Config(_))));
    }

    #[test]
    fn test_cli_timestamps() {
        let midnight = parse_cli_timestamp("2024-02-01").unwrap();
        assert_eq!(midnight.to_string(), "2024-02-01 00:00:00");

        let exact = parse_cli_timestamp("2024-02-01T10:30:00").unwrap();
        assert_eq!(exact.to_string(), "2024-02-01 10:30:00");

        assert!(matches!(
            parse_cli_timestamp("yesterday"),
            Err(RunnerError::Timestamp(_))
        ));
    }
}
