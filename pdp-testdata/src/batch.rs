// PDP Testdata - Event batches
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Batches of raw events and their file formats.
//!
//! Row `i` of a batch is generated from its own RNG `(seed, i)`, so the
//! sequential and the parallel build produce the same rows in the same
//! order.

use crate::generator::{row_rng, EventGenerator, GeneratorConfig};
use log::info;
use pdp::{ConfigError, RawEvent};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;

/// Batch error types.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Invalid generator configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Summary statistics of a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchStats {
    pub rows: usize,
    pub active_rows: usize,
    /// Share of rows whose user is active, `0.0..=1.0`.
    pub active_share: f64,
    /// Mean of the parseable prices.
    pub average_price: Option<f64>,
}

impl BatchStats {
    fn from_events(events: &[RawEvent]) -> Self {
        let active_rows = events.iter().filter(|e| e.is_active == "yes").count();
        let prices: Vec<f64> = events
            .iter()
            .filter_map(|e| e.price.parse::<f64>().ok())
            .collect();
        Self {
            rows: events.len(),
            active_rows,
            active_share: if events.is_empty() {
                0.0
            } else {
                active_rows as f64 / events.len() as f64
            },
            average_price: (!prices.is_empty())
                .then(|| prices.iter().sum::<f64>() / prices.len() as f64),
        }
    }
}

/// A generated batch of raw events.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventBatch {
    pub events: Vec<RawEvent>,
}

impl EventBatch {
    pub fn new(events: Vec<RawEvent>) -> Self {
        Self { events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_events(self) -> Vec<RawEvent> {
        self.events
    }

    pub fn stats(&self) -> BatchStats {
        BatchStats::from_events(&self.events)
    }

    /// Append another batch.
    pub fn extend(&mut self, other: EventBatch) {
        self.events.extend(other.events);
    }

    /// Write as CSV with a header row.
    pub fn write_csv_to<W: Write>(&self, writer: W) -> Result<(), BatchError> {
        let mut csv = csv::Writer::from_writer(writer);
        for event in &self.events {
            csv.serialize(event)?;
        }
        csv.flush()?;
        Ok(())
    }

    /// Read CSV with a header row.
    pub fn read_csv_from<R: Read>(reader: R) -> Result<Self, BatchError> {
        let mut csv = csv::Reader::from_reader(reader);
        let events = csv
            .deserialize::<RawEvent>()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { events })
    }

    /// Export to a CSV file.
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), BatchError> {
        let file = File::create(path)?;
        self.write_csv_to(BufWriter::new(file))
    }

    /// Load from a CSV file.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self, BatchError> {
        let file = File::open(path)?;
        Self::read_csv_from(BufReader::new(file))
    }

    /// Export to a JSON file (array of records).
    pub fn to_json<P: AsRef<Path>>(&self, path: P) -> Result<(), BatchError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.events)?;
        writer.flush()?;
        Ok(())
    }

    /// Load from a JSON file (array of records).
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self, BatchError> {
        let file = File::open(path)?;
        let events = serde_json::from_reader(BufReader::new(file))?;
        Ok(Self { events })
    }
}

/// Builds event batches from a generator configuration.
#[derive(Debug, Clone)]
pub struct EventBatchBuilder {
    config: GeneratorConfig,
}

impl EventBatchBuilder {
    /// Create a builder. The configuration is validated when a batch is built.
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Build `config.num_rows` rows.
    pub fn build_configured(&self) -> Result<EventBatch, BatchError> {
        self.build(self.config.num_rows)
    }

    /// Build `n` rows sequentially, growing the identity pool as rows need it.
    pub fn build(&self, n: usize) -> Result<EventBatch, BatchError> {
        let mut generator = self.generator(n)?;
        let seed = self.config.seed;
        let events: Vec<RawEvent> = (0..n)
            .map(|i| generator.generate_event(&mut row_rng(seed, i as u64)))
            .collect();
        Ok(finish(events))
    }

    /// Build `n` rows on the rayon pool over a pre-materialized identity pool.
    pub fn build_par(&self, n: usize) -> Result<EventBatch, BatchError> {
        let mut generator = self.generator(n)?;
        generator.materialize();
        let seed = self.config.seed;
        let events: Vec<RawEvent> = (0..n)
            .into_par_iter()
            .map(|i| generator.generate_shared(&mut row_rng(seed, i as u64)))
            .collect();
        Ok(finish(events))
    }

    fn generator(&self, n: usize) -> Result<EventGenerator, BatchError> {
        if n == 0 {
            return Err(ConfigError::NonPositiveRowCount(n).into());
        }
        Ok(EventGenerator::new(self.config.clone())?)
    }
}

fn finish(events: Vec<RawEvent>) -> EventBatch {
    let batch = EventBatch::new(events);
    let stats = batch.stats();
    info!("Generated {} records", stats.rows);
    info!("Active users: {} ({:.1}%)", stats.active_rows, stats.active_share * 100.0);
    if let Some(avg) = stats.average_price {
        info!("Average price: ${:.2}", avg);
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};
    use tempfile::tempdir;

    fn config() -> GeneratorConfig {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        GeneratorConfig::new()
            .with_window(start, start + Duration::days(1))
            .with_pools(10, 5)
            .with_seed(21)
    }

    #[test]
    fn test_build_and_build_par_identical() {
        let builder = EventBatchBuilder::new(config());
        let sequential = builder.build(250).unwrap();
        let parallel = builder.build_par(250).unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_build_is_reproducible() {
        let a = EventBatchBuilder::new(config()).build(40).unwrap();
        let b = EventBatchBuilder::new(config()).build(40).unwrap();
        let c = EventBatchBuilder::new(config().with_seed(22)).build(40).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_zero_rows_rejected() {
        let err = EventBatchBuilder::new(config()).build(0).unwrap_err();
        assert!(matches!(err, BatchError::Config(ConfigError::NonPositiveRowCount(0))));
    }

    #[test]
    fn test_invalid_config_rejected_before_rows() {
        let bad = config().with_pools(10, 0);
        assert!(matches!(
            EventBatchBuilder::new(bad).build_par(5),
            Err(BatchError::Config(ConfigError::InvalidPoolSize { pool: "product" }))
        ));
    }

    #[test]
    fn test_csv_and_json_files() {
        let dir = tempdir().unwrap();
        let batch = EventBatchBuilder::new(config()).build(25).unwrap();

        let csv_path = dir.path().join("events.csv");
        batch.to_csv(&csv_path).unwrap();
        assert_eq!(EventBatch::from_csv(&csv_path).unwrap(), batch);

        let json_path = dir.path().join("events.json");
        batch.to_json(&json_path).unwrap();
        assert_eq!(EventBatch::from_json(&json_path).unwrap(), batch);
    }

    #[test]
    fn test_stats() {
        let batch = EventBatch::new(vec![
            RawEvent {
                is_active: "yes".into(),
                price: "100.00".into(),
                ..Default::default()
            },
            RawEvent {
                is_active: "no".into(),
                price: "300.00".into(),
                ..Default::default()
            },
        ]);
        let stats = batch.stats();
        assert_eq!(stats.rows, 2);
        assert_relative_eq!(stats.active_share, 0.5);
        assert_relative_eq!(stats.average_price.unwrap(), 200.0);
    }
}
