// PDP - Product Data Pipeline
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Storage boundary.
//!
//! The pipeline never touches files or databases directly. It reads and
//! writes whole tables through [`TableStore`], and derives incremental
//! watermarks from what the store already holds.
//!
//! ```rust
//! use pdp::storage::{MemoryStore, TableStore, WriteMode};
//! use pdp::RawEvent;
//!
//! let mut store = MemoryStore::new();
//! store.write_table(&[RawEvent::default()], WriteMode::Append).unwrap();
//! store.write_table(&[RawEvent::default()], WriteMode::Append).unwrap();
//! assert_eq!(store.read_table::<RawEvent>().unwrap().len(), 2);
//! ```

use crate::error::StorageError;
use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;

/// A row type with a fixed physical table name.
pub trait Table: Serialize + DeserializeOwned + Clone {
    /// Physical table name; consumers bind to it.
    const NAME: &'static str;

    /// Value of the table's watermark column for this row, if it has one.
    fn watermark(&self) -> Option<NaiveDateTime> {
        None
    }
}

/// How a write combines with what is already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace the table contents.
    Overwrite,
    /// Add rows after the existing ones.
    Append,
}

/// Table-level read/write access owned by an external collaborator.
pub trait TableStore {
    /// Read a whole table. A table that was never written reads as empty.
    fn read_table<T: Table>(&self) -> Result<Vec<T>, StorageError>;

    /// Write rows to a table.
    fn write_table<T: Table>(&mut self, rows: &[T], mode: WriteMode) -> Result<(), StorageError>;

    /// Maximum watermark value currently stored for a table.
    fn watermark<T: Table>(&self) -> Result<Option<NaiveDateTime>, StorageError> {
        Ok(self
            .read_table::<T>()?
            .iter()
            .filter_map(Table::watermark)
            .max())
    }
}

/// In-process store keeping each table as JSON values.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: HashMap<&'static str, Vec<serde_json::Value>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows held for a table name.
    pub fn row_count(&self, name: &str) -> usize {
        self.tables.get(name).map(Vec::len).unwrap_or(0)
    }

    /// Names of every table written so far.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().copied()
    }

    /// Drop a table.
    pub fn truncate(&mut self, name: &str) {
        self.tables.remove(name);
    }
}

impl TableStore for MemoryStore {
    fn read_table<T: Table>(&self) -> Result<Vec<T>, StorageError> {
        let Some(values) = self.tables.get(T::NAME) else {
            return Ok(Vec::new());
        };
        values
            .iter()
            .map(|v| {
                serde_json::from_value(v.clone()).map_err(|e| StorageError::Serialization {
                    table: T::NAME,
                    message: e.to_string(),
                })
            })
            .collect()
    }

    fn write_table<T: Table>(&mut self, rows: &[T], mode: WriteMode) -> Result<(), StorageError> {
        let encoded = rows
            .iter()
            .map(|row| {
                serde_json::to_value(row).map_err(|e| StorageError::Serialization {
                    table: T::NAME,
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let table = self.tables.entry(T::NAME).or_default();
        if mode == WriteMode::Overwrite {
            table.clear();
        }
        table.extend(encoded);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Tick {
        at: NaiveDateTime,
    }

    impl Table for Tick {
        const NAME: &'static str = "ticks";

        fn watermark(&self) -> Option<NaiveDateTime> {
            Some(self.at)
        }
    }

    fn tick(hour: u32) -> Tick {
        Tick {
            at: chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_missing_table_reads_empty() {
        let store = MemoryStore::new();
        assert!(store.read_table::<Tick>().unwrap().is_empty());
        assert_eq!(store.watermark::<Tick>().unwrap(), None);
    }

    #[test]
    fn test_append_and_overwrite() {
        let mut store = MemoryStore::new();
        store.write_table(&[tick(1), tick(2)], WriteMode::Append).unwrap();
        store.write_table(&[tick(3)], WriteMode::Append).unwrap();
        assert_eq!(store.row_count("ticks"), 3);

        store.write_table(&[tick(4)], WriteMode::Overwrite).unwrap();
        assert_eq!(store.read_table::<Tick>().unwrap(), vec![tick(4)]);
    }

    #[test]
    fn test_watermark_is_max() {
        let mut store = MemoryStore::new();
        store
            .write_table(&[tick(5), tick(9), tick(2)], WriteMode::Append)
            .unwrap();
        assert_eq!(store.watermark::<Tick>().unwrap(), Some(tick(9).at));
    }

    #[test]
    fn test_truncate() {
        let mut store = MemoryStore::new();
        store.write_table(&[tick(1)], WriteMode::Append).unwrap();
        store.truncate("ticks");
        assert_eq!(store.row_count("ticks"), 0);
        assert_eq!(store.table_names().count(), 0);
    }
}
