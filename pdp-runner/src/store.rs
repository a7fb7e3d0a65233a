// PDP Runner - CSV table store
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Directory of CSV files, one per table.
//!
//! Table `T` lives in `<dir>/<T::NAME>.csv` with a header row. A missing
//! file reads as an empty table. Appending to an existing non-empty file
//! adds rows without repeating the header.

use pdp::{StorageError, Table, TableStore, WriteMode};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Table store backed by CSV files in one directory.
#[derive(Debug, Clone)]
pub struct CsvStore {
    dir: PathBuf,
}

impl CsvStore {
    /// Open a store, creating the directory if needed.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// File holding a table.
    pub fn table_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", name))
    }

    /// Whether a table has ever been written.
    pub fn contains(&self, name: &str) -> bool {
        self.table_path(name).is_file()
    }
}

fn serialization<T: Table>(err: csv::Error) -> StorageError {
    match err.into_kind() {
        csv::ErrorKind::Io(io) => StorageError::Io(io),
        kind => StorageError::Serialization {
            table: T::NAME,
            message: format!("{:?}", kind),
        },
    }
}

impl TableStore for CsvStore {
    fn read_table<T: Table>(&self) -> Result<Vec<T>, StorageError> {
        let path = self.table_path(T::NAME);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut reader = csv::Reader::from_reader(BufReader::new(file));
        let rows = reader
            .deserialize::<T>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(serialization::<T>)?;
        debug!("Read {} rows from {}", rows.len(), path.display());
        Ok(rows)
    }

    fn write_table<T: Table>(&mut self, rows: &[T], mode: WriteMode) -> Result<(), StorageError> {
        let path = self.table_path(T::NAME);
        let has_content = fs::metadata(&path).map(|m| m.len() > 0).unwrap_or(false);
        let appending = mode == WriteMode::Append && has_content;

        let file = if appending {
            OpenOptions::new().append(true).open(&path)?
        } else {
            File::create(&path)?
        };

        let mut writer = csv::WriterBuilder::new()
            .has_headers(!appending)
            .from_writer(BufWriter::new(file));
        for row in rows {
            writer.serialize(row).map_err(serialization::<T>)?;
        }
        writer.flush()?;

        debug!(
            "Wrote {} rows to {} ({:?})",
            rows.len(),
            path.display(),
            mode
        );
        Ok(())
    }
}
