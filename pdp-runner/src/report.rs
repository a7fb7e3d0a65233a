// PDP Runner - Report output
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Writes report tables as `<name>_analysis.csv`.

use crate::error::Result;
use pdp::ReportTable;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// File name for a report.
pub fn file_name(table: &ReportTable) -> String {
    format!("{}_analysis.csv", table.name())
}

/// Write one report as CSV with a header row.
pub fn write_csv<W: Write>(table: &ReportTable, writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(table.header())?;
    for row in table.rows() {
        csv.write_record(row.iter().map(ToString::to_string))?;
    }
    csv.flush()?;
    Ok(())
}

/// Write every report into `dir`, returning the files written.
pub fn write_all(tables: &[ReportTable], dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(tables.len());
    for table in tables {
        let path = dir.join(file_name(table));
        write_csv(table, BufWriter::new(File::create(&path)?))?;
        written.push(path);
    }
    Ok(written)
}
