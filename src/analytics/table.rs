//! Report result tables with a fixed column schema.

use super::ReportName;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// Value type of a report column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Text,
    Integer,
    Decimal,
    Float,
}

/// One named, typed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

impl Column {
    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Text,
        }
    }

    pub const fn integer(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Integer,
        }
    }

    pub const fn decimal(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Decimal,
        }
    }

    pub const fn float(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Float,
        }
    }
}

/// A single report value. `Null` is allowed in any column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Text(String),
    Integer(i64),
    Decimal(Decimal),
    Float(f64),
}

impl Cell {
    /// Whether the cell fits a column of the given kind.
    pub fn fits(&self, kind: ColumnKind) -> bool {
        matches!(
            (self, kind),
            (Cell::Null, _)
                | (Cell::Text(_), ColumnKind::Text)
                | (Cell::Integer(_), ColumnKind::Integer)
                | (Cell::Decimal(_), ColumnKind::Decimal)
                | (Cell::Float(_), ColumnKind::Float)
        )
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Cell::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Cell::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Cell::Decimal(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Option<String>> for Cell {
    fn from(value: Option<String>) -> Self {
        value.map_or(Cell::Null, Cell::Text)
    }
}

impl From<Option<&str>> for Cell {
    fn from(value: Option<&str>) -> Self {
        value.map_or(Cell::Null, |v| Cell::Text(v.to_string()))
    }
}

impl From<usize> for Cell {
    fn from(value: usize) -> Self {
        Cell::Integer(value as i64)
    }
}

impl From<Decimal> for Cell {
    fn from(value: Decimal) -> Self {
        Cell::Decimal(value)
    }
}

impl From<Option<Decimal>> for Cell {
    fn from(value: Option<Decimal>) -> Self {
        value.map_or(Cell::Null, Cell::Decimal)
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Cell::Null, Cell::Float)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Text(v) => f.write_str(v),
            Cell::Integer(v) => write!(f, "{}", v),
            Cell::Decimal(v) => write!(f, "{:.2}", v),
            Cell::Float(v) => write!(f, "{:.2}", v),
        }
    }
}

/// Result of one report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    name: ReportName,
    columns: &'static [Column],
    rows: Vec<Vec<Cell>>,
}

impl ReportTable {
    /// Empty table with the report's schema.
    pub fn new(name: ReportName) -> Self {
        Self {
            name,
            columns: name.schema(),
            rows: Vec::new(),
        }
    }

    /// Append a row. Cells must line up with the schema.
    pub(crate) fn push(&mut self, row: Vec<Cell>) {
        debug_assert_eq!(row.len(), self.columns.len());
        debug_assert!(row
            .iter()
            .zip(self.columns)
            .all(|(cell, column)| cell.fits(column.kind)));
        self.rows.push(row);
    }

    pub fn name(&self) -> ReportName {
        self.name
    }

    pub fn columns(&self) -> &[Column] {
        self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column names in schema order.
    pub fn header(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Cell at `row` in the named column.
    pub fn value(&self, row: usize, column: &str) -> Option<&Cell> {
        let index = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(index))
    }

    /// All cells of the named column, top to bottom.
    pub fn column_values(&self, column: &str) -> Vec<&Cell> {
        match self.column_index(column) {
            Some(index) => self.rows.iter().map(|r| &r[index]).collect(),
            None => Vec::new(),
        }
    }

    /// Rows as JSON objects keyed by column name.
    pub fn to_json(&self) -> Value {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let object: Map<String, Value> = self
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(column, cell)| {
                        let value = serde_json::to_value(cell).unwrap_or(Value::Null);
                        (column.name.to_string(), value)
                    })
                    .collect();
                Value::Object(object)
            })
            .collect();
        Value::Array(rows)
    }
}
