use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Leading header cells written before the table's own header.
pub const SHEET_HEADER_PREFIX: [&str; 2] = ["日時", "画像パス"];

/// Timestamp format used in the first column of every data row.
const ROW_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A saved image, identified by its path inside the image store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub path: PathBuf,
}

impl ImageRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Rows of cells; the first row is the header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(Vec::as_slice)
    }

    /// Rows after the header.
    pub fn data_rows(&self) -> &[Vec<String>] {
        self.rows.get(1..).unwrap_or(&[])
    }

    /// Header row as written to the sheet: prefix labels, then table header.
    pub fn sheet_header(&self) -> Vec<String> {
        SHEET_HEADER_PREFIX
            .iter()
            .map(|s| s.to_string())
            .chain(self.header().unwrap_or(&[]).iter().cloned())
            .collect()
    }

    /// Data rows stamped with the capture time and image reference.
    pub fn sheet_rows(&self, captured_at: DateTime<Local>, image: &ImageRef) -> Vec<SheetRow> {
        let timestamp = captured_at.format(ROW_TIMESTAMP_FORMAT).to_string();
        self.data_rows()
            .iter()
            .map(|cells| SheetRow {
                timestamp: timestamp.clone(),
                image: image.to_string(),
                cells: cells.clone(),
            })
            .collect()
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            writeln!(f, "{}", row.join(" | "))?;
        }
        Ok(())
    }
}

/// One persisted spreadsheet row: `[timestamp, image, ...cells]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetRow {
    pub timestamp: String,
    pub image: String,
    pub cells: Vec<String>,
}

impl SheetRow {
    pub fn into_values(self) -> Vec<String> {
        let mut values = Vec::with_capacity(self.cells.len() + 2);
        values.push(self.timestamp);
        values.push(self.image);
        values.extend(self.cells);
        values
    }
}

/// Outcome of one clear + append cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendReport {
    pub cleared: bool,
    pub header_cells: u64,
    /// Updated cell count per data row; `None` marks a row whose append failed.
    pub row_cells: Vec<Option<u64>>,
}

impl AppendReport {
    pub fn rows_written(&self) -> usize {
        self.row_cells.iter().filter(|r| r.is_some()).count()
    }

    pub fn rows_failed(&self) -> usize {
        self.row_cells.iter().filter(|r| r.is_none()).count()
    }
}
