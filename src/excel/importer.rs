//! Ledger importer - Excel (.xlsx) → [`Ledger`]

use super::{Cell, Ledger, Sheet};
use crate::error::{SebitError, SebitResult};
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use std::path::{Path, PathBuf};

/// Reads every worksheet of an existing workbook.
pub struct LedgerImporter {
    path: PathBuf,
}

impl LedgerImporter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Load the workbook, or an empty ledger when the file does not exist yet.
    pub fn import_or_default(&self) -> SebitResult<Ledger> {
        if self.path.exists() {
            self.import()
        } else {
            Ok(Ledger::default())
        }
    }

    pub fn import(&self) -> SebitResult<Ledger> {
        let mut workbook: Xlsx<_> = open_workbook(&self.path).map_err(|e| {
            SebitError::Workbook(format!(
                "Failed to open {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let mut ledger = Ledger::default();
        for name in workbook.sheet_names().to_vec() {
            let range = workbook.worksheet_range(&name).map_err(|e| {
                SebitError::Workbook(format!("Failed to read sheet '{}': {}", name, e))
            })?;
            ledger.sheets.push(Sheet {
                rows: read_rows(&range),
                name,
            });
        }
        Ok(ledger)
    }
}

fn read_rows(range: &Range<Data>) -> Vec<Vec<Cell>> {
    range
        .rows()
        .map(|row| row.iter().map(to_cell).collect::<Vec<_>>())
        .filter(|row| row.iter().any(|c| *c != Cell::Empty))
        .collect()
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::Empty => Cell::Empty,
        other => Cell::Text(other.to_string()),
    }
}
