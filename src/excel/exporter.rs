//! Ledger exporter - [`Ledger`] → Excel (.xlsx)

use super::{Cell, Ledger};
use crate::error::{SebitError, SebitResult};
use rust_xlsxwriter::Workbook;
use std::path::Path;

/// Writes a whole ledger; the target file is replaced.
pub struct LedgerExporter<'a> {
    ledger: &'a Ledger,
}

impl<'a> LedgerExporter<'a> {
    pub fn new(ledger: &'a Ledger) -> Self {
        Self { ledger }
    }

    pub fn export(&self, output_path: &Path) -> SebitResult<()> {
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut workbook = Workbook::new();
        for sheet in &self.ledger.sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(&sheet.name).map_err(|e| {
                SebitError::Workbook(format!("Failed to set worksheet name: {}", e))
            })?;

            for (row_idx, row) in sheet.rows.iter().enumerate() {
                let row_num = row_idx as u32;
                for (col_idx, cell) in row.iter().enumerate() {
                    let col_num = col_idx as u16;
                    match cell {
                        Cell::Text(text) => {
                            worksheet
                                .write_string(row_num, col_num, text)
                                .map_err(|e| {
                                    SebitError::Workbook(format!("Failed to write cell: {}", e))
                                })?;
                        }
                        Cell::Number(value) => {
                            worksheet
                                .write_number(row_num, col_num, *value)
                                .map_err(|e| {
                                    SebitError::Workbook(format!("Failed to write cell: {}", e))
                                })?;
                        }
                        Cell::Empty => {}
                    }
                }
            }
        }

        workbook
            .save(output_path)
            .map_err(|e| SebitError::Workbook(format!("Failed to save Excel file: {}", e)))?;
        Ok(())
    }
}
