//! Workbook I/O for the journal ledger
//!
//! - Import: `.xlsx` → [`Ledger`] (calamine)
//! - Export: [`Ledger`] → `.xlsx` (rust_xlsxwriter), always a full rewrite

mod exporter;
mod importer;

pub use exporter::LedgerExporter;
pub use importer::LedgerImporter;

/// A single worksheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    /// Text form used for duplicate comparison.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => n.to_string(),
            Cell::Empty => String::new(),
        }
    }

    /// Numeric form; text is parsed, anything else is zero.
    pub fn as_number(&self) -> f64 {
        match self {
            Cell::Number(n) => *n,
            Cell::Text(s) => s.trim().replace(',', "").parse().unwrap_or(0.0),
            Cell::Empty => 0.0,
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

/// A named worksheet as a list of rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }
}

/// An in-memory workbook; sheet order is preserved.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ledger {
    pub sheets: Vec<Sheet>,
}

impl Ledger {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|s| s.name == name)
    }

    /// Existing sheet, or a new one appended with `header` as its first row.
    pub fn sheet_or_insert(&mut self, name: &str, header: &[&str]) -> &mut Sheet {
        if let Some(idx) = self.sheets.iter().position(|s| s.name == name) {
            return &mut self.sheets[idx];
        }
        let mut sheet = Sheet::new(name);
        sheet.rows.push(header.iter().map(|h| Cell::from(*h)).collect());
        self.sheets.push(sheet);
        let last = self.sheets.len() - 1;
        &mut self.sheets[last]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_or_insert_adds_header_once() {
        let mut ledger = Ledger::default();
        ledger.sheet_or_insert("03", &["Date", "Vendor"]);
        ledger
            .sheet_or_insert("03", &["ignored"])
            .rows
            .push(vec![Cell::from("2025-03-02"), Cell::from("Cafe")]);
        assert_eq!(ledger.sheets.len(), 1);
        let sheet = ledger.sheet("03").unwrap();
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0][0], Cell::from("Date"));
    }

    #[test]
    fn test_cell_coercions() {
        assert_eq!(Cell::Number(6000.0).as_text(), "6000");
        assert_eq!(Cell::from("6,000").as_number(), 6000.0);
        assert_eq!(Cell::Empty.as_number(), 0.0);
    }
}
