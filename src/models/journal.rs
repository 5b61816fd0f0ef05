//! Journal book writer.
//!
//! Each entry lands in `<root>/<company>/<year>/<vendor>_<year>.xlsx`, on the
//! sheet named after its month (`"01"`..`"12"`). A row with the same date,
//! vendor and amount is reported as a duplicate and not written twice. Every
//! call appends one JSON line to `audit.log` in the year directory.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{Datelike, NaiveDate, SecondsFormat, Utc};
use serde_json::json;
use tracing::{debug, info};

use super::Model;
use crate::core::input::ModelInput;
use crate::core::node::Node;
use crate::error::{SebitError, SebitResult};
use crate::excel::{Cell, LedgerExporter, LedgerImporter};

pub const AUDIT_LOG: &str = "audit.log";

const ILLEGAL_PATH_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Replace characters that cannot appear in a file or directory name.
pub fn squash(s: &str) -> String {
    s.chars()
        .map(|c| if ILLEGAL_PATH_CHARS.contains(&c) { '_' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    Ko,
    En,
}

impl Language {
    pub fn parse(s: Option<&str>) -> Self {
        match s.map(str::trim) {
            Some(l) if l.eq_ignore_ascii_case("en") => Language::En,
            _ => Language::Ko,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Ko => "ko",
            Language::En => "en",
        }
    }

    pub fn headers(&self) -> [&'static str; 8] {
        match self {
            Language::Ko => ["날짜", "거래처", "설명", "계정", "차변", "대변", "금액", "통화"],
            Language::En => [
                "Date",
                "Vendor",
                "Description",
                "Account",
                "Debit",
                "Credit",
                "Amount",
                "Currency",
            ],
        }
    }

    fn unknown_vendor(&self) -> &'static str {
        match self {
            Language::Ko => "미지정거래처",
            Language::En => "UnknownVendor",
        }
    }

    fn default_description(&self) -> &'static str {
        match self {
            Language::Ko => "지출",
            Language::En => "Expense",
        }
    }

    fn default_currency(&self) -> &'static str {
        match self {
            Language::Ko => "KRW",
            Language::En => "USD",
        }
    }
}

/// A validated journal entry.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    pub company: String,
    pub date: NaiveDate,
    pub vendor: String,
    pub description: String,
    pub account: String,
    pub debit: f64,
    pub credit: f64,
    pub currency: String,
    pub language: Language,
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| raw.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()))
}

impl JournalEntry {
    /// Validate structured fields: company, date, account, then amounts.
    pub fn from_input(input: &ModelInput) -> SebitResult<Self> {
        if input.fields().contains_key("text") {
            return Err(SebitError::validation(
                "free-text entries are not supported; provide company, date, account and debit or credit.",
            ));
        }

        let language = Language::parse(input.text(&["language"]).as_deref());
        let text = |key: &str| {
            input
                .text(&[key])
                .map(|s| s.trim().to_string())
                .unwrap_or_default()
        };

        let company = text("company");
        if company.is_empty() {
            return Err(SebitError::validation("company is required."));
        }

        let raw_date = text("date");
        if raw_date.is_empty() {
            return Err(SebitError::validation("date is required."));
        }
        let date = parse_date(&raw_date).ok_or_else(|| {
            SebitError::validation(format!("date must be YYYY-MM-DD: {}", raw_date))
        })?;

        let account = text("account");
        if account.is_empty() {
            return Err(SebitError::validation("account is required."));
        }

        let debit = input.number(&["debit"], 0.0);
        let credit = input.number(&["credit"], 0.0);
        if debit < 0.0 || credit < 0.0 {
            return Err(SebitError::validation("amount cannot be negative."));
        }
        if (debit > 0.0) == (credit > 0.0) {
            return Err(SebitError::validation(
                "exactly one of debit or credit must be positive.",
            ));
        }

        let vendor = match text("vendor") {
            v if v.is_empty() => language.unknown_vendor().to_string(),
            v => v,
        };
        let description = match text("description") {
            d if d.is_empty() => language.default_description().to_string(),
            d => d,
        };
        let currency = match text("currency") {
            c if c.is_empty() => language.default_currency().to_string(),
            c => c,
        };

        Ok(Self {
            company,
            date,
            vendor,
            description,
            account,
            debit,
            credit,
            currency,
            language,
        })
    }

    pub fn amount(&self) -> f64 {
        self.debit + self.credit
    }

    pub fn date_text(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    pub fn sheet_name(&self) -> String {
        format!("{:02}", self.date.month())
    }

    fn row(&self) -> Vec<Cell> {
        vec![
            Cell::from(self.date_text()),
            Cell::from(self.vendor.as_str()),
            Cell::from(self.description.as_str()),
            Cell::from(self.account.as_str()),
            Cell::from(self.debit),
            Cell::from(self.credit),
            Cell::from(self.amount()),
            Cell::from(self.currency.as_str()),
        ]
    }

    /// Same date, vendor and amount.
    fn matches(&self, row: &[Cell]) -> bool {
        let date = row.first().map(Cell::as_text).unwrap_or_default();
        let vendor = row.get(1).map(Cell::as_text).unwrap_or_default();
        let amount = row.get(6).map(Cell::as_number).unwrap_or(0.0);
        date == self.date_text() && vendor == self.vendor && amount == self.amount()
    }
}

/// Result of one journal write.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalReceipt {
    pub duplicated: bool,
    pub file_path: PathBuf,
    pub sheet: String,
    /// Rows in the month sheet after the write, header included.
    pub row_index: usize,
    pub entry: JournalEntry,
}

impl From<JournalReceipt> for Node {
    fn from(receipt: JournalReceipt) -> Self {
        let entry = &receipt.entry;
        Node::object()
            .with("ok", true)
            .with("duplicated", receipt.duplicated)
            .with("filePath", receipt.file_path.display().to_string())
            .with("sheet", receipt.sheet.as_str())
            .with("rowIndex", receipt.row_index as f64)
            .with(
                "entry",
                Node::object()
                    .with("date", entry.date_text())
                    .with("vendor", entry.vendor.as_str())
                    .with("description", entry.description.as_str())
                    .with("account", entry.account.as_str())
                    .with("debit", entry.debit)
                    .with("credit", entry.credit)
                    .with("currency", entry.currency.as_str())
                    .with("language", entry.language.as_str()),
            )
    }
}

/// Per-vendor, per-year workbooks under a root directory.
///
/// Writes from this process are serialized; other processes writing the same
/// files are not coordinated.
#[derive(Debug)]
pub struct JournalBook {
    root: PathBuf,
    lock: Mutex<()>,
}

impl JournalBook {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn year_dir(&self, company: &str, year: i32) -> PathBuf {
        self.root.join(squash(company)).join(year.to_string())
    }

    pub fn vendor_file(&self, company: &str, year: i32, vendor: &str) -> PathBuf {
        self.year_dir(company, year)
            .join(format!("{}_{}.xlsx", squash(vendor), year))
    }

    pub fn record(&self, input: &ModelInput) -> SebitResult<JournalReceipt> {
        let entry = JournalEntry::from_input(input)?;
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());

        let year = entry.date.year();
        let file = self.vendor_file(&entry.company, year, &entry.vendor);
        let sheet_name = entry.sheet_name();
        let headers = entry.language.headers();

        let mut ledger = LedgerImporter::new(&file).import_or_default()?;
        let sheet = ledger.sheet_or_insert(&sheet_name, &headers);
        let duplicated = sheet.rows.iter().any(|row| entry.matches(row));
        if !duplicated {
            sheet.rows.push(entry.row());
        }
        let row_index = sheet.rows.len();

        LedgerExporter::new(&ledger).export(&file)?;
        self.append_audit(&entry, year, &sheet_name, row_index, duplicated)?;

        if duplicated {
            debug!(file = %file.display(), sheet = %sheet_name, "Skipped duplicate journal row");
        } else {
            info!(file = %file.display(), sheet = %sheet_name, row = row_index, "Appended journal row");
        }

        Ok(JournalReceipt {
            duplicated,
            file_path: file,
            sheet: sheet_name,
            row_index,
            entry,
        })
    }

    fn append_audit(
        &self,
        entry: &JournalEntry,
        year: i32,
        sheet: &str,
        row_index: usize,
        duplicated: bool,
    ) -> SebitResult<()> {
        let dir = self.year_dir(&entry.company, year);
        std::fs::create_dir_all(&dir)?;
        let line = json!({
            "ts": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            "company": entry.company,
            "year": year,
            "sheet": sheet,
            "rowIndex": row_index,
            "action": if duplicated { "skip-duplicate" } else { "append-row" },
            "row": [
                entry.date_text(),
                entry.vendor,
                entry.description,
                entry.account,
                entry.debit,
                entry.credit,
                entry.amount(),
                entry.currency,
            ],
        });

        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(AUDIT_LOG))?;
        writeln!(log, "{}", serde_json::to_string(&line)?)?;
        Ok(())
    }
}

impl Model for JournalBook {
    fn name(&self) -> &'static str {
        "journal"
    }

    fn label(&self) -> &'static str {
        "Journal Book Writer"
    }

    fn run(&self, input: &ModelInput) -> SebitResult<Node> {
        self.record(input).map(Node::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn entry_input() -> serde_json::Value {
        json!({
            "company": "Acme",
            "date": "2025-03-02",
            "vendor": "Cafe",
            "description": "coffee",
            "account": "Meals",
            "debit": "6,000",
            "language": "en"
        })
    }

    fn validation_message(value: serde_json::Value) -> String {
        match JournalEntry::from_input(&ModelInput::new(value)) {
            Err(SebitError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_squash_replaces_illegal_chars() {
        assert_eq!(squash(" a/b:c*d "), "a_b_c_d");
        assert_eq!(squash("Acme"), "Acme");
    }

    #[test]
    fn test_validation_order() {
        assert_eq!(validation_message(json!({})), "company is required.");
        assert_eq!(
            validation_message(json!({ "company": "A" })),
            "date is required."
        );
        assert!(validation_message(json!({ "company": "A", "date": "03/02/2025" }))
            .starts_with("date must be YYYY-MM-DD"));
        assert_eq!(
            validation_message(json!({ "company": "A", "date": "2025-03-02" })),
            "account is required."
        );
        assert_eq!(
            validation_message(json!({
                "company": "A", "date": "2025-03-02", "account": "x", "debit": -1
            })),
            "amount cannot be negative."
        );
        assert_eq!(
            validation_message(json!({
                "company": "A", "date": "2025-03-02", "account": "x", "debit": 1, "credit": 1
            })),
            "exactly one of debit or credit must be positive."
        );
        assert_eq!(
            validation_message(json!({
                "company": "A", "date": "2025-03-02", "account": "x"
            })),
            "exactly one of debit or credit must be positive."
        );
    }

    #[test]
    fn test_free_text_is_rejected() {
        let msg = validation_message(json!({ "company": "A", "text": "2025년 3월 2일 커피" }));
        assert!(msg.contains("free-text"));
    }

    #[test]
    fn test_language_defaults() {
        let entry = JournalEntry::from_input(&ModelInput::new(json!({
            "company": "A", "date": "2025-11-05", "account": "현금", "credit": 10
        })))
        .unwrap();
        assert_eq!(entry.language, Language::Ko);
        assert_eq!(entry.vendor, "미지정거래처");
        assert_eq!(entry.description, "지출");
        assert_eq!(entry.currency, "KRW");
        assert_eq!(entry.sheet_name(), "11");
    }

    #[test]
    fn test_record_appends_then_detects_duplicate() {
        let dir = TempDir::new().unwrap();
        let book = JournalBook::new(dir.path());
        let input = ModelInput::new(entry_input());

        let first = book.record(&input).unwrap();
        assert!(!first.duplicated);
        assert_eq!(first.sheet, "03");
        assert_eq!(first.row_index, 2);
        assert_eq!(
            first.file_path,
            dir.path().join("Acme").join("2025").join("Cafe_2025.xlsx")
        );
        assert!(first.file_path.exists());

        let second = book.record(&input).unwrap();
        assert!(second.duplicated);
        assert_eq!(second.row_index, 2);

        let audit = std::fs::read_to_string(dir.path().join("Acme/2025").join(AUDIT_LOG)).unwrap();
        let lines: Vec<&str> = audit.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"append-row\""));
        assert!(lines[1].contains("\"skip-duplicate\""));
    }

    #[test]
    fn test_receipt_node_shape() {
        let dir = TempDir::new().unwrap();
        let book = JournalBook::new(dir.path());
        let node = book.run(&ModelInput::new(entry_input())).unwrap();
        let json = node.to_json();
        assert_eq!(json["ok"], json!(true));
        assert_eq!(json["rowIndex"], json!(2));
        assert_eq!(json["entry"]["debit"], json!(6000));
        assert_eq!(json["entry"]["currency"], json!("USD"));
        assert_eq!(json["entry"]["language"], json!("en"));
    }
}
