//! Domain model structs for the current schema shape.
//!
//! Each struct converts to and from a [`Row`] of its table so that all
//! storage goes through the column codecs.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::codec::Value;
use crate::error::{Result, StoreError};
use crate::migrations::v2_2_validators::DEFAULT_CURRENCY;
use crate::migrations::v2_3_field_names::default_list_field_names;
use crate::schema::Row;

fn missing(table: &str, column: &str) -> StoreError {
    StoreError::MissingField {
        table: table.to_string(),
        column: column.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Program options.  Stored as a singleton: the latest row wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Configuration {
    /// What to do with validation warnings (`log`, `ignore`, `raise`).
    pub warning_mode: String,
    /// What to do with validation errors.
    pub error_mode: String,
    /// Only rescan documents changed since the last scan.
    pub partial_update: bool,
    /// Drop invoices whose document no longer exists.
    pub remove_orphaned: bool,
    /// Print a header line in listings.
    pub header: bool,
    /// Print totals in reports.
    pub total: bool,
    /// Report grouping (`year`, `month`, ...).
    pub stats_group: String,
    /// Print a summary after each scan.
    pub show_scan_report: bool,
    /// Invoice fields shown by listings.
    pub list_field_names: Vec<String>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            warning_mode: "log".to_string(),
            error_mode: "raise".to_string(),
            partial_update: true,
            remove_orphaned: false,
            header: true,
            total: true,
            stats_group: "month".to_string(),
            show_scan_report: false,
            list_field_names: default_list_field_names(),
        }
    }
}

impl Configuration {
    /// Missing fields fall back to [`Configuration::default`].
    pub fn from_row(row: &Row) -> Self {
        let d = Self::default();
        let text = |name: &str, fallback: String| row.str(name).map(str::to_string).unwrap_or(fallback);
        Self {
            warning_mode: text("warning_mode", d.warning_mode),
            error_mode: text("error_mode", d.error_mode),
            partial_update: row.bool("partial_update").unwrap_or(d.partial_update),
            remove_orphaned: row.bool("remove_orphaned").unwrap_or(d.remove_orphaned),
            header: row.bool("header").unwrap_or(d.header),
            total: row.bool("total").unwrap_or(d.total),
            stats_group: text("stats_group", d.stats_group),
            show_scan_report: row.bool("show_scan_report").unwrap_or(d.show_scan_report),
            list_field_names: row
                .str_tuple("list_field_names")
                .map(<[String]>::to_vec)
                .unwrap_or(d.list_field_names),
        }
    }

    pub fn to_row(&self) -> Row {
        Row::new()
            .with("warning_mode", Value::from(self.warning_mode.as_str()))
            .with("error_mode", Value::from(self.error_mode.as_str()))
            .with("partial_update", Value::Bool(self.partial_update))
            .with("remove_orphaned", Value::Bool(self.remove_orphaned))
            .with("header", Value::Bool(self.header))
            .with("total", Value::Bool(self.total))
            .with("stats_group", Value::from(self.stats_group.as_str()))
            .with("show_scan_report", Value::Bool(self.show_scan_report))
            .with("list_field_names", Value::StrTuple(self.list_field_names.clone()))
    }
}

// ---------------------------------------------------------------------------
// Invoice
// ---------------------------------------------------------------------------

/// Fields extracted from one invoice document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invoice {
    /// Absolute path of the source document; primary key.
    pub doc_filename: PathBuf,
    pub year: i64,
    pub number: i64,
    /// Customer name.
    pub name: String,
    /// Customer tax code.
    pub tax_code: String,
    pub city: String,
    pub date: NaiveDate,
    pub income: f64,
    pub currency: String,
}

impl Invoice {
    pub fn from_row(row: &Row) -> Result<Self> {
        let table = "invoices";
        let text = |name: &str| {
            row.str(name)
                .map(str::to_string)
                .ok_or_else(|| missing(table, name))
        };
        Ok(Self {
            doc_filename: row
                .path("doc_filename")
                .map(PathBuf::from)
                .ok_or_else(|| missing(table, "doc_filename"))?,
            year: row.int("year").ok_or_else(|| missing(table, "year"))?,
            number: row.int("number").ok_or_else(|| missing(table, "number"))?,
            name: text("name")?,
            tax_code: text("tax_code")?,
            city: text("city")?,
            date: row.date("date").ok_or_else(|| missing(table, "date"))?,
            income: row.float("income").ok_or_else(|| missing(table, "income"))?,
            currency: row
                .str("currency")
                .unwrap_or(DEFAULT_CURRENCY)
                .to_string(),
        })
    }

    pub fn to_row(&self) -> Row {
        Row::new()
            .with("doc_filename", Value::Path(self.doc_filename.clone()))
            .with("year", Value::Int(self.year))
            .with("number", Value::Int(self.number))
            .with("name", Value::from(self.name.as_str()))
            .with("tax_code", Value::from(self.tax_code.as_str()))
            .with("city", Value::from(self.city.as_str()))
            .with("date", Value::Date(self.date))
            .with("income", Value::Float(self.income))
            .with("currency", Value::from(self.currency.as_str()))
    }
}

/// When a document was last scanned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanDateTime {
    pub doc_filename: PathBuf,
    pub scan_date_time: NaiveDateTime,
}

impl ScanDateTime {
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            doc_filename: row
                .path("doc_filename")
                .map(PathBuf::from)
                .ok_or_else(|| missing("scan_date_times", "doc_filename"))?,
            scan_date_time: row
                .datetime("scan_date_time")
                .ok_or_else(|| missing("scan_date_times", "scan_date_time"))?,
        })
    }
}

// ---------------------------------------------------------------------------
// Pattern
// ---------------------------------------------------------------------------

/// A glob pattern selecting documents to scan, or to skip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pattern {
    pub pattern: PathBuf,
    /// Exclude matching documents instead of including them.
    pub skip: bool,
}

impl Pattern {
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            pattern: row
                .path("pattern")
                .map(PathBuf::from)
                .ok_or_else(|| missing("patterns", "pattern"))?,
            skip: row.bool("skip").unwrap_or(false),
        })
    }

    pub fn to_row(&self) -> Row {
        Row::new()
            .with("pattern", Value::Path(self.pattern.clone()))
            .with("skip", Value::Bool(self.skip))
    }
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

/// A user-defined check applied to scanned invoices.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Validator {
    /// Only invoices matching this expression are checked.  `None` checks all.
    pub filter: Option<String>,
    /// Expression that must hold.
    pub check: String,
    /// Message reported when `check` fails.
    pub message: Option<String>,
}

impl Validator {
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            filter: row.str("filter").map(str::to_string),
            check: row
                .str("check")
                .map(str::to_string)
                .ok_or_else(|| missing("validators", "check"))?,
            message: row.str("message").map(str::to_string),
        })
    }

    pub fn to_row(&self) -> Row {
        Row::new()
            .with("filter", self.filter.as_deref().map(Value::from))
            .with("check", Value::from(self.check.as_str()))
            .with("message", self.message.as_deref().map(Value::from))
    }
}
