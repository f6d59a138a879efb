//! CRUD operations for [`Invoice`] and [`ScanDateTime`] records.

use std::path::Path;

use chrono::NaiveDateTime;

use crate::codec::Value;
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Invoice, ScanDateTime};
use crate::schema::Row;
use crate::tables::{INVOICES, SCAN_DATE_TIMES};

impl Database {
    // ------------------------------------------------------------------
    // Create / update
    // ------------------------------------------------------------------

    /// Insert an invoice, replacing any stored for the same document.
    pub fn store_invoice(&self, invoice: &Invoice) -> Result<()> {
        INVOICES.replace_row(self.conn(), &invoice.to_row())
    }

    /// Record when `doc_filename` was scanned.
    pub fn store_scan_date_time(&self, doc_filename: &Path, scanned_at: NaiveDateTime) -> Result<()> {
        let row = Row::new()
            .with("doc_filename", Value::Path(doc_filename.to_path_buf()))
            .with("scan_date_time", Value::DateTime(scanned_at));
        SCAN_DATE_TIMES.replace_row(self.conn(), &row)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch the invoice extracted from `doc_filename`.
    pub fn get_invoice(&self, doc_filename: &Path) -> Result<Invoice> {
        let rows = INVOICES.read_rows_where(
            self.conn(),
            "doc_filename",
            &Value::Path(doc_filename.to_path_buf()),
        )?;
        rows.first().map(Invoice::from_row).ok_or(StoreError::NotFound)?
    }

    /// List all invoices, ordered by date then number.
    pub fn list_invoices(&self) -> Result<Vec<Invoice>> {
        let mut invoices = INVOICES
            .read_rows(self.conn())?
            .iter()
            .map(Invoice::from_row)
            .collect::<Result<Vec<_>>>()?;
        invoices.sort_by(|a, b| a.date.cmp(&b.date).then(a.number.cmp(&b.number)));
        Ok(invoices)
    }

    pub fn get_scan_date_time(&self, doc_filename: &Path) -> Result<Option<NaiveDateTime>> {
        let rows = SCAN_DATE_TIMES.read_rows_where(
            self.conn(),
            "doc_filename",
            &Value::Path(doc_filename.to_path_buf()),
        )?;
        Ok(rows.first().and_then(|row| row.datetime("scan_date_time")))
    }

    pub fn list_scan_date_times(&self) -> Result<Vec<ScanDateTime>> {
        SCAN_DATE_TIMES
            .read_rows(self.conn())?
            .iter()
            .map(ScanDateTime::from_row)
            .collect()
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete the invoice and scan time of `doc_filename`.  Returns `true` if
    /// an invoice was deleted.
    pub fn delete_invoice(&self, doc_filename: &Path) -> Result<bool> {
        let key = Value::Path(doc_filename.to_path_buf());
        SCAN_DATE_TIMES.delete_where(self.conn(), "doc_filename", &key)?;
        Ok(INVOICES.delete_where(self.conn(), "doc_filename", &key)? > 0)
    }
}
