//! CRUD operations for scan [`Pattern`]s, [`Validator`]s and the internal
//! refresh flags their triggers maintain.

use std::path::Path;

use crate::codec::Value;
use crate::database::Database;
use crate::error::Result;
use crate::migrations::v2_2_validators::{NEEDS_REFRESH, NEEDS_UPDATE};
use crate::models::{Pattern, Validator};
use crate::schema::Row;
use crate::tables::{INTERNAL_OPTIONS, PATTERNS, VALIDATORS};

impl Database {
    // ------------------------------------------------------------------
    // Patterns
    // ------------------------------------------------------------------

    /// Add a pattern, replacing the `skip` flag of an identical one.
    pub fn add_pattern(&self, pattern: &Pattern) -> Result<()> {
        PATTERNS.replace_row(self.conn(), &pattern.to_row())
    }

    /// Remove a pattern.  Returns `true` if a row was deleted.
    pub fn remove_pattern(&self, pattern: &Path) -> Result<bool> {
        let key = Value::Path(pattern.to_path_buf());
        Ok(PATTERNS.delete_where(self.conn(), "pattern", &key)? > 0)
    }

    pub fn list_patterns(&self) -> Result<Vec<Pattern>> {
        PATTERNS.read_rows(self.conn())?.iter().map(Pattern::from_row).collect()
    }

    // ------------------------------------------------------------------
    // Validators
    // ------------------------------------------------------------------

    /// Store a validator.  One with the same filter and check replaces the
    /// stored one.
    pub fn add_validator(&self, validator: &Validator) -> Result<()> {
        VALIDATORS.replace_row(self.conn(), &validator.to_row())
    }

    pub fn list_validators(&self) -> Result<Vec<Validator>> {
        VALIDATORS.read_rows(self.conn())?.iter().map(Validator::from_row).collect()
    }

    /// Delete every validator.  Returns the number deleted.
    pub fn clear_validators(&self) -> Result<usize> {
        VALIDATORS.delete_all(self.conn())
    }

    // ------------------------------------------------------------------
    // Internal flags
    // ------------------------------------------------------------------

    /// Whether invoices must be re-validated.
    pub fn needs_refresh(&self) -> Result<bool> {
        self.flag(NEEDS_REFRESH)
    }

    /// Whether documents must be re-scanned.
    pub fn needs_update(&self) -> Result<bool> {
        self.flag(NEEDS_UPDATE)
    }

    pub fn clear_needs_refresh(&self) -> Result<()> {
        self.set_flag(NEEDS_REFRESH, false)
    }

    pub fn clear_needs_update(&self) -> Result<()> {
        self.set_flag(NEEDS_UPDATE, false)
    }

    fn flag(&self, name: &str) -> Result<bool> {
        let rows = INTERNAL_OPTIONS.read_rows_where(self.conn(), "option_name", &Value::from(name))?;
        Ok(rows.first().and_then(|row| row.bool("option_value")).unwrap_or(false))
    }

    fn set_flag(&self, name: &str, value: bool) -> Result<()> {
        let row = Row::new()
            .with("option_name", Value::from(name))
            .with("option_value", Value::Bool(value));
        INTERNAL_OPTIONS.replace_row(self.conn(), &row)
    }
}
