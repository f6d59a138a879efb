//! Schema-versioned migrations.
//!
//! The schema version lives as `major.minor.patch` text in the single row of
//! the `version` table.  Each historical shape of a table is a constant
//! [`TableSchema`](crate::schema::TableSchema) owned by the step module that
//! introduced it; steps are chained and applied by the [`runner`].
//!
//! To change the schema: add a `vX_Y_*` module with the new shapes and a
//! [`MajorMinorStep`], register it in [`Registry::standard`], bump the
//! workspace version, and re-export the new shapes from [`crate::tables`].

pub mod rewrite;
pub mod runner;
pub mod step;
pub mod v2_0_initial;
pub mod v2_1_scan_report;
pub mod v2_2_validators;
pub mod v2_3_field_names;

use rusqlite::Connection;

use crate::codec::{Codec, Value};
use crate::error::{Result, StoreError};
use crate::schema::{Column, Row, TableSchema};
use crate::version::Version;

pub use rewrite::{rewrite_table, rewrite_table_as_is};
pub use runner::{
    apply_step, full_downgrade, full_upgrade, standard_registry, AppliedStep, Direction,
    MigrationReport, Plan, PlannedStep, Registry,
};
pub use step::{MajorMinorStep, MigrationStep, PatchStep, StepFn};

/// The reserved version record.
pub const VERSION_TABLE: TableSchema =
    TableSchema::new("version", &[Column::new("version", Codec::Str).not_null()]).singleton();

/// Stored schema version, or `None` when the database has no version table.
pub fn read_version(conn: &Connection) -> Result<Option<Version>> {
    if !VERSION_TABLE.exists(conn)? {
        return Ok(None);
    }
    let rows = VERSION_TABLE.read_rows(conn)?;
    let text = rows
        .first()
        .and_then(|row| row.str("version"))
        .ok_or(StoreError::Uninitialized)?;
    Ok(Some(Version::parse(text)?))
}

/// Replace the version record, creating the table if needed.
pub fn write_version(conn: &Connection, version: &Version) -> Result<()> {
    if !VERSION_TABLE.exists(conn)? {
        VERSION_TABLE.create(conn)?;
    }
    VERSION_TABLE.delete_all(conn)?;
    let row = Row::new().with("version", Value::Str(version.to_string()));
    VERSION_TABLE.insert_row(conn, &row)
}
