//! v2.0 -- Initial schema.
//!
//! Creates the `version` record and the four data tables: `configuration`,
//! `patterns`, `invoices` and `scan_date_times`.

use rusqlite::Connection;

use crate::codec::Codec;
use crate::error::Result;
use crate::schema::{Column, TableSchema};
use crate::version::Version;

use super::write_version;

pub const VERSION: Version = Version::new(2, 0, 0);

/// Program options; the latest row wins.
pub const CONFIGURATION: TableSchema = TableSchema::new(
    "configuration",
    &[
        Column::new("warning_mode", Codec::Str),
        Column::new("error_mode", Codec::Str),
        Column::new("partial_update", Codec::Bool),
        Column::new("remove_orphaned", Codec::Bool),
        Column::new("header", Codec::Bool),
        Column::new("total", Codec::Bool),
        Column::new("stats_group", Codec::Str),
    ],
)
.singleton();

/// Glob patterns selecting the documents to scan.
pub const PATTERNS: TableSchema = TableSchema::new(
    "patterns",
    &[Column::new("pattern", Codec::Path).unique().not_null()],
);

pub const INVOICES: TableSchema = TableSchema::new(
    "invoices",
    &[
        Column::new("doc_filename", Codec::Path).primary_key(),
        Column::new("year", Codec::Int),
        Column::new("number", Codec::Int),
        Column::new("name", Codec::Str),
        Column::new("tax_code", Codec::Str),
        Column::new("city", Codec::Str),
        Column::new("date", Codec::Date),
        Column::new("income", Codec::Float),
    ],
);

/// When each document was last scanned.
pub const SCAN_DATE_TIMES: TableSchema = TableSchema::new(
    "scan_date_times",
    &[
        Column::new("doc_filename", Codec::Path).primary_key(),
        Column::new("scan_date_time", Codec::DateTime),
    ],
);

/// Create an empty 2.0.0 database.
pub fn create(conn: &Connection) -> Result<()> {
    for table in [&CONFIGURATION, &PATTERNS, &INVOICES, &SCAN_DATE_TIMES] {
        table.create(conn)?;
    }
    write_version(conn, &VERSION)
}
