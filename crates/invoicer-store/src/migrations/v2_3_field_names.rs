//! v2.2 -> v2.3 -- `configuration.list_field_names`.

use rusqlite::Connection;

use crate::codec::{Codec, Value};
use crate::error::Result;
use crate::schema::{Column, Row, TableSchema};

use super::rewrite::{rewrite_table, rewrite_table_as_is};
use super::step::MajorMinorStep;
use super::v2_1_scan_report;

pub const STEP: MajorMinorStep = MajorMinorStep::new("v2_3_field_names", (2, 2), (2, 3), upgrade, downgrade);

/// Invoice fields shown by listings, in display order.
pub const DEFAULT_LIST_FIELD_NAMES: &[&str] = &[
    "doc_filename",
    "year",
    "number",
    "name",
    "tax_code",
    "city",
    "date",
    "income",
    "currency",
];

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
        Column::new("show_scan_report", Codec::Bool),
        Column::new("list_field_names", Codec::StrTuple),
    ],
)
.singleton();

pub fn default_list_field_names() -> Vec<String> {
    DEFAULT_LIST_FIELD_NAMES.iter().map(|s| s.to_string()).collect()
}

fn upgrade(conn: &Connection) -> Result<()> {
    rewrite_table(conn, &v2_1_scan_report::CONFIGURATION, &CONFIGURATION, |_| {
        Ok(Row::new().with("list_field_names", Value::StrTuple(default_list_field_names())))
    })?;
    Ok(())
}

fn downgrade(conn: &Connection) -> Result<()> {
    rewrite_table_as_is(conn, &CONFIGURATION, &v2_1_scan_report::CONFIGURATION)?;
    Ok(())
}
