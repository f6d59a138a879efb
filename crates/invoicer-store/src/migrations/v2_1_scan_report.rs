//! v2.0 -> v2.1 -- `configuration.show_scan_report`.

use rusqlite::Connection;

use crate::codec::{Codec, Value};
use crate::error::Result;
use crate::schema::{Column, Row, TableSchema};

use super::rewrite::{rewrite_table, rewrite_table_as_is};
use super::step::MajorMinorStep;
use super::v2_0_initial;

pub const STEP: MajorMinorStep = MajorMinorStep::new("v2_1_scan_report", (2, 0), (2, 1), upgrade, downgrade);

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
    ],
)
.singleton();

fn upgrade(conn: &Connection) -> Result<()> {
    rewrite_table(conn, &v2_0_initial::CONFIGURATION, &CONFIGURATION, |_| {
        Ok(Row::new().with("show_scan_report", Value::Bool(false)))
    })?;
    Ok(())
}

fn downgrade(conn: &Connection) -> Result<()> {
    rewrite_table_as_is(conn, &CONFIGURATION, &v2_0_initial::CONFIGURATION)?;
    Ok(())
}
