//! v2.1 -> v2.2 -- validators and refresh flags.
//!
//! - `patterns` gains `skip` (exclusion patterns).
//! - `invoices` gains `currency`.
//! - New `validators` and `internal_options` tables.
//! - Triggers raise `needs_update` when patterns change and `needs_refresh`
//!   when validators change.

use rusqlite::Connection;

use crate::codec::{Codec, Value};
use crate::error::Result;
use crate::schema::{Column, Row, TableSchema};

use super::rewrite::{rewrite_table, rewrite_table_as_is};
use super::step::MajorMinorStep;
use super::v2_0_initial;

pub const STEP: MajorMinorStep = MajorMinorStep::new("v2_2_validators", (2, 1), (2, 2), upgrade, downgrade);

pub const DEFAULT_CURRENCY: &str = "euro";

/// Set when the scanned invoices must be re-validated.
pub const NEEDS_REFRESH: &str = "needs_refresh";
/// Set when the patterns changed and documents must be re-scanned.
pub const NEEDS_UPDATE: &str = "needs_update";

pub const PATTERNS: TableSchema = TableSchema::new(
    "patterns",
    &[
        Column::new("pattern", Codec::Path).unique().not_null(),
        Column::new("skip", Codec::Bool).not_null(),
    ],
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
        Column::new("currency", Codec::Str),
    ],
);

pub const VALIDATORS: TableSchema = TableSchema::new(
    "validators",
    &[
        Column::new("filter", Codec::Str),
        Column::new("check", Codec::Str).not_null(),
        Column::new("message", Codec::Str),
    ],
)
.unique_together(&[&["filter", "check"]]);

pub const INTERNAL_OPTIONS: TableSchema = TableSchema::new(
    "internal_options",
    &[
        Column::new("option_name", Codec::Str).primary_key(),
        Column::new("option_value", Codec::Bool),
    ],
);

const CREATE_TRIGGERS_SQL: &str = r#"
CREATE TRIGGER IF NOT EXISTS patterns_insert AFTER INSERT ON patterns
BEGIN
    INSERT OR REPLACE INTO internal_options (option_name, option_value) VALUES ('needs_update', 1);
END;
CREATE TRIGGER IF NOT EXISTS patterns_update AFTER UPDATE ON patterns
BEGIN
    INSERT OR REPLACE INTO internal_options (option_name, option_value) VALUES ('needs_update', 1);
END;
CREATE TRIGGER IF NOT EXISTS patterns_delete AFTER DELETE ON patterns
BEGIN
    INSERT OR REPLACE INTO internal_options (option_name, option_value) VALUES ('needs_update', 1);
END;

CREATE TRIGGER IF NOT EXISTS validators_insert AFTER INSERT ON validators
BEGIN
    INSERT OR REPLACE INTO internal_options (option_name, option_value) VALUES ('needs_refresh', 1);
END;
CREATE TRIGGER IF NOT EXISTS validators_update AFTER UPDATE ON validators
BEGIN
    INSERT OR REPLACE INTO internal_options (option_name, option_value) VALUES ('needs_refresh', 1);
END;
CREATE TRIGGER IF NOT EXISTS validators_delete AFTER DELETE ON validators
BEGIN
    INSERT OR REPLACE INTO internal_options (option_name, option_value) VALUES ('needs_refresh', 1);
END;
"#;

const DROP_TRIGGERS_SQL: &str = r#"
DROP TRIGGER IF EXISTS patterns_insert;
DROP TRIGGER IF EXISTS patterns_update;
DROP TRIGGER IF EXISTS patterns_delete;
DROP TRIGGER IF EXISTS validators_insert;
DROP TRIGGER IF EXISTS validators_update;
DROP TRIGGER IF EXISTS validators_delete;
"#;

fn upgrade(conn: &Connection) -> Result<()> {
    rewrite_table(conn, &v2_0_initial::PATTERNS, &PATTERNS, |_| {
        Ok(Row::new().with("skip", Value::Bool(false)))
    })?;
    rewrite_table(conn, &v2_0_initial::INVOICES, &INVOICES, |_| {
        Ok(Row::new().with("currency", Value::from(DEFAULT_CURRENCY)))
    })?;

    VALIDATORS.create(conn)?;
    INTERNAL_OPTIONS.create(conn)?;
    // Invoices scanned before validators existed have never been checked.
    for (name, value) in [(NEEDS_REFRESH, true), (NEEDS_UPDATE, false)] {
        let row = Row::new()
            .with("option_name", Value::from(name))
            .with("option_value", Value::Bool(value));
        INTERNAL_OPTIONS.insert_row(conn, &row)?;
    }

    create_triggers(conn)
}

fn downgrade(conn: &Connection) -> Result<()> {
    conn.execute_batch(DROP_TRIGGERS_SQL)?;
    VALIDATORS.drop_table(conn)?;
    INTERNAL_OPTIONS.drop_table(conn)?;

    rewrite_table_as_is(conn, &INVOICES, &v2_0_initial::INVOICES)?;
    // Older shapes have no way to express an exclusion; keeping these rows
    // would turn them into inclusions.
    let excluded = PATTERNS.delete_where(conn, "skip", &Value::Bool(true))?;
    if excluded > 0 {
        tracing::warn!(patterns = excluded, "dropped skip patterns on downgrade");
    }
    rewrite_table_as_is(conn, &PATTERNS, &v2_0_initial::PATTERNS)?;
    Ok(())
}

/// Install the flag triggers on `patterns` and `validators`.
pub fn create_triggers(conn: &Connection) -> Result<()> {
    conn.execute_batch(CREATE_TRIGGERS_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::NaiveDate;

    use super::*;
    use crate::migrations::step::MigrationStep;
    use crate::migrations::v2_1_scan_report;
    use crate::version::Version;

    fn at_2_1() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        v2_0_initial::create(&conn).unwrap();
        v2_1_scan_report::STEP
            .upgrade(&conn, &Version::new(2, 0, 0), &Version::new(2, 1, 0))
            .unwrap();

        let pattern = Row::new().with("pattern", Value::Path(PathBuf::from("/srv/invoices/*.doc")));
        v2_0_initial::PATTERNS.insert_row(&conn, &pattern).unwrap();
        let invoice = Row::new()
            .with("doc_filename", Value::Path(PathBuf::from("/srv/invoices/2019_001.doc")))
            .with("year", Value::Int(2019))
            .with("number", Value::Int(1))
            .with("name", Value::from("Alpha Studio"))
            .with("tax_code", Value::from("BTAALP80A01H501X"))
            .with("city", Value::from("Roma"))
            .with("date", Value::Date(NaiveDate::from_ymd_opt(2019, 1, 3).unwrap()))
            .with("income", Value::Float(1200.0));
        v2_0_initial::INVOICES.insert_row(&conn, &invoice).unwrap();
        conn
    }

    fn flag(conn: &Connection, name: &str) -> Option<bool> {
        INTERNAL_OPTIONS
            .read_rows_where(conn, "option_name", &Value::from(name))
            .unwrap()
            .first()
            .and_then(|row| row.bool("option_value"))
    }

    #[test]
    fn upgrade_creates_tables_and_defaults() {
        let conn = at_2_1();
        STEP.upgrade(&conn, &Version::new(2, 1, 0), &Version::new(2, 2, 0)).unwrap();

        let invoices = INVOICES.read_rows(&conn).unwrap();
        assert_eq!(invoices[0].str("currency"), Some(DEFAULT_CURRENCY));
        assert_eq!(invoices[0].float("income"), Some(1200.0));
        let patterns = PATTERNS.read_rows(&conn).unwrap();
        assert_eq!(patterns[0].bool("skip"), Some(false));

        assert_eq!(VALIDATORS.count(&conn).unwrap(), 0);
        assert_eq!(flag(&conn, NEEDS_REFRESH), Some(true));
        assert_eq!(flag(&conn, NEEDS_UPDATE), Some(false));
    }

    #[test]
    fn triggers_raise_flags() {
        let conn = at_2_1();
        STEP.upgrade(&conn, &Version::new(2, 1, 0), &Version::new(2, 2, 0)).unwrap();
        INTERNAL_OPTIONS.delete_all(&conn).unwrap();

        let validator = Row::new()
            .with("filter", Value::from("year >= 2019"))
            .with("check", Value::from("income > 0"))
            .with("message", Value::from("income must be positive"));
        VALIDATORS.insert_row(&conn, &validator).unwrap();
        assert_eq!(flag(&conn, NEEDS_REFRESH), Some(true));
        assert_eq!(flag(&conn, NEEDS_UPDATE), None);

        PATTERNS.delete_all(&conn).unwrap();
        assert_eq!(flag(&conn, NEEDS_UPDATE), Some(true));
    }

    #[test]
    fn downgrade_removes_everything_added() {
        let conn = at_2_1();
        let invoices_before = v2_0_initial::INVOICES.read_rows(&conn).unwrap();
        let patterns_before = v2_0_initial::PATTERNS.read_rows(&conn).unwrap();

        let (from, to) = (Version::new(2, 1, 0), Version::new(2, 2, 0));
        STEP.upgrade(&conn, &from, &to).unwrap();
        STEP.downgrade(&conn, &to, &from).unwrap();

        assert!(!VALIDATORS.exists(&conn).unwrap());
        assert!(!INTERNAL_OPTIONS.exists(&conn).unwrap());
        let triggers: i64 = conn
            .query_row("SELECT COUNT(*) FROM sqlite_master WHERE type = 'trigger'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(triggers, 0);
        assert_eq!(v2_0_initial::INVOICES.read_rows(&conn).unwrap(), invoices_before);
        assert_eq!(v2_0_initial::PATTERNS.read_rows(&conn).unwrap(), patterns_before);
    }

    #[test]
    fn downgrade_discards_skip_patterns() {
        let conn = at_2_1();
        let (from, to) = (Version::new(2, 1, 0), Version::new(2, 2, 0));
        STEP.upgrade(&conn, &from, &to).unwrap();
        let skip = Row::new()
            .with("pattern", Value::Path(PathBuf::from("/srv/invoices/draft_*.doc")))
            .with("skip", Value::Bool(true));
        PATTERNS.insert_row(&conn, &skip).unwrap();

        STEP.downgrade(&conn, &to, &from).unwrap();

        let patterns: Vec<_> = v2_0_initial::PATTERNS
            .read_rows(&conn)
            .unwrap()
            .iter()
            .filter_map(|row| row.path("pattern").map(PathBuf::from))
            .collect();
        assert_eq!(patterns, vec![PathBuf::from("/srv/invoices/*.doc")]);
    }
}
