//! Table rewrite shared by the concrete migration steps.
//!
//! Rows are read and decoded under the old shape, transformed, and merged
//! into the new shape in memory.  The old table is dropped only after every
//! row has been staged, so a failing transform leaves it untouched even
//! outside a transaction.
//!
//! Dropping a table drops its triggers; steps that rewrite a table carrying
//! triggers must recreate them afterwards.

use rusqlite::Connection;

use crate::error::Result;
use crate::schema::{Row, TableSchema};

/// Rewrite `old` into `new`.
///
/// `transform` receives each decoded old row and returns the fields to set
/// on the new row: values for columns introduced by `new`, or replacements
/// for carried-over ones.  Columns of `new` it does not mention keep the old
/// value, or `None` when `old` did not have them.  Returns the number of rows
/// written.
pub fn rewrite_table<F>(conn: &Connection, old: &TableSchema, new: &TableSchema, transform: F) -> Result<usize>
where
    F: Fn(&Row) -> Result<Row>,
{
    let old_rows = old.read_rows(conn)?;
    let row_type = new.row_type();

    let mut staged = Vec::with_capacity(old_rows.len());
    for row in &old_rows {
        let overrides = transform(row)?;
        let merged = row_type.merge(row, overrides)?;
        new.encode_row(&merged)?;
        staged.push(merged);
    }

    old.drop_table(conn)?;
    new.create(conn)?;
    let written = new.insert_rows(conn, &staged)?;

    tracing::debug!(
        table = new.name,
        from_columns = old.columns.len(),
        to_columns = new.columns.len(),
        rows = written,
        "rewrote table"
    );
    Ok(written)
}

/// Rewrite carrying fields over unchanged.
pub fn rewrite_table_as_is(conn: &Connection, old: &TableSchema, new: &TableSchema) -> Result<usize> {
    rewrite_table(conn, old, new, |_| Ok(Row::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Codec, Value};
    use crate::error::StoreError;
    use crate::schema::Column;

    const OLD: TableSchema = TableSchema::new(
        "items",
        &[Column::new("name", Codec::Str), Column::new("qty", Codec::Int)],
    );
    const NEW: TableSchema = TableSchema::new(
        "items",
        &[
            Column::new("name", Codec::Str),
            Column::new("qty", Codec::Int),
            Column::new("price", Codec::Float).not_null(),
        ],
    );
    const OLD_SINGLE: TableSchema = TableSchema::new("prefs", &[Column::new("mode", Codec::Str)]).singleton();
    const NEW_SINGLE: TableSchema = TableSchema::new(
        "prefs",
        &[Column::new("mode", Codec::Str), Column::new("quiet", Codec::Bool)],
    )
    .singleton();

    fn seed(conn: &Connection) {
        OLD.create(conn).unwrap();
        for (name, qty) in [("bolt", 10), ("nut", 0), ("washer", 3)] {
            let row = Row::new().with("name", Value::from(name)).with("qty", Value::Int(qty));
            OLD.insert_row(conn, &row).unwrap();
        }
    }

    #[test]
    fn adds_column_with_derived_value() {
        let conn = Connection::open_in_memory().unwrap();
        seed(&conn);

        let written = rewrite_table(&conn, &OLD, &NEW, |row| {
            let qty = row.int("qty").unwrap_or(0);
            Ok(Row::new().with("price", Value::Float(qty as f64 * 0.5)))
        })
        .unwrap();

        assert_eq!(written, 3);
        let rows = NEW.read_rows(&conn).unwrap();
        assert_eq!(rows[0].str("name"), Some("bolt"));
        assert_eq!(rows[0].float("price"), Some(5.0));
        assert_eq!(rows[2].int("qty"), Some(3));
    }

    #[test]
    fn downgrade_drops_new_column() {
        let conn = Connection::open_in_memory().unwrap();
        seed(&conn);
        let before = OLD.read_rows(&conn).unwrap();

        rewrite_table(&conn, &OLD, &NEW, |_| Ok(Row::new().with("price", Value::Float(1.0)))).unwrap();
        rewrite_table_as_is(&conn, &NEW, &OLD).unwrap();

        assert_eq!(OLD.read_rows(&conn).unwrap(), before);
    }

    #[test]
    fn failing_transform_leaves_table_intact() {
        let conn = Connection::open_in_memory().unwrap();
        seed(&conn);

        let err = rewrite_table(&conn, &OLD, &NEW, |row| {
            if row.str("name") == Some("washer") {
                return Err(StoreError::transform("items", "washers are not priced"));
            }
            Ok(Row::new().with("price", Value::Float(1.0)))
        })
        .unwrap_err();

        assert!(matches!(err, StoreError::Transform { .. }));
        assert_eq!(OLD.count(&conn).unwrap(), 3);
        assert_eq!(OLD.read_rows(&conn).unwrap().len(), 3);
        let columns: i64 = conn
            .query_row("SELECT COUNT(*) FROM pragma_table_info('items')", [], |r| r.get(0))
            .unwrap();
        assert_eq!(columns, 2);
    }

    #[test]
    fn unencodable_merge_fails_before_drop() {
        let conn = Connection::open_in_memory().unwrap();
        seed(&conn);

        let err = rewrite_table(&conn, &OLD, &NEW, |_| Ok(Row::new().with("price", Value::from("cheap"))))
            .unwrap_err();

        assert!(matches!(err, StoreError::Value(_)));
        assert_eq!(OLD.count(&conn).unwrap(), 3);
    }

    #[test]
    fn singleton_keeps_latest_row() {
        let conn = Connection::open_in_memory().unwrap();
        OLD_SINGLE.create(&conn).unwrap();
        for mode in ["warn", "error", "ignore"] {
            OLD_SINGLE
                .insert_row(&conn, &Row::new().with("mode", Value::from(mode)))
                .unwrap();
        }

        rewrite_table(&conn, &OLD_SINGLE, &NEW_SINGLE, |_| {
            Ok(Row::new().with("quiet", Value::Bool(false)))
        })
        .unwrap();

        assert_eq!(NEW_SINGLE.count(&conn).unwrap(), 1);
        let rows = NEW_SINGLE.read_rows(&conn).unwrap();
        assert_eq!(rows[0].str("mode"), Some("ignore"));
        assert_eq!(rows[0].bool("quiet"), Some(false));
    }
}
