//! SQL operations driven by a [`TableSchema`].
//!
//! Everything that reads or writes a table goes through these helpers so that
//! values are always transcoded by the column codecs declared for the shape
//! in force.

use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, OptionalExtension};

use crate::codec::Value;
use crate::error::{Result, StoreError};
use crate::schema::{Row, TableSchema};

/// Quote an SQL identifier.
pub(crate) fn ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

impl TableSchema {
    /// `CREATE TABLE` statement for this shape.
    pub fn create_sql(&self) -> String {
        let mut defs: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                let mut def = format!("{} {}", ident(c.name), c.codec.sql_type());
                if c.primary_key {
                    def.push_str(" PRIMARY KEY");
                }
                if c.unique {
                    def.push_str(" UNIQUE");
                }
                if c.not_null {
                    def.push_str(" NOT NULL");
                }
                def
            })
            .collect();

        for group in self.unique_together {
            let cols: Vec<String> = group.iter().map(|c| ident(c)).collect();
            defs.push(format!("UNIQUE ({})", cols.join(", ")));
        }

        format!("CREATE TABLE {} ({})", ident(self.name), defs.join(", "))
    }

    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute_batch(&self.create_sql())?;
        Ok(())
    }

    pub fn drop_table(&self, conn: &Connection) -> Result<()> {
        conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", ident(self.name)))?;
        Ok(())
    }

    pub fn exists(&self, conn: &Connection) -> Result<bool> {
        let found = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [self.name],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Read and decode every row, oldest first.  A singleton table yields at
    /// most its most recently inserted row.
    pub fn read_rows(&self, conn: &Connection) -> Result<Vec<Row>> {
        let limit = if self.singleton {
            " ORDER BY rowid DESC LIMIT 1"
        } else {
            " ORDER BY rowid ASC"
        };
        self.select(conn, limit, Vec::new())
    }

    /// Rows whose `column` equals `value` (encoded with that column's codec).
    pub fn read_rows_where(&self, conn: &Connection, column: &str, value: &Value) -> Result<Vec<Row>> {
        let raw = self.encode_filter(column, value)?;
        let clause = format!(" WHERE {} = ?1 ORDER BY rowid ASC", ident(column));
        self.select(conn, &clause, vec![raw])
    }

    /// Delete rows whose `column` equals `value`.  Returns the number deleted.
    pub fn delete_where(&self, conn: &Connection, column: &str, value: &Value) -> Result<usize> {
        let raw = self.encode_filter(column, value)?;
        let sql = format!("DELETE FROM {} WHERE {} = ?1", ident(self.name), ident(column));
        Ok(conn.execute(&sql, [raw])?)
    }

    pub fn delete_all(&self, conn: &Connection) -> Result<usize> {
        Ok(conn.execute(&format!("DELETE FROM {}", ident(self.name)), [])?)
    }

    pub fn count(&self, conn: &Connection) -> Result<usize> {
        let n: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", ident(self.name)),
            [],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }

    pub fn insert_row(&self, conn: &Connection, row: &Row) -> Result<()> {
        self.write(conn, "INSERT", row)
    }

    /// `INSERT OR REPLACE`: a row clashing on a key replaces the stored one.
    pub fn replace_row(&self, conn: &Connection, row: &Row) -> Result<()> {
        self.write(conn, "INSERT OR REPLACE", row)
    }

    pub fn insert_rows<'r>(&self, conn: &Connection, rows: impl IntoIterator<Item = &'r Row>) -> Result<usize> {
        let mut count = 0;
        for row in rows {
            self.insert_row(conn, row)?;
            count += 1;
        }
        Ok(count)
    }

    /// Encode `row` in column order.
    pub fn encode_row(&self, row: &Row) -> Result<Vec<SqlValue>> {
        for name in row.names() {
            if self.column(name).is_none() {
                return Err(StoreError::UnknownColumn {
                    table: self.name.to_string(),
                    column: name.to_string(),
                });
            }
        }
        self.columns
            .iter()
            .map(|c| c.codec.encode(row.get(c.name)).map_err(StoreError::from))
            .collect()
    }

    /// Decode raw values given in column order.
    pub fn decode_row(&self, raw: &[SqlValue]) -> Result<Row> {
        let mut row = Row::new();
        for (column, value) in self.columns.iter().zip(raw) {
            let decoded = column
                .codec
                .decode(value)
                .map_err(|e| e.with_column(column.name))?;
            row.set(column.name, decoded);
        }
        Ok(row)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn select(&self, conn: &Connection, tail: &str, params: Vec<SqlValue>) -> Result<Vec<Row>> {
        let cols: Vec<String> = self.columns.iter().map(|c| ident(c.name)).collect();
        let sql = format!("SELECT {} FROM {}{}", cols.join(", "), ident(self.name), tail);
        let width = self.columns.len();

        let mut stmt = conn.prepare(&sql)?;
        let raw_rows = stmt.query_map(params_from_iter(params), |row| {
            (0..width).map(|i| row.get::<_, SqlValue>(i)).collect::<rusqlite::Result<Vec<_>>>()
        })?;

        let mut rows = Vec::new();
        for raw in raw_rows {
            rows.push(self.decode_row(&raw?)?);
        }
        Ok(rows)
    }

    fn write(&self, conn: &Connection, verb: &str, row: &Row) -> Result<()> {
        let values = self.encode_row(row)?;
        let cols: Vec<String> = self.columns.iter().map(|c| ident(c.name)).collect();
        let marks: Vec<String> = (1..=cols.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "{verb} INTO {} ({}) VALUES ({})",
            ident(self.name),
            cols.join(", "),
            marks.join(", ")
        );
        conn.execute(&sql, params_from_iter(values))?;
        Ok(())
    }

    fn encode_filter(&self, column: &str, value: &Value) -> Result<SqlValue> {
        let col = self.column(column).ok_or_else(|| StoreError::UnknownColumn {
            table: self.name.to_string(),
            column: column.to_string(),
        })?;
        Ok(col.codec.encode(Some(value))?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::codec::Codec;
    use crate::schema::Column;

    const NOTES: TableSchema = TableSchema::new(
        "notes",
        &[
            Column::new("title", Codec::Str).primary_key(),
            Column::new("check", Codec::Bool).not_null(),
            Column::new("due", Codec::Date),
        ],
    )
    .unique_together(&[&["check", "due"]]);

    const SETTINGS: TableSchema =
        TableSchema::new("settings", &[Column::new("verbose", Codec::Bool)]).singleton();

    fn note(title: &str, check: bool, due: Option<NaiveDate>) -> Row {
        Row::new()
            .with("title", Value::from(title))
            .with("check", Value::Bool(check))
            .with("due", due.map(Value::Date))
    }

    #[test]
    fn create_sql_quotes_identifiers() {
        assert_eq!(
            NOTES.create_sql(),
            "CREATE TABLE \"notes\" (\"title\" TEXT PRIMARY KEY, \"check\" BOOLEAN NOT NULL, \
             \"due\" DATE, UNIQUE (\"check\", \"due\"))"
        );
    }

    #[test]
    fn insert_and_read_back() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(!NOTES.exists(&conn).unwrap());
        NOTES.create(&conn).unwrap();
        assert!(NOTES.exists(&conn).unwrap());

        let due = NaiveDate::from_ymd_opt(2020, 2, 29);
        let rows = vec![note("a", true, due), note("b", false, None)];
        assert_eq!(NOTES.insert_rows(&conn, &rows).unwrap(), 2);

        assert_eq!(NOTES.read_rows(&conn).unwrap(), rows);
        let found = NOTES.read_rows_where(&conn, "title", &Value::from("b")).unwrap();
        assert_eq!(found, vec![rows[1].clone()]);

        assert_eq!(NOTES.delete_where(&conn, "title", &Value::from("a")).unwrap(), 1);
        assert_eq!(NOTES.count(&conn).unwrap(), 1);
    }

    #[test]
    fn replace_row_overwrites_on_key() {
        let conn = Connection::open_in_memory().unwrap();
        NOTES.create(&conn).unwrap();
        NOTES.insert_row(&conn, &note("a", true, None)).unwrap();
        assert!(NOTES.insert_row(&conn, &note("a", false, None)).is_err());
        NOTES.replace_row(&conn, &note("a", false, None)).unwrap();
        let rows = NOTES.read_rows(&conn).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].bool("check"), Some(false));
    }

    #[test]
    fn singleton_reads_latest_row() {
        let conn = Connection::open_in_memory().unwrap();
        SETTINGS.create(&conn).unwrap();
        for verbose in [false, true, false, true] {
            SETTINGS
                .insert_row(&conn, &Row::new().with("verbose", Value::Bool(verbose)))
                .unwrap();
        }
        let rows = SETTINGS.read_rows(&conn).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].bool("verbose"), Some(true));
        assert_eq!(SETTINGS.count(&conn).unwrap(), 4);
    }

    #[test]
    fn undecodable_value_names_its_column() {
        let conn = Connection::open_in_memory().unwrap();
        NOTES.create(&conn).unwrap();
        conn.execute(
            "INSERT INTO notes (title, \"check\", due) VALUES ('x', 1, '29/02/2020')",
            [],
        )
        .unwrap();
        match NOTES.read_rows(&conn).unwrap_err() {
            StoreError::Conversion(e) => assert_eq!(e.column.as_deref(), Some("due")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_fields_are_not_written() {
        let conn = Connection::open_in_memory().unwrap();
        NOTES.create(&conn).unwrap();
        let row = note("a", true, None).with("colour", Value::from("red"));
        assert!(matches!(
            NOTES.insert_row(&conn, &row),
            Err(StoreError::UnknownColumn { .. })
        ));
    }
}
