//! Table schemas and decoded rows.
//!
//! A [`TableSchema`] is an immutable, ordered declaration of one shape of one
//! table.  Historical shapes live next to the migration step that introduced
//! them; the shapes currently in force are re-exported from [`crate::tables`].

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};

use crate::codec::{Codec, Value};
use crate::error::{Result, StoreError};

/// One column of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub codec: Codec,
    pub primary_key: bool,
    pub unique: bool,
    pub not_null: bool,
}

impl Column {
    pub const fn new(name: &'static str, codec: Codec) -> Self {
        Self {
            name,
            codec,
            primary_key: false,
            unique: false,
            not_null: false,
        }
    }

    pub const fn primary_key(self) -> Self {
        Self {
            primary_key: true,
            ..self
        }
    }

    pub const fn unique(self) -> Self {
        Self {
            unique: true,
            ..self
        }
    }

    pub const fn not_null(self) -> Self {
        Self {
            not_null: true,
            ..self
        }
    }
}

/// Declared shape of one table.
#[derive(Debug, PartialEq, Eq)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [Column],
    /// Only the most recently inserted row is meaningful.
    pub singleton: bool,
    /// Multi-column `UNIQUE` constraints.
    pub unique_together: &'static [&'static [&'static str]],
}

impl TableSchema {
    pub const fn new(name: &'static str, columns: &'static [Column]) -> Self {
        Self {
            name,
            columns,
            singleton: false,
            unique_together: &[],
        }
    }

    pub const fn singleton(self) -> Self {
        Self {
            singleton: true,
            ..self
        }
    }

    pub const fn unique_together(self, groups: &'static [&'static [&'static str]]) -> Self {
        Self {
            unique_together: groups,
            ..self
        }
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    pub fn is_singleton(&self) -> bool {
        self.singleton
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// The constructor used to materialize rows of this table.
    pub fn row_type(&self) -> RowType<'_> {
        RowType { schema: self }
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// Decoded field values keyed by column name.  Missing and `NULL` fields both
/// read as `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: BTreeMap<String, Option<Value>>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Row::set`].
    pub fn with(mut self, name: &str, value: impl Into<Option<Value>>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<Option<Value>>) {
        self.fields.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).and_then(Option::as_ref)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(Value::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(Value::Int(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        match self.get(name) {
            Some(Value::Float(f)) => Some(*f),
            Some(Value::Int(i)) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.get(name) {
            Some(Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn date(&self, name: &str) -> Option<NaiveDate> {
        match self.get(name) {
            Some(Value::Date(d)) => Some(*d),
            _ => None,
        }
    }

    pub fn datetime(&self, name: &str) -> Option<NaiveDateTime> {
        match self.get(name) {
            Some(Value::DateTime(dt)) => Some(*dt),
            _ => None,
        }
    }

    pub fn path(&self, name: &str) -> Option<&Path> {
        match self.get(name) {
            Some(Value::Path(p)) => Some(p.as_path()),
            _ => None,
        }
    }

    pub fn str_tuple(&self, name: &str) -> Option<&[String]> {
        match self.get(name) {
            Some(Value::StrTuple(items)) => Some(items.as_slice()),
            _ => None,
        }
    }
}

/// Row constructor bound to one [`TableSchema`].
#[derive(Debug, Clone, Copy)]
pub struct RowType<'a> {
    schema: &'a TableSchema,
}

impl RowType<'_> {
    /// Build a row from named values, rejecting names the schema lacks.
    /// Columns not given are `None`.
    pub fn build<I, S>(&self, values: I) -> Result<Row>
    where
        I: IntoIterator<Item = (S, Option<Value>)>,
        S: AsRef<str>,
    {
        let mut row = self.empty();
        for (name, value) in values {
            let name = name.as_ref();
            self.check(name)?;
            row.set(name, value);
        }
        Ok(row)
    }

    /// A row with every column set to `None`.
    pub fn empty(&self) -> Row {
        let mut row = Row::new();
        for column in self.schema.columns {
            row.set(column.name, None::<Value>);
        }
        row
    }

    /// Combine fields carried over from another shape with `overrides`.
    ///
    /// Every column of this schema takes its value from `overrides` when
    /// present there, else from `carried`, else `None`.  Fields of `carried`
    /// this schema does not declare are dropped; unknown names in `overrides`
    /// are an error.
    pub fn merge(&self, carried: &Row, overrides: Row) -> Result<Row> {
        for name in overrides.names() {
            self.check(name)?;
        }
        let mut row = Row::new();
        for column in self.schema.columns {
            let value = if overrides.contains(column.name) {
                overrides.get(column.name).cloned()
            } else {
                carried.get(column.name).cloned()
            };
            row.set(column.name, value);
        }
        Ok(row)
    }

    fn check(&self, name: &str) -> Result<()> {
        if self.schema.column(name).is_none() {
            return Err(StoreError::UnknownColumn {
                table: self.schema.name.to_string(),
                column: name.to_string(),
            });
        }
        Ok(())
    }
}
