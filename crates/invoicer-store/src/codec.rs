//! Column codecs.
//!
//! A [`Codec`] maps a typed domain [`Value`] to the SQLite storage form and
//! back.  Codecs are stateless; `NULL` always decodes to `None` and `None`
//! always encodes to `NULL`.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Value as SqlValue;

use crate::error::{ConversionError, ValueError};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Separator used to store a tuple of strings in a single TEXT column.
const TUPLE_SEPARATOR: &str = ",";

/// The kind of value a column holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    Str,
    Int,
    Float,
    /// `YYYY-MM-DD`
    Date,
    /// `YYYY-MM-DD HH:MM:SS`
    DateTime,
    /// Filesystem path, normalized to an absolute path on encode.
    Path,
    /// Stored as 0/1.
    Bool,
    /// Comma-separated list of strings.
    StrTuple,
}

/// A decoded column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Path(PathBuf),
    Bool(bool),
    StrTuple(Vec<String>),
}

impl Codec {
    /// Column type used in `CREATE TABLE`.
    pub fn sql_type(self) -> &'static str {
        match self {
            Codec::Int => "INTEGER",
            Codec::Float => "REAL",
            Codec::Bool => "BOOLEAN",
            Codec::Date => "DATE",
            Codec::DateTime => "DATETIME",
            Codec::Str | Codec::Path | Codec::StrTuple => "TEXT",
        }
    }

    /// Decode a raw stored value.
    pub fn decode(self, raw: &SqlValue) -> Result<Option<Value>, ConversionError> {
        if let SqlValue::Null = raw {
            return Ok(None);
        }
        let fail = || ConversionError {
            codec: self,
            column: None,
            raw: describe_raw(raw),
        };

        let value = match (self, raw) {
            (Codec::Str, SqlValue::Text(s)) => Value::Str(s.clone()),
            (Codec::Int, SqlValue::Integer(i)) => Value::Int(*i),
            (Codec::Int, SqlValue::Text(s)) => Value::Int(s.trim().parse().map_err(|_| fail())?),
            (Codec::Float, SqlValue::Real(f)) => Value::Float(*f),
            (Codec::Float, SqlValue::Integer(i)) => Value::Float(*i as f64),
            (Codec::Float, SqlValue::Text(s)) => {
                Value::Float(s.trim().parse().map_err(|_| fail())?)
            }
            (Codec::Date, SqlValue::Text(s)) => {
                Value::Date(NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|_| fail())?)
            }
            (Codec::DateTime, SqlValue::Text(s)) => Value::DateTime(
                NaiveDateTime::parse_from_str(s, DATETIME_FORMAT).map_err(|_| fail())?,
            ),
            (Codec::Path, SqlValue::Text(s)) => {
                Value::Path(absolute(Path::new(s)).unwrap_or_else(|| PathBuf::from(s)))
            }
            (Codec::Bool, SqlValue::Integer(0)) => Value::Bool(false),
            (Codec::Bool, SqlValue::Integer(1)) => Value::Bool(true),
            (Codec::Bool, SqlValue::Text(s)) => Value::Bool(parse_bool_text(s).ok_or_else(fail)?),
            (Codec::StrTuple, SqlValue::Text(s)) => Value::StrTuple(split_tuple(s)),
            _ => return Err(fail()),
        };
        Ok(Some(value))
    }

    /// Encode a domain value for storage.
    pub fn encode(self, value: Option<&Value>) -> Result<SqlValue, ValueError> {
        let Some(value) = value else {
            return Ok(SqlValue::Null);
        };
        let fail = || ValueError {
            codec: self,
            value: value.to_string(),
        };

        let raw = match (self, value) {
            (Codec::Str, Value::Str(s)) => SqlValue::Text(s.clone()),
            (Codec::Int, Value::Int(i)) => SqlValue::Integer(*i),
            (Codec::Float, Value::Float(f)) => SqlValue::Real(*f),
            (Codec::Float, Value::Int(i)) => SqlValue::Real(*i as f64),
            (Codec::Date, Value::Date(d)) => SqlValue::Text(d.format(DATE_FORMAT).to_string()),
            (Codec::DateTime, Value::DateTime(dt)) => {
                SqlValue::Text(dt.format(DATETIME_FORMAT).to_string())
            }
            (Codec::Path, Value::Path(p)) => SqlValue::Text(path_text(p).ok_or_else(fail)?),
            (Codec::Path, Value::Str(s)) => {
                SqlValue::Text(path_text(Path::new(s)).ok_or_else(fail)?)
            }
            (Codec::Bool, Value::Bool(b)) => SqlValue::Integer(i64::from(*b)),
            (Codec::Bool, Value::Int(i @ (0 | 1))) => SqlValue::Integer(*i),
            (Codec::Bool, Value::Str(s)) => match s.to_ascii_lowercase().as_str() {
                "true" => SqlValue::Integer(1),
                "false" => SqlValue::Integer(0),
                _ => return Err(fail()),
            },
            (Codec::StrTuple, Value::StrTuple(items)) => {
                if items.iter().any(|item| item.contains(TUPLE_SEPARATOR)) {
                    return Err(fail());
                }
                SqlValue::Text(items.join(TUPLE_SEPARATOR))
            }
            _ => return Err(fail()),
        };
        Ok(raw)
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Codec::Str => "str",
            Codec::Int => "int",
            Codec::Float => "float",
            Codec::Date => "date",
            Codec::DateTime => "datetime",
            Codec::Path => "path",
            Codec::Bool => "bool",
            Codec::StrTuple => "str_tuple",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Value::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
            Value::Path(p) => write!(f, "{}", p.display()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::StrTuple(items) => write!(f, "{items:?}"),
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl From<PathBuf> for Value {
    fn from(p: PathBuf) -> Self {
        Value::Path(p)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::StrTuple(items)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn describe_raw(raw: &SqlValue) -> String {
    match raw {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Integer(i) => format!("integer {i}"),
        SqlValue::Real(f) => format!("real {f}"),
        SqlValue::Text(s) => format!("text {s:?}"),
        SqlValue::Blob(b) => format!("blob of {} bytes", b.len()),
    }
}

fn parse_bool_text(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn split_tuple(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    text.split(TUPLE_SEPARATOR).map(str::to_string).collect()
}

/// Absolute, lexically normalized form of `path`.
fn absolute(path: &Path) -> Option<PathBuf> {
    if path.is_absolute() {
        Some(normalize(path))
    } else {
        Some(normalize(&std::env::current_dir().ok()?.join(path)))
    }
}

fn path_text(path: &Path) -> Option<String> {
    absolute(path)?.to_str().map(str::to_string)
}

/// Resolve `.` and `..` without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Codec; 8] = [
        Codec::Str,
        Codec::Int,
        Codec::Float,
        Codec::Date,
        Codec::DateTime,
        Codec::Path,
        Codec::Bool,
        Codec::StrTuple,
    ];

    fn text(s: &str) -> SqlValue {
        SqlValue::Text(s.to_string())
    }

    #[test]
    fn null_passes_through_every_codec() {
        for codec in ALL {
            assert_eq!(codec.decode(&SqlValue::Null).unwrap(), None);
            assert_eq!(codec.encode(None).unwrap(), SqlValue::Null);
        }
    }

    #[test]
    fn decoded_values_survive_encoding() {
        let samples = [
            (Codec::Str, text("Alpha, Inc.")),
            (Codec::Int, SqlValue::Integer(-17)),
            (Codec::Float, SqlValue::Real(1250.5)),
            (Codec::Date, text("2019-01-31")),
            (Codec::DateTime, text("2019-01-31 23:59:01")),
            (Codec::Path, text("/srv/invoices/2019_001_alpha.pdf")),
            (Codec::Bool, SqlValue::Integer(1)),
            (Codec::Bool, text("False")),
            (Codec::StrTuple, text("year,number,name")),
            (Codec::StrTuple, text("")),
        ];
        for (codec, raw) in samples {
            let decoded = codec.decode(&raw).unwrap();
            let encoded = codec.encode(decoded.as_ref()).unwrap();
            assert_eq!(codec.decode(&encoded).unwrap(), decoded, "{codec} {raw:?}");
        }
    }

    #[test]
    fn date_rejects_other_formats() {
        let err = Codec::Date.decode(&text("31/01/2019")).unwrap_err();
        assert_eq!(err.codec, Codec::Date);
        assert!(Codec::DateTime.decode(&text("2019-01-31")).is_err());
        assert!(Codec::Int.decode(&text("twelve")).is_err());
        assert!(Codec::Str.decode(&SqlValue::Blob(vec![1, 2])).is_err());
    }

    #[test]
    fn bool_accepts_common_spellings() {
        for raw in [text("true"), text("TRUE"), text("yes"), text("1"), SqlValue::Integer(1)] {
            assert_eq!(Codec::Bool.decode(&raw).unwrap(), Some(Value::Bool(true)));
        }
        for raw in [text("False"), text("no"), text("off"), SqlValue::Integer(0)] {
            assert_eq!(Codec::Bool.decode(&raw).unwrap(), Some(Value::Bool(false)));
        }
        assert!(Codec::Bool.decode(&SqlValue::Integer(2)).is_err());
        assert!(Codec::Bool.decode(&text("maybe")).is_err());
    }

    #[test]
    fn bool_encode_is_strict() {
        let enc = |v: Value| Codec::Bool.encode(Some(&v));
        assert_eq!(enc(Value::Bool(true)).unwrap(), SqlValue::Integer(1));
        assert_eq!(enc(Value::Int(0)).unwrap(), SqlValue::Integer(0));
        assert_eq!(enc(Value::Str("TrUe".into())).unwrap(), SqlValue::Integer(1));
        assert_eq!(enc(Value::Str("false".into())).unwrap(), SqlValue::Integer(0));
        assert!(enc(Value::Int(2)).is_err());
        assert!(enc(Value::Str("yes".into())).is_err());
        assert!(enc(Value::Float(1.0)).is_err());
    }

    #[test]
    fn path_encode_normalizes() {
        let raw = Codec::Path
            .encode(Some(&Value::Path(PathBuf::from("/srv/./invoices/../archive/a.pdf"))))
            .unwrap();
        assert_eq!(raw, text("/srv/archive/a.pdf"));

        let relative = Codec::Path.encode(Some(&Value::Str("a.pdf".into()))).unwrap();
        let expected = std::env::current_dir().unwrap().join("a.pdf");
        assert_eq!(relative, text(expected.to_str().unwrap()));
    }

    #[test]
    fn unnormalized_stored_path_decodes_stably() {
        let stored = text("/srv/./inv/../a.pdf");
        let decoded = Codec::Path.decode(&stored).unwrap();
        assert_eq!(decoded, Some(Value::Path(PathBuf::from("/srv/a.pdf"))));

        let encoded = Codec::Path.encode(decoded.as_ref()).unwrap();
        assert_eq!(Codec::Path.decode(&encoded).unwrap(), decoded);
    }

    #[test]
    fn tuple_items_cannot_contain_separator() {
        let value = Value::StrTuple(vec!["a,b".into()]);
        assert!(Codec::StrTuple.encode(Some(&value)).is_err());
    }

    #[test]
    fn mismatched_value_is_rejected() {
        let err = Codec::Int.encode(Some(&Value::Str("7".into()))).unwrap_err();
        assert_eq!(err.codec, Codec::Int);
        assert!(Codec::Date.encode(Some(&Value::Int(20190131))).is_err());
    }
}
