use thiserror::Error;

use crate::codec::Codec;
use crate::migrations::AppliedStep;
use crate::version::Version;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A query expected exactly one row but found none.
    #[error("Record not found")]
    NotFound,

    /// The persisted version string is malformed.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// A stored value could not be decoded under its column codec.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// A domain value could not be encoded under its column codec.
    #[error(transparent)]
    Value(#[from] ValueError),

    /// A row referenced a column its table schema does not declare.
    #[error("Table `{table}` has no column `{column}`")]
    UnknownColumn { table: String, column: String },

    /// A stored row lacks a value the domain model requires.
    #[error("Table `{table}` row has no value for `{column}`")]
    MissingField { table: String, column: String },

    /// A per-row transformation refused a row during a table rewrite.
    #[error("Cannot transform table `{table}`: {message}")]
    Transform { table: String, message: String },

    /// The database has no `version` record.
    #[error("Database is not initialized (no version record)")]
    Uninitialized,

    /// A migration step failed; the steps in `applied` were already committed.
    #[error("Migration step `{step}` ({from} -> {to}) failed after {} applied step(s): {source}", .applied.len())]
    StepFailed {
        step: String,
        from: Version,
        to: Version,
        applied: Vec<AppliedStep>,
        #[source]
        source: Box<StoreError>,
    },
}

impl StoreError {
    /// Build a [`StoreError::Transform`] for `table`.
    pub fn transform(table: &str, message: impl Into<String>) -> Self {
        Self::Transform {
            table: table.to_string(),
            message: message.into(),
        }
    }
}

/// A version string that is not of the form `major.minor.patch`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed version {text:?}: {reason}")]
pub struct FormatError {
    pub text: String,
    pub reason: &'static str,
}

/// A raw stored value that does not parse as its declared codec.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Cannot decode {raw} as {codec}{}", .column.as_deref().map(|c| format!(" (column `{c}`)")).unwrap_or_default())]
pub struct ConversionError {
    pub codec: Codec,
    pub column: Option<String>,
    pub raw: String,
}

impl ConversionError {
    pub(crate) fn with_column(mut self, column: &str) -> Self {
        self.column = Some(column.to_string());
        self
    }
}

/// A domain value the codec refuses to encode.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid value for {codec}: {value}")]
pub struct ValueError {
    pub codec: Codec,
    pub value: String,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
