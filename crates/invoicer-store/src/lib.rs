//! # invoicer-store
//!
//! Local SQLite storage for the invoice bookkeeping tool.
//!
//! The heart of the crate is the schema-versioned migration engine in
//! [`migrations`]: typed [`codec`]s and [`schema`] declarations describe every
//! historical table shape, and the runner chains migration steps to move a
//! database between application versions in either direction.  On top of it,
//! a synchronous [`Database`] handle provides typed CRUD helpers for the
//! current shape.

pub mod codec;
pub mod configuration;
pub mod database;
pub mod invoices;
pub mod migrations;
pub mod models;
pub mod patterns;
pub mod schema;
pub mod table;
pub mod tables;
pub mod version;

mod error;

pub use codec::{Codec, Value};
pub use database::Database;
pub use error::{ConversionError, FormatError, Result, StoreError, ValueError};
pub use migrations::{Direction, MigrationReport, Registry};
pub use models::*;
pub use schema::{Column, Row, TableSchema};
pub use version::{Version, VersionPattern, APP_VERSION, DOWNGRADE_FLOOR};
