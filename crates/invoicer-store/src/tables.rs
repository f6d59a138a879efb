//! Table shapes in force at [`APP_VERSION`](crate::APP_VERSION).

pub use crate::migrations::v2_0_initial::SCAN_DATE_TIMES;
pub use crate::migrations::v2_2_validators::{INTERNAL_OPTIONS, INVOICES, PATTERNS, VALIDATORS};
pub use crate::migrations::v2_3_field_names::CONFIGURATION;
pub use crate::migrations::VERSION_TABLE as VERSION;

use crate::schema::TableSchema;

/// Every data table of the current shape, in creation order.
pub const ALL: [&TableSchema; 6] = [
    &CONFIGURATION,
    &PATTERNS,
    &INVOICES,
    &SCAN_DATE_TIMES,
    &VALIDATORS,
    &INTERNAL_OPTIONS,
];
