//! Persistence of the [`Configuration`] singleton.

use crate::database::Database;
use crate::error::Result;
use crate::models::Configuration;
use crate::tables::CONFIGURATION;

impl Database {
    /// Load the stored configuration, if any has been saved.
    pub fn load_configuration(&self) -> Result<Option<Configuration>> {
        let rows = CONFIGURATION.read_rows(self.conn())?;
        Ok(rows.first().map(Configuration::from_row))
    }

    /// Load the stored configuration, or the defaults.
    pub fn configuration(&self) -> Result<Configuration> {
        Ok(self.load_configuration()?.unwrap_or_default())
    }

    /// Save `config`.  Earlier rows are kept but no longer read.
    pub fn store_configuration(&self, config: &Configuration) -> Result<()> {
        CONFIGURATION.insert_row(self.conn(), &config.to_row())
    }
}
