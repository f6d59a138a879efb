//! Database connection management.
//!
//! The [`Database`] struct owns a [`rusqlite::Connection`].  [`Database::open_at`]
//! creates the initial schema for a new file and upgrades an existing one to
//! [`APP_VERSION`] before returning, so the typed CRUD helpers always see the
//! current table shapes.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use rusqlite::Connection;

use crate::error::{Result, StoreError};
use crate::migrations::{self, v2_0_initial, MigrationReport, Registry};
use crate::version::{Version, APP_VERSION};

/// Wrapper around a [`rusqlite::Connection`].
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Default database location in the platform data directory:
    /// - Linux:   `~/.local/share/invoicer/invoicer.db`
    /// - macOS:   `~/Library/Application Support/org.invoicer.invoicer/invoicer.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\invoicer\invoicer\data\invoicer.db`
    pub fn default_path() -> Result<PathBuf> {
        let project_dirs =
            ProjectDirs::from("org", "invoicer", "invoicer").ok_or(StoreError::NoDataDir)?;
        Ok(project_dirs.data_dir().join("invoicer.db"))
    }

    /// Open (or create) the default application database.
    pub fn new() -> Result<Self> {
        let db_path = Self::default_path()?;
        if let Some(dir) = db_path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        tracing::info!(path = %db_path.display(), "opening database");

        Self::open_at(&db_path)
    }

    /// Open (or create) a database at an explicit path and bring its schema
    /// to [`APP_VERSION`].
    pub fn open_at(path: &Path) -> Result<Self> {
        let mut db = Self::open_unmigrated(path)?;
        db.prepare()?;
        Ok(db)
    }

    /// Open a database without touching its schema.
    ///
    /// Used by maintenance tooling that drives the migration runner itself.
    pub fn open_unmigrated(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(Self { conn })
    }

    /// A fresh in-memory database at [`APP_VERSION`].
    pub fn open_in_memory() -> Result<Self> {
        let mut db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.prepare()?;
        Ok(db)
    }

    /// Return a reference to the underlying `rusqlite::Connection`.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn.path().map(PathBuf::from)
    }

    /// Stored schema version, `None` for a database never initialized.
    pub fn stored_version(&self) -> Result<Option<Version>> {
        migrations::read_version(&self.conn)
    }

    /// Create the initial schema if the database has none.  Returns whether
    /// anything was created.
    pub fn initialize(&mut self) -> Result<bool> {
        if self.stored_version()?.is_some() {
            return Ok(false);
        }
        tracing::info!(version = %v2_0_initial::VERSION, "creating initial schema");
        let tx = self.conn.transaction()?;
        v2_0_initial::create(&tx)?;
        tx.commit()?;
        Ok(true)
    }

    /// Upgrade with the standard registry.  See [`migrations::full_upgrade`].
    pub fn upgrade(&mut self, final_version: Option<Version>) -> Result<MigrationReport> {
        self.upgrade_with(migrations::standard_registry(), final_version)
    }

    /// Downgrade with the standard registry.  See [`migrations::full_downgrade`].
    pub fn downgrade(&mut self, final_version: Option<Version>) -> Result<MigrationReport> {
        self.downgrade_with(migrations::standard_registry(), final_version)
    }

    pub fn upgrade_with(&mut self, registry: &Registry, final_version: Option<Version>) -> Result<MigrationReport> {
        migrations::full_upgrade(&mut self.conn, registry, final_version)
    }

    pub fn downgrade_with(&mut self, registry: &Registry, final_version: Option<Version>) -> Result<MigrationReport> {
        migrations::full_downgrade(&mut self.conn, registry, final_version)
    }

    fn prepare(&mut self) -> Result<()> {
        self.initialize()?;

        let stored = self.stored_version()?.ok_or(StoreError::Uninitialized)?;
        if stored > APP_VERSION {
            tracing::warn!(
                %stored,
                app = %APP_VERSION,
                "database schema is newer than this build; leaving it untouched"
            );
            return Ok(());
        }

        let report = self.upgrade(None)?;
        if !report.applied.is_empty() {
            tracing::info!(
                from = %report.from,
                to = %report.version,
                steps = report.applied.len(),
                "database schema upgraded"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::write_version;
    use crate::tables;

    #[test]
    fn open_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");

        let db = Database::open_at(&path).expect("should open");
        assert!(db.path().is_some());
        assert_eq!(db.stored_version().unwrap(), Some(APP_VERSION));
        drop(db);

        let db = Database::open_at(&path).expect("should reopen");
        assert_eq!(db.stored_version().unwrap(), Some(APP_VERSION));
    }

    #[test]
    fn fresh_database_has_current_tables() {
        let db = Database::open_in_memory().unwrap();
        for table in tables::ALL {
            assert!(table.exists(db.conn()).unwrap(), "{}", table.name);
        }
    }

    #[test]
    fn open_unmigrated_leaves_schema_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.db");
        {
            let db = Database::open_unmigrated(&path).unwrap();
            v2_0_initial::create(db.conn()).unwrap();
        }
        let db = Database::open_unmigrated(&path).unwrap();
        assert_eq!(db.stored_version().unwrap(), Some(Version::new(2, 0, 0)));
        drop(db);

        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.stored_version().unwrap(), Some(APP_VERSION));
    }

    #[test]
    fn newer_schema_is_not_downgraded_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("future.db");
        {
            let db = Database::open_at(&path).unwrap();
            write_version(db.conn(), &Version::new(9, 0, 0)).unwrap();
        }
        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.stored_version().unwrap(), Some(Version::new(9, 0, 0)));
    }

    #[test]
    fn downgrade_to_floor_and_back() {
        let mut db = Database::open_in_memory().unwrap();
        let down = db.downgrade(None).unwrap();
        assert!(down.reached);
        assert_eq!(down.applied.len(), 3);
        assert_eq!(db.stored_version().unwrap(), Some(Version::new(2, 0, 0)));
        assert!(!tables::VALIDATORS.exists(db.conn()).unwrap());

        let up = db.upgrade(None).unwrap();
        assert_eq!(up.version, APP_VERSION);
        assert!(tables::VALIDATORS.exists(db.conn()).unwrap());
    }
}
