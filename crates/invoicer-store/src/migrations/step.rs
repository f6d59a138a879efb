//! The [`MigrationStep`] trait and its two families.

use rusqlite::Connection;

use crate::error::Result;
use crate::version::{Version, VersionPattern};

/// A unit of schema transformation between adjacent versions, in both
/// directions.
///
/// `*_accepts` returns the version the step would leave the database at when
/// run from `from` towards `target`, or `None` when the step does not apply.
/// `upgrade`/`downgrade` rewrite tables through `conn` only; the runner wraps
/// each call in a transaction and records the new version.
pub trait MigrationStep: Send + Sync {
    fn name(&self) -> &str;

    fn upgrade_accepts(&self, from: &Version, target: &Version) -> Option<Version>;

    fn downgrade_accepts(&self, from: &Version, target: &Version) -> Option<Version>;

    fn upgrade(&self, conn: &Connection, from: &Version, to: &Version) -> Result<()>;

    fn downgrade(&self, conn: &Connection, from: &Version, to: &Version) -> Result<()>;
}

/// Table rewrite procedure of a [`MajorMinorStep`].
pub type StepFn = fn(&Connection) -> Result<()>;

/// Migrates across one minor-version boundary: `from.*` <-> `to.0`.
#[derive(Debug, Clone, Copy)]
pub struct MajorMinorStep {
    name: &'static str,
    from: (u32, u32),
    to: (u32, u32),
    upgrade: StepFn,
    downgrade: StepFn,
}

impl MajorMinorStep {
    pub const fn new(
        name: &'static str,
        from: (u32, u32),
        to: (u32, u32),
        upgrade: StepFn,
        downgrade: StepFn,
    ) -> Self {
        Self {
            name,
            from,
            to,
            upgrade,
            downgrade,
        }
    }

    /// First version of the new minor series.
    pub const fn to_version(&self) -> Version {
        Version::new(self.to.0, self.to.1, 0)
    }

    fn from_series(&self) -> VersionPattern {
        VersionPattern::minor_series(self.from.0, self.from.1)
    }

    fn to_series(&self) -> VersionPattern {
        VersionPattern::minor_series(self.to.0, self.to.1)
    }
}

impl MigrationStep for MajorMinorStep {
    fn name(&self) -> &str {
        self.name
    }

    fn upgrade_accepts(&self, from: &Version, target: &Version) -> Option<Version> {
        let to = self.to_version();
        (self.from_series().matches(from) && *target >= to).then_some(to)
    }

    fn downgrade_accepts(&self, from: &Version, target: &Version) -> Option<Version> {
        if !self.to_series().matches(from) || *target >= self.to_version() {
            return None;
        }
        if self.from_series().matches(target) {
            Some(*target)
        } else {
            Some(Version::new(self.from.0, self.from.1, 0))
        }
    }

    fn upgrade(&self, conn: &Connection, _from: &Version, _to: &Version) -> Result<()> {
        (self.upgrade)(conn)
    }

    fn downgrade(&self, conn: &Connection, _from: &Version, _to: &Version) -> Result<()> {
        (self.downgrade)(conn)
    }
}

/// Patch-level bump inside one minor series.  The schema shape is the same on
/// both sides, so there is nothing to rewrite.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatchStep;

impl MigrationStep for PatchStep {
    fn name(&self) -> &str {
        "patch"
    }

    fn upgrade_accepts(&self, from: &Version, target: &Version) -> Option<Version> {
        (from.major_minor() == target.major_minor() && target > from).then_some(*target)
    }

    fn downgrade_accepts(&self, from: &Version, target: &Version) -> Option<Version> {
        (from.major_minor() == target.major_minor() && target < from).then_some(*target)
    }

    fn upgrade(&self, _conn: &Connection, from: &Version, to: &Version) -> Result<()> {
        tracing::debug!(%from, %to, "patch upgrade, schema unchanged");
        Ok(())
    }

    fn downgrade(&self, _conn: &Connection, from: &Version, to: &Version) -> Result<()> {
        tracing::debug!(%from, %to, "patch downgrade, schema unchanged");
        Ok(())
    }
}
