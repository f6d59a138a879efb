//! Migration registry and runner.
//!
//! The runner reads the stored version, chains registered steps greedily
//! towards the target, then executes the chain oldest first.  Each step runs
//! in its own transaction together with the update of the version record, so
//! a failing step leaves the database at the last committed version.

use std::fmt;
use std::sync::OnceLock;

use rusqlite::Connection;
use serde::Serialize;

use crate::error::{Result, StoreError};
use crate::version::{Version, APP_VERSION, DOWNGRADE_FLOOR};

use super::step::{MigrationStep, PatchStep};
use super::{read_version, v2_1_scan_report, v2_2_validators, v2_3_field_names, write_version};

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Ordered collection of migration steps.  Registration order breaks ties
/// between equally good candidates.
#[derive(Default)]
pub struct Registry {
    steps: Vec<Box<dyn MigrationStep>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every step shipped with this build.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry
            .register(PatchStep)
            .register(v2_1_scan_report::STEP)
            .register(v2_2_validators::STEP)
            .register(v2_3_field_names::STEP);
        registry
    }

    pub fn register(&mut self, step: impl MigrationStep + 'static) -> &mut Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn steps(&self) -> impl Iterator<Item = &dyn MigrationStep> {
        self.steps.iter().map(|s| s.as_ref())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Chain steps from `from` towards `target`.
    ///
    /// At each iteration every step is asked for a candidate; the one moving
    /// furthest towards `target` wins (greatest for upgrades, smallest for
    /// downgrades, first registered on ties).  Candidates that do not move
    /// towards `target`, or move past it, are ignored.  Planning stops when
    /// `target` is reached or no step applies.
    pub fn plan(&self, direction: Direction, from: Version, target: Version) -> Plan<'_> {
        let mut steps = Vec::new();
        let mut current = from;

        while direction.before(&current, &target) {
            let mut best: Option<(Version, &dyn MigrationStep)> = None;
            for step in self.steps() {
                let candidate = match direction {
                    Direction::Upgrade => step.upgrade_accepts(&current, &target),
                    Direction::Downgrade => step.downgrade_accepts(&current, &target),
                };
                let Some(to) = candidate else { continue };
                if !direction.before(&current, &to) || direction.before(&target, &to) {
                    continue;
                }
                let better = match best {
                    None => true,
                    Some((best_to, _)) => direction.before(&best_to, &to),
                };
                if better {
                    best = Some((to, step));
                }
            }

            let Some((to, step)) = best else { break };
            steps.push(PlannedStep {
                from: current,
                to,
                step,
            });
            current = to;
        }

        Plan {
            direction,
            from,
            target,
            reached: current == target,
            steps,
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.steps().map(|s| s.name())).finish()
    }
}

/// The registry of every shipped step, built once per process.
pub fn standard_registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(Registry::standard)
}

// ---------------------------------------------------------------------------
// Plans and reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Upgrade,
    Downgrade,
}

impl Direction {
    /// Whether `a` still has to move towards `b` in this direction.
    fn before(self, a: &Version, b: &Version) -> bool {
        match self {
            Direction::Upgrade => a < b,
            Direction::Downgrade => a > b,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Upgrade => "upgrade",
            Direction::Downgrade => "downgrade",
        })
    }
}

/// One link of a chain, not yet executed.
#[derive(Clone, Copy)]
pub struct PlannedStep<'r> {
    pub from: Version,
    pub to: Version,
    pub step: &'r dyn MigrationStep,
}

impl fmt::Debug for PlannedStep<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} -> {})", self.step.name(), self.from, self.to)
    }
}

#[derive(Debug)]
pub struct Plan<'r> {
    pub direction: Direction,
    pub from: Version,
    pub target: Version,
    pub steps: Vec<PlannedStep<'r>>,
    /// Whether the chain ends at `target`.
    pub reached: bool,
}

impl Plan<'_> {
    /// Version the database is at once every planned step has run.
    pub fn end(&self) -> Version {
        self.steps.last().map_or(self.from, |s| s.to)
    }
}

/// A committed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedStep {
    pub step: String,
    pub from: Version,
    pub to: Version,
}

/// Outcome of a full upgrade or downgrade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub direction: Direction,
    pub from: Version,
    pub target: Version,
    pub version: Version,
    pub applied: Vec<AppliedStep>,
    /// `false` when no chain of steps reaches `target`.
    pub reached: bool,
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Upgrade to `final_version`, or to [`APP_VERSION`] when `None`.
pub fn full_upgrade(
    conn: &mut Connection,
    registry: &Registry,
    final_version: Option<Version>,
) -> Result<MigrationReport> {
    run(conn, registry, Direction::Upgrade, final_version.unwrap_or(APP_VERSION))
}

/// Downgrade to `final_version`, or to [`DOWNGRADE_FLOOR`] when `None`.
pub fn full_downgrade(
    conn: &mut Connection,
    registry: &Registry,
    final_version: Option<Version>,
) -> Result<MigrationReport> {
    run(conn, registry, Direction::Downgrade, final_version.unwrap_or(DOWNGRADE_FLOOR))
}

/// Run one step in its own transaction and record `to` as the stored version.
pub fn apply_step(
    conn: &mut Connection,
    direction: Direction,
    step: &dyn MigrationStep,
    from: &Version,
    to: &Version,
) -> Result<()> {
    let tx = conn.transaction()?;
    match direction {
        Direction::Upgrade => step.upgrade(&tx, from, to)?,
        Direction::Downgrade => step.downgrade(&tx, from, to)?,
    }
    write_version(&tx, to)?;
    tx.commit()?;
    Ok(())
}

fn run(conn: &mut Connection, registry: &Registry, direction: Direction, target: Version) -> Result<MigrationReport> {
    let from = read_version(conn)?.ok_or(StoreError::Uninitialized)?;
    let plan = registry.plan(direction, from, target);

    tracing::info!(
        %direction,
        %from,
        %target,
        steps = plan.steps.len(),
        "planned schema migration"
    );
    if !plan.reached {
        tracing::warn!(
            %direction,
            %target,
            stop = %plan.end(),
            "no migration step leads further towards the target version"
        );
    }

    let mut applied = Vec::with_capacity(plan.steps.len());
    for planned in &plan.steps {
        let name = planned.step.name();
        tracing::info!(step = name, from = %planned.from, to = %planned.to, "applying {direction}");

        if let Err(source) = apply_step(conn, direction, planned.step, &planned.from, &planned.to) {
            tracing::error!(step = name, error = %source, "migration step failed");
            return Err(StoreError::StepFailed {
                step: name.to_string(),
                from: planned.from,
                to: planned.to,
                applied,
                source: Box::new(source),
            });
        }

        applied.push(AppliedStep {
            step: name.to_string(),
            from: planned.from,
            to: planned.to,
        });
    }

    Ok(MigrationReport {
        direction,
        from,
        target,
        version: plan.end(),
        applied,
        reached: plan.reached,
    })
}
