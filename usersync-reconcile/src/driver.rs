//! Reconciliation driver.
//!
//! ```text
//! INIT → ENSURE_GROUP → FETCH_DESIRED → ADD_PASS → REFRESH_ACTUAL → REMOVE_PASS → DONE
//!   └──────────────┴──────────────┴───────────┴────────────┴──────────────┴──→ FAILED
//! ```
//!
//! Additions are applied and membership is re-read before removals are
//! computed. The two passes are never reordered: a removal computed from a
//! stale read could delete an account the directory still lists.
//!
//! Runs are stateless. A FAILED run is not retried here; the next scheduled
//! invocation repairs whatever this one left half-done.

use std::collections::BTreeSet;
use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;

use usersync_core::{
    IdentitySource, LocalIdentityStore, Reporter, RunConfig, SourceError, Username,
};

use crate::deprovision::Deprovisioner;
use crate::diff::{plan_additions, plan_removals, DesiredSet, Plan};
use crate::error::ReconcileError;
use crate::provision::Provisioner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    EnsureGroup,
    FetchDesired,
    AddPass,
    RefreshActual,
    RemovePass,
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Init => "INIT",
            RunState::EnsureGroup => "ENSURE_GROUP",
            RunState::FetchDesired => "FETCH_DESIRED",
            RunState::AddPass => "ADD_PASS",
            RunState::RefreshActual => "REFRESH_ACTUAL",
            RunState::RemovePass => "REMOVE_PASS",
            RunState::Done => "DONE",
            RunState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// What a successful run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub group_created: bool,
    /// Accounts created or (re)joined to the group.
    pub added: Vec<Username>,
    /// Existing members that needed at least one artifact recreated.
    pub repaired: Vec<Username>,
    /// Existing members that were already complete.
    pub unchanged: usize,
    pub removed: Vec<Username>,
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
}

fn as_millis<S: serde::Serializer>(duration: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(duration.as_millis() as u64)
}

/// One reconciliation run over injected collaborators.
pub struct Reconciler<'a> {
    config: &'a RunConfig,
    source: &'a dyn IdentitySource,
    store: &'a mut dyn LocalIdentityStore,
    reporter: &'a dyn Reporter,
    state: RunState,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        config: &'a RunConfig,
        source: &'a dyn IdentitySource,
        store: &'a mut dyn LocalIdentityStore,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            config,
            source,
            store,
            reporter,
            state: RunState::Init,
        }
    }

    /// The state the run is in, or ended in.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Drive the run to DONE or FAILED.
    ///
    /// The triggering error is reported once, at error level, and returned.
    pub fn run(&mut self) -> Result<RunSummary, ReconcileError> {
        let started = Instant::now();
        let mut summary = RunSummary::default();

        match self.execute(&mut summary) {
            Ok(()) => {
                summary.duration = started.elapsed();
                self.transition(RunState::Done);
                self.reporter.info(&format!(
                    "run complete: {} added, {} repaired, {} unchanged, {} removed ({}ms)",
                    summary.added.len(),
                    summary.repaired.len(),
                    summary.unchanged,
                    summary.removed.len(),
                    summary.duration.as_millis()
                ));
                Ok(summary)
            }
            Err(err) => {
                let failed_in = self.state;
                self.transition(RunState::Failed);
                self.reporter
                    .error(&format!("run failed during {failed_in}: {err}"));
                Err(err)
            }
        }
    }

    /// Fetch and diff without mutating anything. A missing group reads as empty.
    pub fn preview(&self) -> Result<Plan, ReconcileError> {
        self.config.validate()?;
        let desired = self.fetch_desired()?;
        let group = &self.config.managed_group;
        let actual = if self.store.group_exists(group)? {
            self.store.members_of(group)?
        } else {
            BTreeSet::new()
        };
        Ok(Plan::preview(&desired, &actual))
    }

    fn execute(&mut self, summary: &mut RunSummary) -> Result<(), ReconcileError> {
        let config = self.config;
        let group = &config.managed_group;

        // INIT
        config.validate()?;
        self.reporter.info(&format!(
            "starting with provider: {} | group: {} | keep home dir: {} | home root: {}",
            config.provider,
            group,
            config.keep_home_dir,
            config.home_root.display()
        ));

        self.transition(RunState::EnsureGroup);
        if !self.store.group_exists(group)? {
            self.reporter
                .info(&format!("group {group} not found on local system, creating it"));
            self.store.create_group(group)?;
            self.reporter.info(&format!("group {group} created"));
            summary.group_created = true;
        }

        self.transition(RunState::FetchDesired);
        let desired = self.fetch_desired()?;
        self.reporter.info(&format!(
            "fetched {} identities from {}",
            desired.len(),
            self.source.provider()
        ));

        self.transition(RunState::AddPass);
        let actual = self.store.members_of(group)?;
        let additions = plan_additions(&desired, &actual);
        {
            let mut provisioner =
                Provisioner::new(&mut *self.store, self.reporter, group, &config.home_root);
            for identity in &additions.to_add {
                provisioner.ensure(identity, false)?;
                summary.added.push(identity.username.clone());
            }
            for identity in &additions.to_repair {
                let outcome = provisioner.ensure(identity, true)?;
                if outcome.is_noop() {
                    summary.unchanged += 1;
                } else {
                    summary.repaired.push(identity.username.clone());
                }
            }
        }

        self.transition(RunState::RefreshActual);
        let actual = self.store.members_of(group)?;

        self.transition(RunState::RemovePass);
        let to_remove = plan_removals(&desired, &actual);
        let mut deprovisioner = Deprovisioner::new(
            &mut *self.store,
            self.reporter,
            &config.home_root,
            config.keep_home_dir,
        );
        for username in to_remove {
            deprovisioner.remove(&username)?;
            summary.removed.push(username);
        }

        Ok(())
    }

    /// An empty result is an error: it must never read as "remove everyone".
    fn fetch_desired(&self) -> Result<DesiredSet, ReconcileError> {
        let identities = self.source.fetch()?;
        if identities.is_empty() {
            return Err(SourceError::Empty {
                provider: self.source.provider(),
            }
            .into());
        }
        let desired = DesiredSet::from_identities(identities);
        for duplicate in desired.duplicates() {
            self.reporter.info(&format!(
                "directory lists {duplicate} more than once, keeping the first entry"
            ));
        }
        Ok(desired)
    }

    fn transition(&mut self, next: RunState) {
        tracing::debug!(from = %self.state, to = %next, "state transition");
        self.state = next;
        self.reporter.info(&format!("state: {next}"));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
