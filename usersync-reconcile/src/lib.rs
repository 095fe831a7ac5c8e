//! # usersync-reconcile
//!
//! The reconciliation engine: diff the desired identity set against the
//! managed group, provision what is missing, repair what is incomplete, then
//! remove what the directory no longer lists.
//!
//! Call [`Reconciler::run`] for a full run or [`Reconciler::preview`] for a
//! read-only [`Plan`].

pub mod deprovision;
pub mod diff;
pub mod driver;
pub mod error;
/// Test doubles for the collaborator traits. Not part of the public API.
#[doc(hidden)]
pub mod memory;
pub mod provision;
pub mod report;

pub use deprovision::Deprovisioner;
pub use diff::{plan_additions, plan_removals, Additions, DesiredSet, Plan};
pub use driver::{Reconciler, RunState, RunSummary};
pub use error::ReconcileError;
pub use provision::{Artifact, ProvisionOutcome, Provisioner};
pub use report::TracingReporter;
