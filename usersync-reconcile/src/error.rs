//! Error type for reconciliation runs.

use thiserror::Error;

use usersync_core::{ConfigError, SourceError, StoreError};

/// Whatever ended a run in the FAILED state.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("identity source error: {0}")]
    Source(#[from] SourceError),

    #[error("local store error: {0}")]
    LocalStore(#[from] StoreError),
}
