//! usersync core library: domain types, configuration, errors, and the
//! collaborator traits the reconciliation engine is written against.
//!
//! - [`types`]: [`Username`], [`GroupName`], [`Identity`], [`Provider`]
//! - [`config`]: [`RawConfig`] → [`RunConfig`]
//! - [`error`]: [`ConfigError`], [`SourceError`], [`StoreError`]
//! - [`source`], [`store`], [`report`]: the three seams

pub mod config;
pub mod error;
pub mod report;
pub mod source;
pub mod store;
pub mod types;

pub use config::{ProviderOptions, RawConfig, RawProviderOptions, RunConfig};
pub use error::{ConfigError, SourceError, StoreError};
pub use report::{Level, ReportEvent, Reporter};
pub use source::IdentitySource;
pub use store::LocalIdentityStore;
pub use types::{GroupName, Identity, Provider, Username};
