//! The host side of usersync: a [`LocalIdentityStore`] backed by the
//! shadow-utils commands and the local filesystem, plus log-file rotation.
//!
//! [`LocalIdentityStore`]: usersync_core::LocalIdentityStore

pub mod command;
pub mod getent;
pub mod log_rotation;
mod system;

pub use command::{CommandOutput, CommandRunner, SystemRunner};
pub use log_rotation::{rotate_if_needed, rotate_log, MAX_LOG_BYTES, MAX_ROTATED_FILES};
pub use system::{SystemStore, DIR_MODE, KEY_FILE_MODE};
