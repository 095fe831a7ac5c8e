//! Error taxonomy for usersync.
//!
//! Three kinds, one per collaborator: configuration, identity source, and
//! local identity store. Each is fatal to the run that raised it; there is no
//! partial-state error because a later run repairs whatever was left behind.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{Provider, Username};

/// Missing or invalid settings. Always raised before any mutation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid YAML for [`crate::config::RawConfig`].
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("IAM provider must be set; use --provider GSUITE or set `provider` in the config file")]
    MissingProvider,

    #[error("unknown IAM provider '{0}'; expected: GSUITE, FILE")]
    UnknownProvider(String),

    #[error("provider credentials must be present; use --credentials <path> or set `provider-options.credentials`")]
    MissingCredentials,

    #[error("the GSUITE provider needs the super admin email that delegated the service account scopes (--gsuiteadmin)")]
    MissingAdminEmail,

    #[error("admin email '{0}' has no domain part")]
    InvalidAdminEmail(String),

    #[error("'{0}' is not a valid group name")]
    InvalidGroup(String),

    #[error("home root must be an absolute path, got {0}")]
    RelativeHomeRoot(PathBuf),
}

/// The desired identity set could not be obtained.
#[derive(Debug, Error)]
pub enum SourceError {
    /// A successful fetch that yielded nothing. Treated as an outage, never as
    /// "remove everyone".
    #[error("identity source {provider} returned no identities")]
    Empty { provider: Provider },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("credentials at {path} contain no access token")]
    MissingToken { path: PathBuf },

    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("{url} returned HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("malformed directory response: {0}")]
    Decode(String),

    #[error("failed to parse identity file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl SourceError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Any failure of an OS primitive.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed (status {status}): {stderr}")]
    Command {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("unexpected output from `{command}`: {output}")]
    Output { command: String, output: String },

    #[error("no local account named '{0}'")]
    UnknownAccount(Username),

    #[error("{operation} rejected: {reason}")]
    Rejected { operation: String, reason: String },
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
