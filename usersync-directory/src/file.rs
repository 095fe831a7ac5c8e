//! Static identity list read from a YAML file.
//!
//! ```yaml
//! - username: alice
//!   publickey: ssh-ed25519 AAAA... alice@laptop
//! - username: bob
//!   publickey: ""
//! ```
//!
//! Entries whose username is not a valid account name are skipped with a
//! warning.

use std::path::PathBuf;

use usersync_core::{Identity, IdentitySource, Provider, SourceError};

#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl IdentitySource for FileSource {
    fn provider(&self) -> Provider {
        Provider::File
    }

    fn fetch(&self) -> Result<Vec<Identity>, SourceError> {
        tracing::debug!(path = %self.path.display(), "reading identity file");
        let contents =
            std::fs::read_to_string(&self.path).map_err(|e| SourceError::io(&self.path, e))?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        let identities: Vec<Identity> =
            serde_yaml::from_str(&contents).map_err(|e| SourceError::Parse {
                path: self.path.clone(),
                source: e,
            })?;
        Ok(identities
            .into_iter()
            .filter(|identity| {
                let valid = identity.username.is_valid_account_name();
                if !valid {
                    tracing::warn!(
                        path = %self.path.display(),
                        username = %identity.username,
                        "skipping identity: not a valid account name"
                    );
                }
                valid
            })
            .collect())
    }
}
