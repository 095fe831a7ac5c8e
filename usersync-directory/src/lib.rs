//! Identity sources for `usersync`.
//!
//! `source_for(config)` picks the [`IdentitySource`] named by the resolved
//! configuration's `provider`:
//!
//! - `GSUITE`: [`GoogleWorkspaceSource`], the Admin SDK user listing.
//! - `FILE`: [`FileSource`], a local YAML list of identities.

pub mod file;
pub mod gsuite;

use usersync_core::{IdentitySource, Provider, RunConfig};

pub use file::FileSource;
pub use gsuite::GoogleWorkspaceSource;

/// Build the identity source selected by `config.provider`.
pub fn source_for(config: &RunConfig) -> Box<dyn IdentitySource> {
    let options = &config.provider_options;
    match config.provider {
        Provider::GSuite => Box::new(GoogleWorkspaceSource::new(
            options.credentials.clone(),
            options.domain.clone().unwrap_or_default(),
            options.custom_attribute_key.clone(),
        )),
        Provider::File => Box::new(FileSource::new(options.credentials.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use usersync_core::{GroupName, ProviderOptions};

    fn config(provider: Provider) -> RunConfig {
        RunConfig {
            managed_group: GroupName::from("iamusersync"),
            keep_home_dir: false,
            log_file: PathBuf::from("/var/log/iamusersync.log"),
            home_root: PathBuf::from("/home"),
            provider,
            provider_options: ProviderOptions {
                credentials: PathBuf::from("/etc/iamusersync/credentials"),
                custom_attribute_key: "SSHKEY".into(),
                admin_email: Some("admin@example.com".into()),
                domain: Some("example.com".into()),
            },
        }
    }

    #[test]
    fn provider_selects_the_source() {
        assert_eq!(source_for(&config(Provider::GSuite)).provider(), Provider::GSuite);
        assert_eq!(source_for(&config(Provider::File)).provider(), Provider::File);
    }
}
