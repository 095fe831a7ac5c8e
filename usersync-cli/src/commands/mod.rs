pub mod config;
pub mod plan;
pub mod run;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use usersync_core::config::DEFAULT_LOG_FILE;
use usersync_core::{RawConfig, RawProviderOptions, RunConfig};

/// Config file plus per-field overrides, shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// YAML config file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Local group that holds managed accounts.
    #[arg(long)]
    pub group: Option<String>,

    /// Keep home directories of deleted accounts.
    #[arg(long)]
    pub keep_home_dir: bool,

    /// Append the run log to this file.
    #[arg(long, value_name = "FILE")]
    pub logfile: Option<PathBuf>,

    /// Directory under which home directories live.
    #[arg(long, value_name = "DIR")]
    pub home_root: Option<PathBuf>,

    /// Identity provider: GSUITE or FILE.
    #[arg(long)]
    pub provider: Option<String>,

    /// GSUITE: access-token file. FILE: identity list.
    #[arg(long, value_name = "FILE")]
    pub credentials: Option<PathBuf>,

    /// Super admin email the service account acts for.
    #[arg(long, value_name = "EMAIL")]
    pub gsuiteadmin: Option<String>,

    /// Directory domain to list (defaults to the admin email's domain).
    #[arg(long, value_name = "DOMAIN")]
    pub oauthdomain: Option<String>,

    /// Custom schema holding the public key.
    #[arg(long, value_name = "KEY")]
    pub customattributekey: Option<String>,
}

impl ConfigArgs {
    /// The flags as a [`RawConfig`] layer. `--keep-home-dir` can only turn the policy on.
    pub fn overrides(&self) -> RawConfig {
        RawConfig {
            group: self.group.clone(),
            keep_home_dir: self.keep_home_dir.then_some(true),
            log_file: self.logfile.clone(),
            home_root: self.home_root.clone(),
            provider: self.provider.clone(),
            provider_options: RawProviderOptions {
                credentials: self.credentials.clone(),
                custom_attribute_key: self.customattributekey.clone(),
                admin_email: self.gsuiteadmin.clone(),
                domain: self.oauthdomain.clone(),
            },
        }
    }

    /// Config file (if any) with the flags layered on top, not yet resolved.
    pub fn load_raw(&self) -> Result<RawConfig> {
        let base = match &self.config {
            Some(path) => RawConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => RawConfig::default(),
        };
        Ok(base.merge(self.overrides()))
    }

    pub fn resolve(&self) -> Result<RunConfig> {
        resolve(self.load_raw()?)
    }
}

pub fn resolve(raw: RawConfig) -> Result<RunConfig> {
    raw.resolve().context("invalid configuration")
}

/// Where the run log goes, before the rest of the config is validated.
pub fn log_file_of(raw: &RawConfig) -> PathBuf {
    raw.log_file
        .clone()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE))
}
