//! Run configuration: YAML file, command-line overrides, defaults.
//!
//! ```yaml
//! group: iamusersync
//! keephomedir: false
//! logfile: /var/log/iamusersync.log
//! homeroot: /home
//! provider: GSUITE
//! provider-options:
//!   credentials: /etc/iamusersync/token.json
//!   customattributekey: SSHKEY
//!   gsuiteadmin: admin@example.com
//!   oauthdomain: example.com
//! ```
//!
//! Resolution is `file → overrides → defaults → validation`. An empty string
//! counts as unset, so a blank YAML value falls through to the default.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{GroupName, Provider};

pub const DEFAULT_GROUP: &str = "iamusersync";
pub const DEFAULT_LOG_FILE: &str = "/var/log/iamusersync.log";
pub const DEFAULT_HOME_ROOT: &str = "/home";
pub const DEFAULT_CUSTOM_ATTRIBUTE_KEY: &str = "SSHKEY";

// ---------------------------------------------------------------------------
// Raw (unvalidated) configuration
// ---------------------------------------------------------------------------

/// Configuration as written in the YAML file or collected from flags.
///
/// Every field is optional; [`RawConfig::resolve`] fills in defaults and
/// rejects incomplete settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub group: Option<String>,
    #[serde(rename = "keephomedir")]
    pub keep_home_dir: Option<bool>,
    #[serde(rename = "logfile")]
    pub log_file: Option<PathBuf>,
    #[serde(rename = "homeroot")]
    pub home_root: Option<PathBuf>,
    pub provider: Option<String>,
    #[serde(rename = "provider-options")]
    pub provider_options: RawProviderOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawProviderOptions {
    pub credentials: Option<PathBuf>,
    #[serde(rename = "customattributekey")]
    pub custom_attribute_key: Option<String>,
    #[serde(rename = "gsuiteadmin")]
    pub admin_email: Option<String>,
    #[serde(rename = "oauthdomain")]
    pub domain: Option<String>,
}

impl RawConfig {
    /// Read a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Layer `overrides` on top of `self`: every value set in `overrides` wins.
    pub fn merge(self, overrides: RawConfig) -> RawConfig {
        let base = self.provider_options;
        let over = overrides.provider_options;
        RawConfig {
            group: non_empty(overrides.group).or(self.group),
            keep_home_dir: overrides.keep_home_dir.or(self.keep_home_dir),
            log_file: non_empty_path(overrides.log_file).or(self.log_file),
            home_root: non_empty_path(overrides.home_root).or(self.home_root),
            provider: non_empty(overrides.provider).or(self.provider),
            provider_options: RawProviderOptions {
                credentials: non_empty_path(over.credentials).or(base.credentials),
                custom_attribute_key: non_empty(over.custom_attribute_key)
                    .or(base.custom_attribute_key),
                admin_email: non_empty(over.admin_email).or(base.admin_email),
                domain: non_empty(over.domain).or(base.domain),
            },
        }
    }

    /// Apply defaults and validate, producing the driver's input.
    pub fn resolve(self) -> Result<RunConfig, ConfigError> {
        let provider = match non_empty(self.provider) {
            None => return Err(ConfigError::MissingProvider),
            Some(raw) => raw
                .parse::<Provider>()
                .map_err(|_| ConfigError::UnknownProvider(raw))?,
        };

        let opts = self.provider_options;
        let admin_email = non_empty(opts.admin_email);
        if provider == Provider::GSuite && admin_email.is_none() {
            return Err(ConfigError::MissingAdminEmail);
        }
        let credentials =
            non_empty_path(opts.credentials).ok_or(ConfigError::MissingCredentials)?;

        let managed_group = match non_empty(self.group) {
            Some(group) => GroupName::from(group),
            None => {
                tracing::info!("group not specified, using default: {DEFAULT_GROUP}");
                GroupName::from(DEFAULT_GROUP)
            }
        };
        let log_file = non_empty_path(self.log_file).unwrap_or_else(|| {
            tracing::info!("log file path not specified, using default: {DEFAULT_LOG_FILE}");
            PathBuf::from(DEFAULT_LOG_FILE)
        });
        let home_root =
            non_empty_path(self.home_root).unwrap_or_else(|| PathBuf::from(DEFAULT_HOME_ROOT));

        let domain = match (provider, non_empty(opts.domain), admin_email.as_deref()) {
            (_, Some(domain), _) => Some(domain),
            (Provider::GSuite, None, Some(email)) => {
                let domain = email_domain(email)?;
                tracing::info!("using domain for user lookup: {domain}");
                Some(domain)
            }
            _ => None,
        };
        let custom_attribute_key = non_empty(opts.custom_attribute_key).unwrap_or_else(|| {
            if provider == Provider::GSuite {
                tracing::info!(
                    "custom attribute key not specified, using default: {DEFAULT_CUSTOM_ATTRIBUTE_KEY}"
                );
            }
            DEFAULT_CUSTOM_ATTRIBUTE_KEY.to_string()
        });

        let config = RunConfig {
            managed_group,
            keep_home_dir: self.keep_home_dir.unwrap_or(false),
            log_file,
            home_root,
            provider,
            provider_options: ProviderOptions {
                credentials,
                custom_attribute_key,
                admin_email,
                domain,
            },
        };
        config.validate()?;
        Ok(config)
    }
}

/// Load `path` (if given), layer `overrides`, resolve.
pub fn load(path: Option<&Path>, overrides: RawConfig) -> Result<RunConfig, ConfigError> {
    let base = match path {
        Some(path) => {
            tracing::info!("loading config from: {}", path.display());
            RawConfig::load(path)?
        }
        None => RawConfig::default(),
    };
    base.merge(overrides).resolve()
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// The reconciliation driver's single input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunConfig {
    #[serde(rename = "group")]
    pub managed_group: GroupName,
    #[serde(rename = "keephomedir")]
    pub keep_home_dir: bool,
    #[serde(rename = "logfile")]
    pub log_file: PathBuf,
    #[serde(rename = "homeroot")]
    pub home_root: PathBuf,
    pub provider: Provider,
    #[serde(rename = "provider-options")]
    pub provider_options: ProviderOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderOptions {
    /// GSUITE: access-token file. FILE: the identity list.
    pub credentials: PathBuf,
    #[serde(rename = "customattributekey")]
    pub custom_attribute_key: String,
    #[serde(rename = "gsuiteadmin", skip_serializing_if = "Option::is_none")]
    pub admin_email: Option<String>,
    #[serde(rename = "oauthdomain", skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl RunConfig {
    /// Checks that hold regardless of how the value was built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.managed_group.is_valid() {
            return Err(ConfigError::InvalidGroup(self.managed_group.to_string()));
        }
        if !self.home_root.is_absolute() {
            return Err(ConfigError::RelativeHomeRoot(self.home_root.clone()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn non_empty_path(value: Option<PathBuf>) -> Option<PathBuf> {
    value.filter(|p| !p.as_os_str().is_empty())
}

fn email_domain(email: &str) -> Result<String, ConfigError> {
    match email.split_once('@') {
        Some((_, domain)) if !domain.is_empty() => Ok(domain.to_string()),
        _ => Err(ConfigError::InvalidAdminEmail(email.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
