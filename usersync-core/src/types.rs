//! Domain types shared by every usersync crate.
//!
//! Account and group names are lowercase newtypes; construction normalizes
//! case so that comparisons between directory output and `getent` output are
//! always like-for-like.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Longest account or group name accepted by shadow-utils.
pub const MAX_NAME_LEN: usize = 32;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A local account name. Always trimmed and lowercase.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Username(String);

impl Username {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the name could be handed to `useradd` as-is.
    pub fn is_valid_account_name(&self) -> bool {
        is_posix_name(&self.0)
    }

    /// `<root>/<username>`: the home directory the engine manages for this account.
    pub fn home_in(&self, root: &Path) -> PathBuf {
        root.join(&self.0)
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Username {
    fn from(s: String) -> Self {
        Self(s.trim().to_lowercase())
    }
}

impl From<&str> for Username {
    fn from(s: &str) -> Self {
        Self(s.trim().to_lowercase())
    }
}

impl From<Username> for String {
    fn from(u: Username) -> Self {
        u.0
    }
}

/// The name of the managed OS group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct GroupName(String);

impl GroupName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_valid(&self) -> bool {
        is_posix_name(&self.0)
    }
}

impl fmt::Display for GroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for GroupName {
    fn from(s: String) -> Self {
        Self(s.trim().to_lowercase())
    }
}

impl From<&str> for GroupName {
    fn from(s: &str) -> Self {
        Self(s.trim().to_lowercase())
    }
}

impl From<GroupName> for String {
    fn from(g: GroupName) -> Self {
        g.0
    }
}

/// `[a-z_][a-z0-9_.-]*`, at most [`MAX_NAME_LEN`] bytes.
fn is_posix_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    name.len() <= MAX_NAME_LEN
        && (first.is_ascii_lowercase() || first == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | '-'))
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A directory principal: who should have an account, and which key they log in with.
///
/// An empty `public_key` is allowed; the account is still provisioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: Username,
    #[serde(rename = "publickey", default)]
    pub public_key: String,
}

impl Identity {
    pub fn new(username: impl Into<Username>, public_key: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            public_key: public_key.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Where the desired identity set comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provider {
    /// Google Workspace Admin SDK directory.
    #[serde(rename = "GSUITE")]
    GSuite,
    /// A local YAML list of identities.
    #[serde(rename = "FILE")]
    File,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::GSuite => write!(f, "GSUITE"),
            Provider::File => write!(f, "FILE"),
        }
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GSUITE" => Ok(Provider::GSuite),
            "FILE" => Ok(Provider::File),
            other => Err(format!(
                "unknown provider '{other}'; expected: GSUITE, FILE"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
