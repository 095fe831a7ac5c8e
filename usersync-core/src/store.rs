//! The local identity store seam: OS accounts, groups and the files that
//! belong to them.
//!
//! The interface is deliberately narrow. The reconciliation core never sees a
//! command line or a uid; everything is a username, a group name or a path.

use std::collections::BTreeSet;
use std::path::Path;

use crate::error::StoreError;
use crate::types::{GroupName, Username};

pub trait LocalIdentityStore {
    fn group_exists(&self, group: &GroupName) -> Result<bool, StoreError>;

    fn create_group(&mut self, group: &GroupName) -> Result<(), StoreError>;

    /// Supplementary members of `group`. Empty when the group has none.
    fn members_of(&self, group: &GroupName) -> Result<BTreeSet<Username>, StoreError>;

    fn account_exists(&self, username: &Username) -> Result<bool, StoreError>;

    /// Create the account with `home` as its home directory.
    fn create_account(&mut self, username: &Username, home: &Path) -> Result<(), StoreError>;

    fn add_to_group(&mut self, username: &Username, group: &GroupName) -> Result<(), StoreError>;

    /// Remove the account. Its home directory is left alone.
    fn delete_account(&mut self, username: &Username) -> Result<(), StoreError>;

    fn path_exists(&self, path: &Path) -> Result<bool, StoreError>;

    fn mkdir(&mut self, path: &Path) -> Result<(), StoreError>;

    /// Create `path` with `contents`. Callers only use this for files that do not exist yet.
    fn write_file(&mut self, path: &Path, contents: &[u8]) -> Result<(), StoreError>;

    fn remove_tree(&mut self, path: &Path) -> Result<(), StoreError>;

    /// Give `username` (and its primary group) ownership of `path`.
    fn chown(&mut self, path: &Path, username: &Username) -> Result<(), StoreError>;
}
