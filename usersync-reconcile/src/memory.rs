//! In-memory collaborators for tests.
//!
//! [`MemoryStore`] models accounts, groups, and a flat path → node map, and
//! records every successful mutation so idempotence can be asserted by
//! comparing logs. [`MemoryReporter`] keeps the event stream.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use usersync_core::{
    GroupName, Identity, IdentitySource, Level, LocalIdentityStore, Provider, ReportEvent,
    Reporter, SourceError, StoreError, Username,
};

// ---------------------------------------------------------------------------
// Mutation log
// ---------------------------------------------------------------------------

/// One state-changing primitive call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    CreateGroup(GroupName),
    CreateAccount { username: Username, home: PathBuf },
    AddToGroup { username: Username, group: GroupName },
    DeleteAccount(Username),
    Mkdir(PathBuf),
    WriteFile(PathBuf),
    RemoveTree(PathBuf),
    Chown { path: PathBuf, username: Username },
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::CreateGroup(group) => write!(f, "create_group {group}"),
            Mutation::CreateAccount { username, home } => {
                write!(f, "create_account {username} {}", home.display())
            }
            Mutation::AddToGroup { username, group } => write!(f, "add_to_group {username} {group}"),
            Mutation::DeleteAccount(username) => write!(f, "delete_account {username}"),
            Mutation::Mkdir(path) => write!(f, "mkdir {}", path.display()),
            Mutation::WriteFile(path) => write!(f, "write_file {}", path.display()),
            Mutation::RemoveTree(path) => write!(f, "remove_tree {}", path.display()),
            Mutation::Chown { path, username } => write!(f, "chown {} {username}", path.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Dir,
    File(Vec<u8>),
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// A [`LocalIdentityStore`] that never touches the host.
#[derive(Debug, Default)]
pub struct MemoryStore {
    groups: BTreeMap<GroupName, BTreeSet<Username>>,
    accounts: BTreeMap<Username, PathBuf>,
    nodes: BTreeMap<PathBuf, Node>,
    owners: BTreeMap<PathBuf, Username>,
    mutations: Vec<Mutation>,
    fail_on: Vec<Mutation>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- seeding (not recorded) ----

    pub fn seed_group(&mut self, group: &GroupName) {
        self.groups.entry(group.clone()).or_default();
    }

    /// An account with an existing home directory, as `useradd -m` leaves it.
    pub fn seed_account(&mut self, username: &Username, home: &Path) {
        self.accounts.insert(username.clone(), home.to_path_buf());
        self.nodes.insert(home.to_path_buf(), Node::Dir);
        self.owners.insert(home.to_path_buf(), username.clone());
    }

    /// An account that is already a member of `group`.
    pub fn seed_member(&mut self, group: &GroupName, username: &Username, home: &Path) {
        self.seed_account(username, home);
        self.groups
            .entry(group.clone())
            .or_default()
            .insert(username.clone());
    }

    pub fn seed_file(&mut self, path: &Path, contents: &[u8]) {
        self.nodes
            .insert(path.to_path_buf(), Node::File(contents.to_vec()));
    }

    pub fn seed_dir(&mut self, path: &Path) {
        self.nodes.insert(path.to_path_buf(), Node::Dir);
    }

    /// Make the next matching primitive call fail instead of applying.
    pub fn fail_on(&mut self, mutation: Mutation) {
        self.fail_on.push(mutation);
    }

    // ---- inspection ----

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn clear_mutations(&mut self) {
        self.mutations.clear();
    }

    pub fn has_group(&self, group: &GroupName) -> bool {
        self.groups.contains_key(group)
    }

    pub fn has_account(&self, username: &Username) -> bool {
        self.accounts.contains_key(username)
    }

    pub fn members(&self, group: &GroupName) -> BTreeSet<Username> {
        self.groups.get(group).cloned().unwrap_or_default()
    }

    pub fn is_dir(&self, path: &Path) -> bool {
        matches!(self.nodes.get(path), Some(Node::Dir))
    }

    pub fn file(&self, path: &Path) -> Option<&[u8]> {
        match self.nodes.get(path) {
            Some(Node::File(contents)) => Some(contents.as_slice()),
            _ => None,
        }
    }

    pub fn owner(&self, path: &Path) -> Option<&Username> {
        self.owners.get(path)
    }

    // ---- internals ----

    fn apply(&mut self, mutation: Mutation) -> Result<(), StoreError> {
        if let Some(pos) = self.fail_on.iter().position(|m| *m == mutation) {
            self.fail_on.remove(pos);
            return Err(StoreError::Rejected {
                operation: mutation.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        self.mutations.push(mutation);
        Ok(())
    }

    fn require_account(&self, username: &Username) -> Result<(), StoreError> {
        if self.accounts.contains_key(username) {
            Ok(())
        } else {
            Err(StoreError::UnknownAccount(username.clone()))
        }
    }
}

fn not_found(path: &Path) -> StoreError {
    StoreError::io(path, std::io::Error::from(ErrorKind::NotFound))
}

impl LocalIdentityStore for MemoryStore {
    fn group_exists(&self, group: &GroupName) -> Result<bool, StoreError> {
        Ok(self.groups.contains_key(group))
    }

    fn create_group(&mut self, group: &GroupName) -> Result<(), StoreError> {
        if self.groups.contains_key(group) {
            return Err(StoreError::Rejected {
                operation: format!("create_group {group}"),
                reason: "group already exists".to_string(),
            });
        }
        self.apply(Mutation::CreateGroup(group.clone()))?;
        self.groups.insert(group.clone(), BTreeSet::new());
        Ok(())
    }

    fn members_of(&self, group: &GroupName) -> Result<BTreeSet<Username>, StoreError> {
        Ok(self.members(group))
    }

    fn account_exists(&self, username: &Username) -> Result<bool, StoreError> {
        Ok(self.accounts.contains_key(username))
    }

    fn create_account(&mut self, username: &Username, home: &Path) -> Result<(), StoreError> {
        if self.accounts.contains_key(username) {
            return Err(StoreError::Rejected {
                operation: format!("create_account {username}"),
                reason: "account already exists".to_string(),
            });
        }
        self.apply(Mutation::CreateAccount {
            username: username.clone(),
            home: home.to_path_buf(),
        })?;
        self.accounts.insert(username.clone(), home.to_path_buf());
        // A home kept from an earlier deletion is reused as-is.
        if !self.nodes.contains_key(home) {
            self.nodes.insert(home.to_path_buf(), Node::Dir);
            self.owners.insert(home.to_path_buf(), username.clone());
        }
        Ok(())
    }

    fn add_to_group(&mut self, username: &Username, group: &GroupName) -> Result<(), StoreError> {
        self.require_account(username)?;
        if !self.groups.contains_key(group) {
            return Err(StoreError::Rejected {
                operation: format!("add_to_group {username} {group}"),
                reason: "no such group".to_string(),
            });
        }
        self.apply(Mutation::AddToGroup {
            username: username.clone(),
            group: group.clone(),
        })?;
        if let Some(members) = self.groups.get_mut(group) {
            members.insert(username.clone());
        }
        Ok(())
    }

    fn delete_account(&mut self, username: &Username) -> Result<(), StoreError> {
        self.require_account(username)?;
        self.apply(Mutation::DeleteAccount(username.clone()))?;
        self.accounts.remove(username);
        for members in self.groups.values_mut() {
            members.remove(username);
        }
        Ok(())
    }

    fn path_exists(&self, path: &Path) -> Result<bool, StoreError> {
        Ok(self.nodes.contains_key(path))
    }

    fn mkdir(&mut self, path: &Path) -> Result<(), StoreError> {
        if self.nodes.contains_key(path) {
            return Err(StoreError::io(
                path,
                std::io::Error::from(ErrorKind::AlreadyExists),
            ));
        }
        self.apply(Mutation::Mkdir(path.to_path_buf()))?;
        self.nodes.insert(path.to_path_buf(), Node::Dir);
        Ok(())
    }

    fn write_file(&mut self, path: &Path, contents: &[u8]) -> Result<(), StoreError> {
        let parent_is_dir = path.parent().map(|p| self.is_dir(p)).unwrap_or(false);
        if !parent_is_dir {
            return Err(not_found(path));
        }
        self.apply(Mutation::WriteFile(path.to_path_buf()))?;
        self.nodes
            .insert(path.to_path_buf(), Node::File(contents.to_vec()));
        Ok(())
    }

    fn remove_tree(&mut self, path: &Path) -> Result<(), StoreError> {
        self.apply(Mutation::RemoveTree(path.to_path_buf()))?;
        self.nodes.retain(|p, _| !p.starts_with(path));
        self.owners.retain(|p, _| !p.starts_with(path));
        Ok(())
    }

    fn chown(&mut self, path: &Path, username: &Username) -> Result<(), StoreError> {
        self.require_account(username)?;
        if !self.nodes.contains_key(path) {
            return Err(not_found(path));
        }
        self.apply(Mutation::Chown {
            path: path.to_path_buf(),
            username: username.clone(),
        })?;
        self.owners.insert(path.to_path_buf(), username.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryReporter
// ---------------------------------------------------------------------------

/// A [`Reporter`] that keeps every event for later assertions.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: RefCell<Vec<ReportEvent>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReportEvent> {
        self.events.borrow().clone()
    }

    pub fn messages(&self, level: Level) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter(|e| e.level == level)
            .map(|e| e.message.clone())
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.events
            .borrow()
            .iter()
            .any(|e| e.message.contains(needle))
    }
}

impl Reporter for MemoryReporter {
    fn emit(&self, event: ReportEvent) {
        self.events.borrow_mut().push(event);
    }
}

// ---------------------------------------------------------------------------
// StaticSource
// ---------------------------------------------------------------------------

/// An [`IdentitySource`] that returns a fixed list, or a fixed failure.
#[derive(Debug, Clone)]
pub struct StaticSource {
    identities: Vec<Identity>,
    fail: Option<String>,
    fetches: Cell<usize>,
}

impl StaticSource {
    pub fn new(identities: Vec<Identity>) -> Self {
        Self {
            identities,
            fail: None,
            fetches: Cell::new(0),
        }
    }

    /// A source whose every fetch fails with a request error.
    pub fn failing(message: &str) -> Self {
        Self {
            identities: Vec::new(),
            fail: Some(message.to_string()),
            fetches: Cell::new(0),
        }
    }

    /// How many times `fetch` has been called.
    pub fn fetches(&self) -> usize {
        self.fetches.get()
    }
}

impl IdentitySource for StaticSource {
    fn provider(&self) -> Provider {
        Provider::File
    }

    fn fetch(&self) -> Result<Vec<Identity>, SourceError> {
        self.fetches.set(self.fetches.get() + 1);
        match &self.fail {
            Some(message) => Err(SourceError::Request {
                url: "memory://static".to_string(),
                message: message.clone(),
            }),
            None => Ok(self.identities.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injected_failure_fires_once() {
        let mut store = MemoryStore::new();
        let group = GroupName::from("iamusersync");
        store.fail_on(Mutation::CreateGroup(group.clone()));

        assert!(store.create_group(&group).is_err());
        assert!(!store.has_group(&group));
        store.create_group(&group).expect("second attempt");
        assert_eq!(store.mutations(), &[Mutation::CreateGroup(group)]);
    }

    #[test]
    fn write_file_requires_parent_directory() {
        let mut store = MemoryStore::new();
        let err = store
            .write_file(Path::new("/home/alice/.ssh/authorized_keys"), b"k")
            .unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn delete_account_drops_membership_but_keeps_home() {
        let mut store = MemoryStore::new();
        let group = GroupName::from("iamusersync");
        let carol = Username::from("carol");
        store.seed_member(&group, &carol, Path::new("/home/carol"));

        store.delete_account(&carol).expect("delete");
        assert!(!store.has_account(&carol));
        assert!(store.members(&group).is_empty());
        assert!(store.is_dir(Path::new("/home/carol")));
    }
}
