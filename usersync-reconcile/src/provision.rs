//! Provisioner: make one identity's local account exist and satisfy the
//! authorized-keys invariant.
//!
//! ## Invariant repair, in order
//!
//! 1. `<home>` missing → mkdir + chown (first-provisioning signal).
//! 2. `<home>/.ssh` missing → mkdir + chown.
//! 3. `<home>/.ssh/authorized_keys` missing → write the public key + chown.
//!
//! Every step is guarded by an existence check, so a second call against a
//! correct account mutates nothing. An existing `authorized_keys` is never
//! rewritten; a rotated directory key is not propagated.

use std::path::{Path, PathBuf};

use usersync_core::{GroupName, Identity, LocalIdentityStore, Reporter, StoreError};

/// A per-account artifact the invariant requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Home,
    SshDir,
    AuthorizedKeys,
}

/// What [`Provisioner::ensure`] had to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionOutcome {
    pub created_account: bool,
    pub joined_group: bool,
    pub repaired: Vec<Artifact>,
}

impl ProvisionOutcome {
    /// True when the account was already complete.
    pub fn is_noop(&self) -> bool {
        !self.created_account && !self.joined_group && self.repaired.is_empty()
    }
}

/// Paths the invariant covers for one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountPaths {
    pub home: PathBuf,
    pub ssh_dir: PathBuf,
    pub authorized_keys: PathBuf,
}

impl AccountPaths {
    pub fn new(home: PathBuf) -> Self {
        let ssh_dir = home.join(".ssh");
        let authorized_keys = ssh_dir.join("authorized_keys");
        Self {
            home,
            ssh_dir,
            authorized_keys,
        }
    }
}

pub struct Provisioner<'a> {
    store: &'a mut dyn LocalIdentityStore,
    reporter: &'a dyn Reporter,
    group: &'a GroupName,
    home_root: &'a Path,
}

impl<'a> Provisioner<'a> {
    pub fn new(
        store: &'a mut dyn LocalIdentityStore,
        reporter: &'a dyn Reporter,
        group: &'a GroupName,
        home_root: &'a Path,
    ) -> Self {
        Self {
            store,
            reporter,
            group,
            home_root,
        }
    }

    /// Converge one identity.
    ///
    /// `in_group` is whether the first-pass membership read already listed
    /// this username. An account that exists but is missing from the group
    /// (left behind by a run that failed between the two steps) is added to
    /// it rather than recreated.
    pub fn ensure(
        &mut self,
        identity: &Identity,
        in_group: bool,
    ) -> Result<ProvisionOutcome, StoreError> {
        let username = &identity.username;
        if !username.is_valid_account_name() {
            return Err(StoreError::Rejected {
                operation: format!("provision {username}"),
                reason: "not a valid account name".to_string(),
            });
        }
        let home = username.home_in(self.home_root);
        let mut outcome = ProvisionOutcome::default();

        if !in_group {
            if !self.store.account_exists(username)? {
                self.reporter.info(&format!(
                    "new user found in directory that does not exist locally, adding user: {username}"
                ));
                self.store.create_account(username, &home)?;
                outcome.created_account = true;
            } else {
                self.reporter.info(&format!(
                    "local account {username} exists but is not in group {}, adding it",
                    self.group
                ));
            }
            self.store.add_to_group(username, self.group)?;
            self.reporter
                .info(&format!("added {username} to group {}", self.group));
            outcome.joined_group = true;
        }

        outcome.repaired = self.repair(identity)?;
        Ok(outcome)
    }

    /// Create whichever of home, `.ssh` and `authorized_keys` are missing.
    pub fn repair(&mut self, identity: &Identity) -> Result<Vec<Artifact>, StoreError> {
        let username = &identity.username;
        let paths = AccountPaths::new(username.home_in(self.home_root));
        let mut repaired = Vec::new();

        if !self.store.path_exists(&paths.home)? {
            self.store.mkdir(&paths.home)?;
            self.store.chown(&paths.home, username)?;
            self.reporter.info(&format!(
                "home folder not detected for {username}, populating {}",
                paths.authorized_keys.display()
            ));
            repaired.push(Artifact::Home);
        }

        if !self.store.path_exists(&paths.ssh_dir)? {
            self.store.mkdir(&paths.ssh_dir)?;
            self.store.chown(&paths.ssh_dir, username)?;
            self.reporter
                .info(&format!("created {}", paths.ssh_dir.display()));
            repaired.push(Artifact::SshDir);
        }

        if !self.store.path_exists(&paths.authorized_keys)? {
            self.store
                .write_file(&paths.authorized_keys, identity.public_key.as_bytes())?;
            self.store.chown(&paths.authorized_keys, username)?;
            if identity.public_key.is_empty() {
                self.reporter.info(&format!(
                    "created empty {} (directory has no public key for {username})",
                    paths.authorized_keys.display()
                ));
            } else {
                self.reporter
                    .info(&format!("created {}", paths.authorized_keys.display()));
            }
            repaired.push(Artifact::AuthorizedKeys);
        }

        Ok(repaired)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryReporter, MemoryStore, Mutation};
    use usersync_core::Username;

    fn group() -> GroupName {
        GroupName::from("iamusersync")
    }

    fn root() -> &'static Path {
        Path::new("/home")
    }

    fn provision(store: &mut MemoryStore, identity: &Identity, in_group: bool) -> ProvisionOutcome {
        let reporter = MemoryReporter::new();
        let group = group();
        Provisioner::new(store, &reporter, &group, root())
            .ensure(identity, in_group)
            .expect("ensure")
    }

    #[test]
    fn new_account_is_created_joined_and_keyed() {
        let mut store = MemoryStore::new();
        store.seed_group(&group());
        let alice = Identity::new("alice", "ssh-ed25519 AAAA alice");

        let outcome = provision(&mut store, &alice, false);
        assert!(outcome.created_account);
        assert!(outcome.joined_group);
        assert_eq!(outcome.repaired, vec![Artifact::SshDir, Artifact::AuthorizedKeys]);

        let keys = Path::new("/home/alice/.ssh/authorized_keys");
        assert_eq!(store.file(keys), Some(&b"ssh-ed25519 AAAA alice"[..]));
        assert_eq!(store.owner(keys), Some(&Username::from("alice")));
        assert!(store.members(&group()).contains(&Username::from("alice")));
    }

    #[test]
    fn second_run_is_a_noop() {
        let mut store = MemoryStore::new();
        store.seed_group(&group());
        let alice = Identity::new("alice", "key1");

        provision(&mut store, &alice, false);
        store.clear_mutations();

        let outcome = provision(&mut store, &alice, true);
        assert!(outcome.is_noop());
        assert!(store.mutations().is_empty(), "got: {:?}", store.mutations());
    }

    #[test]
    fn missing_home_is_recreated_with_ownership() {
        let mut store = MemoryStore::new();
        let bob = Username::from("bob");
        store.seed_group(&group());
        store.seed_member(&group(), &bob, Path::new("/home/bob"));
        store.remove_tree(Path::new("/home/bob")).expect("drop home");
        store.clear_mutations();

        let outcome = provision(&mut store, &Identity::new("bob", "key2"), true);
        assert_eq!(
            outcome.repaired,
            vec![Artifact::Home, Artifact::SshDir, Artifact::AuthorizedKeys]
        );
        assert_eq!(
            store.mutations()[..2],
            [
                Mutation::Mkdir(PathBuf::from("/home/bob")),
                Mutation::Chown {
                    path: PathBuf::from("/home/bob"),
                    username: bob.clone()
                },
            ]
        );
    }

    #[test]
    fn existing_authorized_keys_is_not_overwritten() {
        let mut store = MemoryStore::new();
        let bob = Username::from("bob");
        store.seed_member(&group(), &bob, Path::new("/home/bob"));
        store.seed_dir(Path::new("/home/bob/.ssh"));
        store.seed_file(Path::new("/home/bob/.ssh/authorized_keys"), b"old-key");

        let outcome = provision(&mut store, &Identity::new("bob", "rotated-key"), true);
        assert!(outcome.is_noop());
        assert_eq!(
            store.file(Path::new("/home/bob/.ssh/authorized_keys")),
            Some(&b"old-key"[..])
        );
    }

    #[test]
    fn orphaned_account_is_added_to_group_not_recreated() {
        let mut store = MemoryStore::new();
        let dave = Username::from("dave");
        store.seed_group(&group());
        store.seed_account(&dave, Path::new("/home/dave"));

        let outcome = provision(&mut store, &Identity::new("dave", "k"), false);
        assert!(!outcome.created_account);
        assert!(outcome.joined_group);
        assert!(!store
            .mutations()
            .iter()
            .any(|m| matches!(m, Mutation::CreateAccount { .. })));
        assert!(store.members(&group()).contains(&dave));
    }

    #[test]
    fn empty_public_key_still_provisions_account() {
        let mut store = MemoryStore::new();
        store.seed_group(&group());

        let outcome = provision(&mut store, &Identity::new("erin", ""), false);
        assert!(outcome.created_account);
        assert_eq!(
            store.file(Path::new("/home/erin/.ssh/authorized_keys")),
            Some(&b""[..])
        );
    }

    #[test]
    fn account_creation_failure_is_returned() {
        let mut store = MemoryStore::new();
        store.seed_group(&group());
        store.fail_on(Mutation::CreateAccount {
            username: Username::from("alice"),
            home: PathBuf::from("/home/alice"),
        });

        let reporter = MemoryReporter::new();
        let group = group();
        let err = Provisioner::new(&mut store, &reporter, &group, root())
            .ensure(&Identity::new("alice", "k"), false)
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected { .. }));
        assert!(!store.has_account(&Username::from("alice")));
    }

    #[test]
    fn invalid_name_is_rejected_before_any_mutation() {
        let mut store = MemoryStore::new();
        store.seed_group(&group());

        let reporter = MemoryReporter::new();
        let group = group();
        let err = Provisioner::new(&mut store, &reporter, &group, root())
            .ensure(&Identity::new("../etc", "k"), false)
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected { .. }));
        assert!(store.mutations().is_empty(), "got: {:?}", store.mutations());
        assert!(reporter.events().is_empty());
    }
}
