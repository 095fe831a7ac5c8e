//! Deprovisioner: remove a stale local account and, unless the policy keeps
//! it, the account's home directory.

use std::path::Path;

use usersync_core::{LocalIdentityStore, Reporter, StoreError, Username};

pub struct Deprovisioner<'a> {
    store: &'a mut dyn LocalIdentityStore,
    reporter: &'a dyn Reporter,
    home_root: &'a Path,
    keep_home_dir: bool,
}

impl<'a> Deprovisioner<'a> {
    pub fn new(
        store: &'a mut dyn LocalIdentityStore,
        reporter: &'a dyn Reporter,
        home_root: &'a Path,
        keep_home_dir: bool,
    ) -> Self {
        Self {
            store,
            reporter,
            home_root,
            keep_home_dir,
        }
    }

    /// Delete the account, then (policy permitting) `<home_root>/<username>`.
    ///
    /// Both steps are reported before either runs. The home-folder notice is a
    /// statement of intent; a failed deletion still comes back as an error.
    pub fn remove(&mut self, username: &Username) -> Result<(), StoreError> {
        if !username.is_valid_account_name() {
            return Err(StoreError::Rejected {
                operation: format!("delete_account {username}"),
                reason: "not a valid account name".to_string(),
            });
        }
        let home = username.home_in(self.home_root);

        self.reporter
            .info(&format!("stale user found, deleting user: {username}"));
        if !self.keep_home_dir {
            self.reporter
                .info(&format!("{username}'s home folder has been deleted"));
        }

        self.store.delete_account(username)?;
        if !self.keep_home_dir {
            self.store.remove_tree(&home)?;
        }
        Ok(())
    }
}
