//! [`LocalIdentityStore`] over shadow-utils and `std::fs`.
//!
//! | operation        | implementation                         |
//! |------------------|----------------------------------------|
//! | `group_exists`   | `getent group <g>` (exit 2 = absent)   |
//! | `members_of`     | fourth field of `getent group <g>`, canonical names only |
//! | `account_exists` | `getent passwd <u>`                    |
//! | `create_group`   | `groupadd <g>`                         |
//! | `create_account` | `useradd -m -d <home> <u>`             |
//! | `add_to_group`   | `usermod -aG <g> <u>`                  |
//! | `delete_account` | `userdel <u>`                          |
//! | `chown`          | uid/gid from `getent passwd`, `chown(2)` |
//!
//! Directories are created `0700` and key files `0600`, which is what sshd's
//! `StrictModes` expects.

use std::collections::BTreeSet;
use std::fs::{self, DirBuilder, OpenOptions};
use std::io::{ErrorKind, Write};
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::path::Path;

use usersync_core::{GroupName, LocalIdentityStore, StoreError, Username};

use crate::command::{render, CommandOutput, CommandRunner, SystemRunner};
use crate::getent::{self, NOT_FOUND};

pub const DIR_MODE: u32 = 0o700;
pub const KEY_FILE_MODE: u32 = 0o600;

/// The host's accounts, groups and filesystem.
#[derive(Debug, Default)]
pub struct SystemStore<R: CommandRunner = SystemRunner> {
    runner: R,
}

impl SystemStore<SystemRunner> {
    pub fn new() -> Self {
        Self {
            runner: SystemRunner,
        }
    }
}

impl<R: CommandRunner> SystemStore<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run a command that must succeed.
    fn exec(&self, program: &str, args: &[&str]) -> Result<CommandOutput, StoreError> {
        self.runner
            .run(program, args)?
            .check(&render(program, args))
    }

    /// `getent <db> <key>`: `Some(line)` if found, `None` on exit code 2.
    fn getent(&self, db: &str, key: &str) -> Result<Option<String>, StoreError> {
        let args = [db, key];
        let output = self.runner.run("getent", &args)?;
        if output.code == Some(NOT_FOUND) {
            return Ok(None);
        }
        let output = output.check(&render("getent", &args))?;
        Ok(Some(output.stdout))
    }

    fn ids_of(&self, username: &Username) -> Result<(u32, u32), StoreError> {
        let line = self
            .getent("passwd", username.as_str())?
            .ok_or_else(|| StoreError::UnknownAccount(username.clone()))?;
        getent::parse_passwd_ids(&line).ok_or_else(|| StoreError::Output {
            command: render("getent", &["passwd", username.as_str()]),
            output: line.trim().to_string(),
        })
    }
}

impl<R: CommandRunner> LocalIdentityStore for SystemStore<R> {
    fn group_exists(&self, group: &GroupName) -> Result<bool, StoreError> {
        Ok(self.getent("group", group.as_str())?.is_some())
    }

    fn create_group(&mut self, group: &GroupName) -> Result<(), StoreError> {
        self.exec("groupadd", &[group.as_str()])?;
        Ok(())
    }

    fn members_of(&self, group: &GroupName) -> Result<BTreeSet<Username>, StoreError> {
        let command = render("getent", &["group", group.as_str()]);
        let line = self
            .getent("group", group.as_str())?
            .ok_or_else(|| StoreError::Rejected {
                operation: command.clone(),
                reason: format!("group {group} does not exist"),
            })?;
        let raw = getent::parse_group_members(&line).ok_or_else(|| StoreError::Output {
            command,
            output: line.trim().to_string(),
        })?;

        let mut members = BTreeSet::new();
        for name in raw {
            match getent::canonical_member(name) {
                Some(username) => {
                    members.insert(username);
                }
                None => tracing::warn!(
                    group = %group,
                    member = name,
                    "ignoring group member that is not a lowercase account name"
                ),
            }
        }
        Ok(members)
    }

    fn account_exists(&self, username: &Username) -> Result<bool, StoreError> {
        Ok(self.getent("passwd", username.as_str())?.is_some())
    }

    fn create_account(&mut self, username: &Username, home: &Path) -> Result<(), StoreError> {
        let home = home.to_string_lossy().into_owned();
        self.exec("useradd", &["-m", "-d", home.as_str(), username.as_str()])?;
        Ok(())
    }

    fn add_to_group(&mut self, username: &Username, group: &GroupName) -> Result<(), StoreError> {
        self.exec("usermod", &["-aG", group.as_str(), username.as_str()])?;
        Ok(())
    }

    fn delete_account(&mut self, username: &Username) -> Result<(), StoreError> {
        self.exec("userdel", &[username.as_str()])?;
        Ok(())
    }

    fn path_exists(&self, path: &Path) -> Result<bool, StoreError> {
        match fs::symlink_metadata(path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    fn mkdir(&mut self, path: &Path) -> Result<(), StoreError> {
        DirBuilder::new()
            .mode(DIR_MODE)
            .create(path)
            .map_err(|e| StoreError::io(path, e))
    }

    fn write_file(&mut self, path: &Path, contents: &[u8]) -> Result<(), StoreError> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(KEY_FILE_MODE)
            .open(path)
            .map_err(|e| StoreError::io(path, e))?;
        file.write_all(contents)
            .map_err(|e| StoreError::io(path, e))
    }

    fn remove_tree(&mut self, path: &Path) -> Result<(), StoreError> {
        match fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    fn chown(&mut self, path: &Path, username: &Username) -> Result<(), StoreError> {
        let (uid, gid) = self.ids_of(username)?;
        std::os::unix::fs::chown(path, Some(uid), Some(gid)).map_err(|e| StoreError::io(path, e))
    }
}
