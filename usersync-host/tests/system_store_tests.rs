use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::os::unix::fs::{MetadataExt, PermissionsExt};

use tempfile::TempDir;
use usersync_core::{GroupName, LocalIdentityStore, StoreError, Username};
use usersync_host::{CommandOutput, CommandRunner, SystemStore, DIR_MODE, KEY_FILE_MODE};

/// Records every command and answers from a table; unknown commands succeed
/// with empty output.
#[derive(Default)]
struct ScriptedRunner {
    answers: BTreeMap<String, CommandOutput>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedRunner {
    fn answer(mut self, command: &str, code: i32, stdout: &str) -> Self {
        self.answers.insert(
            command.to_string(),
            CommandOutput {
                code: Some(code),
                stdout: stdout.to_string(),
                stderr: if code == 0 { String::new() } else { format!("{command}: failed") },
            },
        );
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, StoreError> {
        let rendered = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.borrow_mut().push(rendered.clone());
        Ok(self.answers.get(&rendered).cloned().unwrap_or(CommandOutput {
            code: Some(0),
            ..Default::default()
        }))
    }
}

fn group() -> GroupName {
    GroupName::from("iamusersync")
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[test]
fn group_lookup_distinguishes_absent_from_failure() {
    let store = SystemStore::with_runner(
        ScriptedRunner::default()
            .answer("getent group iamusersync", 2, "")
            .answer("getent group broken", 1, ""),
    );
    assert!(!store.group_exists(&group()).expect("lookup"));
    assert!(matches!(
        store.group_exists(&GroupName::from("broken")),
        Err(StoreError::Command { .. })
    ));
}

#[test]
fn members_are_read_from_getent() {
    let store = SystemStore::with_runner(
        ScriptedRunner::default().answer("getent group iamusersync", 0, "iamusersync:x:1001:alice,bob\n"),
    );
    let members = store.members_of(&group()).expect("members");
    assert_eq!(
        members.into_iter().collect::<Vec<_>>(),
        vec![Username::from("alice"), Username::from("bob")]
    );
}

#[test]
fn non_canonical_members_are_never_rewritten() {
    let mut store = SystemStore::with_runner(ScriptedRunner::default().answer(
        "getent group iamusersync",
        0,
        "iamusersync:x:1001:Bob,alice,../etc\n",
    ));

    let members = store.members_of(&group()).expect("members");
    assert_eq!(members.into_iter().collect::<Vec<_>>(), vec![Username::from("alice")]);

    for member in store.members_of(&group()).expect("members") {
        store.delete_account(&member).expect("userdel");
    }
    let calls = store.runner().calls();
    assert!(calls.contains(&"userdel alice".to_string()));
    assert!(!calls.iter().any(|c| c == "userdel bob" || c == "userdel ../etc"));
}

#[test]
fn mutations_issue_shadow_utils_commands() {
    let mut store = SystemStore::with_runner(ScriptedRunner::default());
    let alice = Username::from("alice");

    store.create_group(&group()).expect("groupadd");
    store
        .create_account(&alice, std::path::Path::new("/home/alice"))
        .expect("useradd");
    store.add_to_group(&alice, &group()).expect("usermod");
    store.delete_account(&alice).expect("userdel");

    assert_eq!(
        store.runner().calls(),
        vec![
            "groupadd iamusersync",
            "useradd -m -d /home/alice alice",
            "usermod -aG iamusersync alice",
            "userdel alice",
        ]
    );
}

#[test]
fn failing_command_surfaces_stderr() {
    let mut store = SystemStore::with_runner(
        ScriptedRunner::default().answer("useradd -m -d /home/alice alice", 9, ""),
    );
    let err = store
        .create_account(&Username::from("alice"), std::path::Path::new("/home/alice"))
        .unwrap_err();
    assert!(err.to_string().contains("useradd -m -d /home/alice alice"));
    assert!(err.to_string().contains("exit code 9"));
}

// ---------------------------------------------------------------------------
// Filesystem
// ---------------------------------------------------------------------------

#[test]
fn ssh_artifacts_get_restrictive_modes() {
    let dir = TempDir::new().expect("tempdir");
    let mut store = SystemStore::with_runner(ScriptedRunner::default());
    let ssh = dir.path().join(".ssh");
    let keys = ssh.join("authorized_keys");

    assert!(!store.path_exists(&ssh).expect("stat"));
    store.mkdir(&ssh).expect("mkdir");
    store.write_file(&keys, b"ssh-ed25519 AAAA alice").expect("write");

    assert!(store.path_exists(&keys).expect("stat"));
    assert_eq!(fs::read(&keys).expect("read"), b"ssh-ed25519 AAAA alice");
    assert_eq!(fs::metadata(&ssh).expect("meta").permissions().mode() & 0o777, DIR_MODE);
    assert_eq!(fs::metadata(&keys).expect("meta").permissions().mode() & 0o777, KEY_FILE_MODE);
}

#[test]
fn write_file_never_overwrites() {
    let dir = TempDir::new().expect("tempdir");
    let mut store = SystemStore::with_runner(ScriptedRunner::default());
    let keys = dir.path().join("authorized_keys");
    fs::write(&keys, "old").expect("seed");

    let err = store.write_file(&keys, b"new").unwrap_err();
    assert!(matches!(err, StoreError::Io { .. }));
    assert_eq!(fs::read_to_string(&keys).expect("read"), "old");
}

#[test]
fn remove_tree_tolerates_missing_path() {
    let dir = TempDir::new().expect("tempdir");
    let mut store = SystemStore::with_runner(ScriptedRunner::default());
    let home = dir.path().join("carol");
    fs::create_dir_all(home.join(".ssh")).expect("seed");

    store.remove_tree(&home).expect("remove");
    assert!(!home.exists());
    store.remove_tree(&home).expect("remove again");
}

#[test]
fn chown_uses_passwd_ids() {
    let dir = TempDir::new().expect("tempdir");
    let meta = fs::metadata(dir.path()).expect("meta");
    let line = format!("alice:x:{}:{}::/home/alice:/bin/sh\n", meta.uid(), meta.gid());
    let mut store =
        SystemStore::with_runner(ScriptedRunner::default().answer("getent passwd alice", 0, &line));

    store.chown(dir.path(), &Username::from("alice")).expect("chown");
    assert_eq!(store.runner().calls(), vec!["getent passwd alice"]);
}

#[test]
fn chown_for_unknown_account_fails() {
    let dir = TempDir::new().expect("tempdir");
    let mut store =
        SystemStore::with_runner(ScriptedRunner::default().answer("getent passwd ghost", 2, ""));
    assert!(matches!(
        store.chown(dir.path(), &Username::from("ghost")),
        Err(StoreError::UnknownAccount(_))
    ));
}
