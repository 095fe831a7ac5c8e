//! Membership differ.
//!
//! Pure functions over a [`DesiredSet`] and the managed group's current
//! members. Additions and removals are computed separately because the driver
//! must apply additions and re-read the group before it may compute removals.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use usersync_core::{Identity, Username};

// ---------------------------------------------------------------------------
// Desired set
// ---------------------------------------------------------------------------

/// Identities keyed by lowercase username.
///
/// When the source yields the same username twice the first entry wins; the
/// later ones are kept in [`DesiredSet::duplicates`] for reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredSet {
    by_name: BTreeMap<Username, Identity>,
    duplicates: Vec<Username>,
}

impl DesiredSet {
    pub fn from_identities(identities: impl IntoIterator<Item = Identity>) -> Self {
        let mut set = DesiredSet::default();
        for identity in identities {
            if set.by_name.contains_key(&identity.username) {
                set.duplicates.push(identity.username);
                continue;
            }
            set.by_name.insert(identity.username.clone(), identity);
        }
        set
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn contains(&self, username: &Username) -> bool {
        self.by_name.contains_key(username)
    }

    pub fn get(&self, username: &Username) -> Option<&Identity> {
        self.by_name.get(username)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Identity> {
        self.by_name.values()
    }

    pub fn duplicates(&self) -> &[Username] {
        &self.duplicates
    }
}

// ---------------------------------------------------------------------------
// Additions / removals
// ---------------------------------------------------------------------------

/// First-pass output: who needs an account and who only needs a repair check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Additions {
    pub to_add: Vec<Identity>,
    pub to_repair: Vec<Identity>,
}

/// Split `desired` by whether each username is already in `actual`.
///
/// Existing members always land in `to_repair`; they are never skipped.
pub fn plan_additions(desired: &DesiredSet, actual: &BTreeSet<Username>) -> Additions {
    let actual = normalize(actual);
    let (to_repair, to_add): (Vec<Identity>, Vec<Identity>) = desired
        .iter()
        .cloned()
        .partition(|identity| actual.contains(&identity.username));
    Additions { to_add, to_repair }
}

/// Members of `actual` the directory no longer lists.
///
/// Only meaningful against a membership read taken after additions were
/// applied.
pub fn plan_removals(desired: &DesiredSet, actual: &BTreeSet<Username>) -> Vec<Username> {
    normalize(actual)
        .into_iter()
        .filter(|name| !desired.contains(name))
        .collect()
}

fn normalize(actual: &BTreeSet<Username>) -> BTreeSet<Username> {
    actual
        .iter()
        .filter(|name| !name.as_str().is_empty())
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// A full reconciliation plan, as previewed by `iamusersync plan`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub to_add: Vec<Username>,
    pub to_repair: Vec<Username>,
    pub to_remove: Vec<Username>,
}

impl Plan {
    /// Predict both passes without touching the host.
    ///
    /// Everything in `to_add` is assumed to be a member after the first pass,
    /// so removals are computed against `actual ∪ to_add`.
    pub fn preview(desired: &DesiredSet, actual: &BTreeSet<Username>) -> Self {
        let additions = plan_additions(desired, actual);
        let mut after_add = normalize(actual);
        after_add.extend(additions.to_add.iter().map(|i| i.username.clone()));
        Plan {
            to_add: usernames(&additions.to_add),
            to_repair: usernames(&additions.to_repair),
            to_remove: plan_removals(desired, &after_add),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

fn usernames(identities: &[Identity]) -> Vec<Username> {
    identities.iter().map(|i| i.username.clone()).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> BTreeSet<Username> {
        list.iter().map(|n| Username::from(*n)).collect()
    }

    fn desired(list: &[&str]) -> DesiredSet {
        DesiredSet::from_identities(list.iter().map(|n| Identity::new(*n, format!("key-{n}"))))
    }

    #[test]
    fn add_repair_and_remove_sets() {
        let desired = desired(&["a", "b", "c"]);
        let actual = names(&["b", "c", "d"]);

        let additions = plan_additions(&desired, &actual);
        assert_eq!(usernames(&additions.to_add), vec![Username::from("a")]);
        assert_eq!(
            usernames(&additions.to_repair),
            vec![Username::from("b"), Username::from("c")]
        );

        let after_add = names(&["a", "b", "c", "d"]);
        assert_eq!(plan_removals(&desired, &after_add), vec![Username::from("d")]);
    }

    #[test]
    fn comparison_is_case_insensitive() {
        let desired = DesiredSet::from_identities(vec![Identity {
            username: Username::from("Alice"),
            public_key: "k".into(),
        }]);
        let actual = names(&["ALICE"]);
        let additions = plan_additions(&desired, &actual);
        assert!(additions.to_add.is_empty());
        assert_eq!(additions.to_repair.len(), 1);
        assert!(plan_removals(&desired, &actual).is_empty());
    }

    #[test]
    fn duplicate_usernames_keep_first_entry() {
        let set = DesiredSet::from_identities(vec![
            Identity::new("alice", "first"),
            Identity::new("ALICE", "second"),
        ]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(&Username::from("alice")).unwrap().public_key, "first");
        assert_eq!(set.duplicates(), &[Username::from("alice")]);
    }

    #[test]
    fn empty_key_identities_are_still_planned() {
        let set = DesiredSet::from_identities(vec![Identity::new("carol", "")]);
        let additions = plan_additions(&set, &BTreeSet::new());
        assert_eq!(additions.to_add.len(), 1);
    }

    #[test]
    fn blank_member_names_are_ignored() {
        let set = desired(&["alice"]);
        let actual = names(&["", "alice"]);
        assert!(plan_removals(&set, &actual).is_empty());
    }

    #[test]
    fn preview_never_removes_a_desired_identity() {
        let set = desired(&["alice", "bob"]);
        let plan = Plan::preview(&set, &names(&["bob", "carol"]));
        assert_eq!(plan.to_add, vec![Username::from("alice")]);
        assert_eq!(plan.to_repair, vec![Username::from("bob")]);
        assert_eq!(plan.to_remove, vec![Username::from("carol")]);
        assert!(!plan.is_noop());
    }

    #[test]
    fn plan_serializes_as_plain_name_lists() {
        let plan = Plan::preview(&desired(&["alice"]), &names(&["bob"]));
        let json = serde_json::to_value(&plan).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"to_add": ["alice"], "to_repair": [], "to_remove": ["bob"]})
        );
    }
}
