//! Parsers for `getent group` and `getent passwd` lines.

use usersync_core::Username;

/// `getent` exit code for "key not found in database".
pub const NOT_FOUND: i32 = 2;

/// Members listed in the fourth field of `name:x:gid:a,b,c`, exactly as the
/// account database spells them.
///
/// Blank entries are ignored, so a group with no members yields an empty list.
/// Returns `None` when the line does not have four fields.
pub fn parse_group_members(line: &str) -> Option<Vec<&str>> {
    let members = line.trim_end_matches(['\r', '\n']).splitn(4, ':').nth(3)?;
    Some(
        members
            .split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .collect(),
    )
}

/// The member name as a [`Username`], if it already is one.
///
/// Names that normalization would change (`Bob`) or that are not valid account
/// names refer to accounts this tool never created; acting on their
/// normalized form would touch a different account.
pub fn canonical_member(raw: &str) -> Option<Username> {
    let username = Username::from(raw);
    (username.as_str() == raw && username.is_valid_account_name()).then_some(username)
}

/// `(uid, gid)` from `name:x:uid:gid:gecos:home:shell`.
pub fn parse_passwd_ids(line: &str) -> Option<(u32, u32)> {
    let mut fields = line.trim().split(':');
    let uid = fields.nth(2)?.parse().ok()?;
    let gid = fields.next()?.parse().ok()?;
    Some((uid, gid))
}
