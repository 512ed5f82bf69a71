//! Parsing of the user and group databases (`getent passwd` / `getent group`).

use std::collections::BTreeSet;

/// Find the numeric id (third colon-separated field) of the entry named `name`.
/// The match is exact and case-sensitive.
#[must_use]
pub fn find_id(db: &str, name: &str) -> Option<u32> {
    db.lines()
        .map(|line| line.split(':').collect::<Vec<_>>())
        .find(|fields| fields.first() == Some(&name))
        .and_then(|fields| fields.get(2).and_then(|id| id.trim().parse().ok()))
}

/// Primary group id (fourth field) of the passwd entry named `name`.
#[must_use]
pub fn primary_gid(passwd_db: &str, name: &str) -> Option<u32> {
    passwd_db
        .lines()
        .map(|line| line.split(':').collect::<Vec<_>>())
        .find(|fields| fields.first() == Some(&name))
        .and_then(|fields| fields.get(3).and_then(|id| id.trim().parse().ok()))
}

/// Find the name of the group database entry with id `gid`.
#[must_use]
pub fn group_name(group_db: &str, gid: u32) -> Option<String> {
    group_db.lines().find_map(|line| {
        let fields: Vec<&str> = line.split(':').collect();
        let id: u32 = fields.get(2)?.trim().parse().ok()?;
        (id == gid).then(|| fields[0].to_string())
    })
}

/// Ids of all groups that list `user` as a supplementary member.
#[must_use]
pub fn member_gids(group_db: &str, user: &str) -> BTreeSet<u32> {
    group_db
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split(':').collect();
            let members = fields.get(3)?;
            let id: u32 = fields.get(2)?.trim().parse().ok()?;
            members
                .trim()
                .split(',')
                .any(|m| m == user)
                .then_some(id)
        })
        .collect()
}

/// Membership changes needed to go from `observed` to `desired`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MembershipChanges {
    pub add: Vec<u32>,
    pub remove: Vec<u32>,
}

/// Compute `desired − observed` and `observed − desired`, each sorted and deduplicated.
#[must_use]
pub fn membership_changes(observed: &[u32], desired: &[u32]) -> MembershipChanges {
    let observed: BTreeSet<u32> = observed.iter().copied().collect();
    let desired: BTreeSet<u32> = desired.iter().copied().collect();
    MembershipChanges {
        add: desired.difference(&observed).copied().collect(),
        remove: observed.difference(&desired).copied().collect(),
    }
}
