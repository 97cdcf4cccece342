//! Ownership of data-section entries
//!
//! Files staged by the `build` account are owned by root in the package;
//! every other owner passes through. Names come from the guest's account
//! databases, looked up after remapping.

use apkforge_types::Accounts;
use std::collections::HashMap;
use std::path::Path;

/// Numeric uid/gid remapping applied to the data section
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemapTable {
    uids: HashMap<u32, u32>,
    gids: HashMap<u32, u32>,
}

impl RemapTable {
    /// Map the `build` user and group to 0
    ///
    /// Without a `build` account the table stays empty, which is the same
    /// as mapping 0 to 0.
    #[must_use]
    pub fn from_accounts(accounts: &Accounts) -> Self {
        let mut table = Self::default();
        if let Some(user) = accounts.build_user() {
            table.uids.insert(user.uid, 0);
        }
        if let Some(group) = accounts.build_group() {
            table.gids.insert(group.gid, 0);
        }
        table
    }

    #[must_use]
    pub fn uid(&self, uid: u32) -> u32 {
        self.uids.get(&uid).copied().unwrap_or(uid)
    }

    #[must_use]
    pub fn gid(&self, gid: u32) -> u32 {
        self.gids.get(&gid).copied().unwrap_or(gid)
    }
}

/// User and group names of the guest filesystem
#[derive(Debug, Clone, Default)]
pub struct OwnerNames {
    users: HashMap<u32, String>,
    groups: HashMap<u32, String>,
}

impl OwnerNames {
    /// Read `etc/passwd` and `etc/group` below `guest_dir`
    ///
    /// Missing or unreadable files leave the corresponding table empty.
    #[must_use]
    pub fn load(guest_dir: &Path) -> Self {
        let read = |name: &str| {
            std::fs::read_to_string(guest_dir.join("etc").join(name)).unwrap_or_default()
        };
        Self {
            users: parse_id_file(&read("passwd")),
            groups: parse_id_file(&read("group")),
        }
    }

    #[must_use]
    pub fn user(&self, uid: u32) -> &str {
        self.users.get(&uid).map_or("", String::as_str)
    }

    #[must_use]
    pub fn group(&self, gid: u32) -> &str {
        self.groups.get(&gid).map_or("", String::as_str)
    }
}

/// Parse `name:password:id:...` lines; the first entry for an id wins
fn parse_id_file(contents: &str) -> HashMap<u32, String> {
    let mut names = HashMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split(':');
        let (Some(name), Some(_), Some(id)) = (fields.next(), fields.next(), fields.next()) else {
            continue;
        };
        if let Ok(id) = id.parse::<u32>() {
            names.entry(id).or_insert_with(|| name.to_string());
        }
    }
    names
}
