//! Accounts of the build environment

use serde::{Deserialize, Serialize};

/// Name of the unprivileged account packages are built as
pub const BUILD_ACCOUNT: &str = "build";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub uid: u32,
    #[serde(default)]
    pub gid: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub groupname: String,
    pub gid: u32,
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accounts {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub groups: Vec<Group>,
}

impl Accounts {
    /// The build user, if the environment declares one
    #[must_use]
    pub fn build_user(&self) -> Option<&User> {
        self.users.iter().rev().find(|u| u.username == BUILD_ACCOUNT)
    }

    /// The build group, if the environment declares one
    #[must_use]
    pub fn build_group(&self) -> Option<&Group> {
        self.groups.iter().rev().find(|g| g.groupname == BUILD_ACCOUNT)
    }
}

/// Build environment description
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    #[serde(default)]
    pub accounts: Accounts,
}
