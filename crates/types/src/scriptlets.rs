//! Install-time scriptlets

use serde::{Deserialize, Serialize};

/// Trigger script and the paths that fire it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    #[serde(default)]
    pub script: String,
    #[serde(default)]
    pub paths: Vec<String>,
}

/// Scriptlet bodies; an empty body means the scriptlet is absent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Scriptlets {
    #[serde(default)]
    pub trigger: Trigger,
    #[serde(default)]
    pub pre_install: String,
    #[serde(default)]
    pub post_install: String,
    #[serde(default)]
    pub pre_deinstall: String,
    #[serde(default)]
    pub post_deinstall: String,
    #[serde(default)]
    pub pre_upgrade: String,
    #[serde(default)]
    pub post_upgrade: String,
}

impl Scriptlets {
    /// Control-section file names paired with their bodies, in archive order
    #[must_use]
    pub fn files(&self) -> [(&'static str, &str); 7] {
        [
            (".post-deinstall", self.post_deinstall.as_str()),
            (".post-install", self.post_install.as_str()),
            (".post-upgrade", self.post_upgrade.as_str()),
            (".pre-deinstall", self.pre_deinstall.as_str()),
            (".pre-install", self.pre_install.as_str()),
            (".pre-upgrade", self.pre_upgrade.as_str()),
            (".trigger", self.trigger.script.as_str()),
        ]
    }
}
