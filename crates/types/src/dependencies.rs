//! Dependency sets carried by a package

use serde::{Deserialize, Serialize};

/// Declared (or finalized) dependency sets of one package
///
/// `vendored` is informational only: it is rendered as a comment in
/// `.PKGINFO` and never takes part in resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Dependencies {
    #[serde(default)]
    pub runtime: Vec<String>,
    #[serde(default)]
    pub provides: Vec<String>,
    #[serde(default)]
    pub replaces: Vec<String>,
    #[serde(default)]
    pub vendored: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_priority: Option<u64>,
}

/// Result of inspecting a package's built files
///
/// Produced by a composition analyzer and serialized as-is into the
/// per-architecture dependency log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredDependencies {
    #[serde(default)]
    pub runtime: Vec<String>,
    #[serde(default)]
    pub provides: Vec<String>,
    #[serde(default)]
    pub vendored: Vec<String>,
}

/// Switches that tell the analyzer which virtuals to skip
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PackageOptions {
    #[serde(default)]
    pub no_provides: bool,
    #[serde(default)]
    pub no_depends: bool,
    #[serde(default)]
    pub no_commands: bool,
}
