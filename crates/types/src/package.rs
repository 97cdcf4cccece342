//! Package specification types

use crate::{Dependencies, Environment, PackageOptions, Scriptlets};
use apkforge_errors::PackageError;
use serde::{Deserialize, Serialize};

/// License/copyright attestation for a set of paths
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Copyright {
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub attestation: String,
    pub license: String,
}

/// The origin package of a build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub epoch: u64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub commit: String,
    #[serde(default)]
    pub copyright: Vec<Copyright>,
    #[serde(default)]
    pub dependencies: Dependencies,
    #[serde(default)]
    pub options: PackageOptions,
    #[serde(default)]
    pub scriptlets: Scriptlets,
}

impl Package {
    /// License strings in declaration order
    #[must_use]
    pub fn licenses(&self) -> Vec<String> {
        self.copyright.iter().map(|c| c.license.clone()).collect()
    }
}

/// A package split out of the origin build
///
/// Version, epoch and licensing are inherited from the origin package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subpackage {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub commit: String,
    #[serde(default)]
    pub dependencies: Dependencies,
    #[serde(default)]
    pub options: PackageOptions,
    #[serde(default)]
    pub scriptlets: Scriptlets,
}

/// Parsed build specification: origin package, subpackages and environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    pub package: Package,
    #[serde(default)]
    pub subpackages: Vec<Subpackage>,
    #[serde(default)]
    pub environment: Environment,
}

impl Configuration {
    /// Parse a specification from YAML
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid YAML for this schema or
    /// if the package has no name or version.
    pub fn from_yaml(input: &str) -> Result<Self, PackageError> {
        let config: Self = serde_yml::from_str(input).map_err(|e| PackageError::ParseError {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject specifications the emitter cannot name
    ///
    /// # Errors
    ///
    /// Returns an error if the origin package or any subpackage is unnamed,
    /// or if the origin package has no version.
    pub fn validate(&self) -> Result<(), PackageError> {
        if self.package.name.trim().is_empty() {
            return Err(PackageError::InvalidSpec {
                message: "package name is empty".to_string(),
            });
        }
        if self.package.version.trim().is_empty() {
            return Err(PackageError::InvalidSpec {
                message: format!("package {} has no version", self.package.name),
            });
        }
        if let Some(pos) = self.subpackages.iter().position(|s| s.name.trim().is_empty()) {
            return Err(PackageError::InvalidSpec {
                message: format!("subpackage #{pos} has no name"),
            });
        }
        Ok(())
    }
}
