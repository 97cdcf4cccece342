//! Per-emission package state

use apkforge_config::BuilderConfig;
use apkforge_types::{Arch, Dependencies, Package, PackageOptions, Scriptlets, Subpackage};
use std::path::PathBuf;

/// Everything needed to emit one `.apk`
///
/// Built from the origin package or one of its subpackages. Subpackages
/// inherit version, epoch and licenses from the origin. `installed_size`
/// and `data_hash` are filled in while the data section is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageBuild {
    pub package_name: String,
    /// Name written to `origin`; the origin package unless origin names are stripped
    pub origin_name: String,
    pub version: String,
    pub epoch: u64,
    pub arch: Arch,
    /// Per-architecture output directory
    pub out_dir: PathBuf,
    pub workspace_dir: PathBuf,
    pub dependencies: Dependencies,
    pub options: PackageOptions,
    pub scriptlets: Scriptlets,
    pub description: String,
    pub url: String,
    pub commit: String,
    pub licenses: Vec<String>,
    pub installed_size: u64,
    /// Hex SHA-256 of the compressed data section, once written
    pub data_hash: Option<String>,
}

impl PackageBuild {
    /// State for the origin package itself
    #[must_use]
    pub fn from_package(origin: &Package, arch: Arch, config: &BuilderConfig) -> Self {
        Self {
            package_name: origin.name.clone(),
            origin_name: origin.name.clone(),
            version: origin.version.clone(),
            epoch: origin.epoch,
            arch,
            out_dir: config.arch_out_dir(arch.to_apk()),
            workspace_dir: config.paths.workspace_dir.clone(),
            dependencies: origin.dependencies.clone(),
            options: origin.options,
            scriptlets: origin.scriptlets.clone(),
            description: origin.description.clone(),
            url: origin.url.clone(),
            commit: origin.commit.clone(),
            licenses: origin.licenses(),
            installed_size: 0,
            data_hash: None,
        }
    }

    /// State for a subpackage of `origin`
    #[must_use]
    pub fn from_subpackage(
        origin: &Package,
        sub: &Subpackage,
        arch: Arch,
        config: &BuilderConfig,
    ) -> Self {
        let origin_name = if config.packaging.strip_origin_name {
            sub.name.clone()
        } else {
            origin.name.clone()
        };

        Self {
            package_name: sub.name.clone(),
            origin_name,
            dependencies: sub.dependencies.clone(),
            options: sub.options,
            scriptlets: sub.scriptlets.clone(),
            description: sub.description.clone(),
            url: sub.url.clone(),
            commit: sub.commit.clone(),
            ..Self::from_package(origin, arch, config)
        }
    }

    /// `version-rEpoch`
    #[must_use]
    pub fn full_version(&self) -> String {
        format!("{}-r{}", self.version, self.epoch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apkforge_types::Copyright;

    fn origin() -> Package {
        Package {
            name: "openssl".into(),
            version: "3.3.0".into(),
            epoch: 2,
            description: "toolkit for TLS".into(),
            copyright: vec![Copyright {
                license: "Apache-2.0".into(),
                ..Copyright::default()
            }],
            ..Package::default()
        }
    }

    fn subpackage() -> Subpackage {
        Subpackage {
            name: "libcrypto3".into(),
            description: "crypto library".into(),
            ..Subpackage::default()
        }
    }

    #[test]
    fn test_from_package() {
        let config = BuilderConfig::default();
        let build = PackageBuild::from_package(&origin(), Arch::X86_64, &config);
        assert_eq!(build.package_name, "openssl");
        assert_eq!(build.origin_name, "openssl");
        assert_eq!(build.full_version(), "3.3.0-r2");
        assert_eq!(build.out_dir, PathBuf::from("packages/x86_64"));
        assert_eq!(build.licenses, vec!["Apache-2.0".to_string()]);
        assert!(build.data_hash.is_none());
    }

    #[test]
    fn test_subpackage_inherits_version_and_origin() {
        let config = BuilderConfig::default();
        let build = PackageBuild::from_subpackage(&origin(), &subpackage(), Arch::Aarch64, &config);
        assert_eq!(build.package_name, "libcrypto3");
        assert_eq!(build.origin_name, "openssl");
        assert_eq!(build.version, "3.3.0");
        assert_eq!(build.epoch, 2);
        assert_eq!(build.description, "crypto library");
        assert_eq!(build.licenses, vec!["Apache-2.0".to_string()]);
        assert_eq!(build.out_dir, PathBuf::from("packages/aarch64"));
    }

    #[test]
    fn test_strip_origin_name() {
        let mut config = BuilderConfig::default();
        config.packaging.strip_origin_name = true;
        let build = PackageBuild::from_subpackage(&origin(), &subpackage(), Arch::X86_64, &config);
        assert_eq!(build.origin_name, "libcrypto3");
    }
}
