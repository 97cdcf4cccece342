//! Names and paths derived from a package build

use crate::PackageBuild;
use apkforge_config::{PACKAGE_EXTENSION, STAGING_DIR};
use std::path::PathBuf;

impl PackageBuild {
    /// `{name}-{version}-r{epoch}`
    #[must_use]
    pub fn identity(&self) -> String {
        format!("{}-{}-r{}", self.package_name, self.version, self.epoch)
    }

    /// Final artifact path, `{out_dir}/{identity}.apk`
    #[must_use]
    pub fn filename(&self) -> PathBuf {
        self.out_dir
            .join(format!("{}.{PACKAGE_EXTENSION}", self.identity()))
    }

    /// Staged file tree, `{workspace_dir}/melange-out/{name}`
    #[must_use]
    pub fn workspace_subdir(&self) -> PathBuf {
        self.workspace_dir.join(STAGING_DIR).join(&self.package_name)
    }

    /// Signature entry name for a signing key, `.SIGN.RSA.{key}.pub`
    #[must_use]
    pub fn signature_name(&self, key_name: &str) -> String {
        apkforge_signing::signature_file_name(key_name)
    }

    /// Line appended to the shared build log
    #[must_use]
    pub fn build_log_line(&self) -> String {
        format!(
            "{}|{}|{}|{}\n",
            self.arch.to_apk(),
            self.origin_name,
            self.package_name,
            self.full_version()
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::PackageBuild;
    use apkforge_config::BuilderConfig;
    use apkforge_types::{Arch, Package};
    use std::path::PathBuf;

    #[test]
    fn test_identity_and_paths() {
        let mut config = BuilderConfig::default();
        config.paths.out_dir = PathBuf::from("/out");
        config.paths.workspace_dir = PathBuf::from("/work");
        let pkg = Package {
            name: "zlib".into(),
            version: "1.3.1".into(),
            epoch: 4,
            ..Package::default()
        };
        let build = PackageBuild::from_package(&pkg, Arch::X86_64, &config);

        assert_eq!(build.identity(), "zlib-1.3.1-r4");
        assert_eq!(build.filename(), PathBuf::from("/out/x86_64/zlib-1.3.1-r4.apk"));
        assert_eq!(build.workspace_subdir(), PathBuf::from("/work/melange-out/zlib"));
        assert_eq!(build.signature_name("melange.rsa"), ".SIGN.RSA.melange.rsa.pub");
        assert_eq!(build.build_log_line(), "x86_64|zlib|zlib|1.3.1-r4\n");
    }
}
