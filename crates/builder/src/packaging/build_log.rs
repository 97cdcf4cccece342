//! Shared log of emitted packages

use crate::PackageBuild;
use apkforge_config::BUILD_LOG_FILE;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

/// Append `arch|origin|name|version-rEpoch` to `{dir}/packages.log`
///
/// The line goes out in a single append write so concurrent emissions
/// never interleave within a line.
///
/// # Errors
///
/// Returns an error if the log cannot be opened or written.
pub fn append_build_log(dir: &Path, build: &PackageBuild) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(BUILD_LOG_FILE))?;
    file.write_all(build.build_log_line().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use apkforge_config::BuilderConfig;
    use apkforge_types::{Arch, Package, Subpackage};

    #[test]
    fn test_lines_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let config = BuilderConfig::default();
        let origin = Package {
            name: "curl".into(),
            version: "8.9.1".into(),
            epoch: 1,
            ..Package::default()
        };
        let sub = Subpackage {
            name: "libcurl4".into(),
            ..Subpackage::default()
        };

        append_build_log(dir.path(), &PackageBuild::from_package(&origin, Arch::X86_64, &config))
            .unwrap();
        append_build_log(
            dir.path(),
            &PackageBuild::from_subpackage(&origin, &sub, Arch::X86_64, &config),
        )
        .unwrap();

        let log = std::fs::read_to_string(dir.path().join("packages.log")).unwrap();
        assert_eq!(
            log,
            "x86_64|curl|curl|8.9.1-r1\nx86_64|curl|libcurl4|8.9.1-r1\n"
        );
    }
}
