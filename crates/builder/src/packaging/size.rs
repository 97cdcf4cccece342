//! Installed size of a staged tree

use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Sum of the sizes of all regular files below `root`
///
/// Symlinks are not followed and count as zero, as do directories.
///
/// # Errors
///
/// Returns the first error hit while walking the tree.
pub fn installed_size(root: &Path) -> io::Result<u64> {
    let mut total = 0u64;
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry?;
        if entry.file_type().is_file() {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_sums_regular_files_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("top"), vec![0u8; 10]).unwrap();
        fs::write(dir.path().join("a/b/deep"), vec![0u8; 1000]).unwrap();
        std::os::unix::fs::symlink("a/b/deep", dir.path().join("link")).unwrap();
        std::os::unix::fs::symlink("a", dir.path().join("dirlink")).unwrap();

        assert_eq!(installed_size(dir.path()).unwrap(), 1010);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = installed_size(&dir.path().join("gone")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_empty_tree() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(installed_size(dir.path()).unwrap(), 0);
    }
}
