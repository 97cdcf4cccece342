//! Data section: the staged tree as a gzipped, hashed tar stream

use super::archive::{append_tree, TreeOptions};
use super::compression::ParallelGzEncoder;
use super::ownership::{OwnerNames, RemapTable};
use apkforge_config::GzipConcurrency;
use apkforge_errors::{BuildError, Error};
use apkforge_hash::{Hash, HashingWriter};
use std::io::{self, BufWriter, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A written data section, spooled to a temporary file
#[derive(Debug)]
pub struct DataSection {
    /// Compressed bytes, positioned at the start
    pub file: NamedTempFile,
    /// SHA-256 of the compressed bytes
    pub hash: Hash,
    pub compressed_size: u64,
}

/// Inputs of a data section emission
#[derive(Debug, Clone)]
pub struct DataSectionRequest {
    pub staged_dir: PathBuf,
    pub guest_dir: PathBuf,
    pub remap: RemapTable,
    pub mtime: u64,
    pub gzip: GzipConcurrency,
}

/// Write the data section on a blocking thread
///
/// # Errors
///
/// Returns `BuildError::DataSection` for walk, archive or compression
/// failures and `BuildError::TaskFailed` if the worker panics.
pub async fn emit_data_section(request: DataSectionRequest) -> Result<DataSection, Error> {
    tokio::task::spawn_blocking(move || write_data_section(&request))
        .await
        .map_err(|e| BuildError::TaskFailed {
            message: format!("data section task failed: {e}"),
        })?
}

/// Tar, compress and hash `staged_dir` in one pass
///
/// # Errors
///
/// Returns `BuildError::DataSection` on any I/O or compression failure.
pub fn write_data_section(request: &DataSectionRequest) -> Result<DataSection, Error> {
    let names = OwnerNames::load(&request.guest_dir);
    let options = TreeOptions {
        mtime: request.mtime,
        remap: &request.remap,
        names: &names,
        checksums: true,
    };

    let spool = NamedTempFile::new().map_err(data_err)?;
    let encoder = ParallelGzEncoder::new(HashingWriter::new(BufWriter::new(spool)), request.gzip)?;

    let mut builder = tar::Builder::new(encoder);
    append_tree(&mut builder, &request.staged_dir, &options).map_err(data_err)?;
    let encoder = builder.into_inner().map_err(data_err)?;

    let hashing = encoder.finish().map_err(data_err)?;
    let compressed_size = hashing.bytes_written();
    let (buffered, hash) = hashing.finish();
    let mut file = buffered
        .into_inner()
        .map_err(|e| data_err(e.into_error()))?;
    file.as_file_mut()
        .seek(SeekFrom::Start(0))
        .map_err(|e| data_err(io::Error::new(e.kind(), format!("unable to rewind data section: {e}"))))?;

    Ok(DataSection {
        file,
        hash,
        compressed_size,
    })
}

/// Convenience for callers holding only a staged directory
///
/// # Errors
///
/// See [`write_data_section`].
pub fn write_data_section_at(staged_dir: &Path, mtime: u64) -> Result<DataSection, Error> {
    write_data_section(&DataSectionRequest {
        staged_dir: staged_dir.to_path_buf(),
        guest_dir: PathBuf::from("/"),
        remap: RemapTable::default(),
        mtime,
        gzip: GzipConcurrency::serial(),
    })
}

fn data_err(err: io::Error) -> BuildError {
    BuildError::DataSection {
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apkforge_types::{Accounts, Group, User};
    use flate2::read::GzDecoder;
    use std::fs;
    use std::io::Read;
    use std::os::unix::fs::MetadataExt;

    #[test]
    fn test_hash_covers_compressed_bytes() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("usr/share")).unwrap();
        fs::write(dir.path().join("usr/share/readme"), b"hello").unwrap();

        let mut section = write_data_section_at(dir.path(), 0).unwrap();
        let mut bytes = Vec::new();
        section.file.as_file_mut().read_to_end(&mut bytes).unwrap();

        assert_eq!(bytes.len() as u64, section.compressed_size);
        assert_eq!(Hash::from_data(&bytes), section.hash);

        let mut tar = Vec::new();
        GzDecoder::new(&bytes[..]).read_to_end(&mut tar).unwrap();
        // the data tar keeps its end-of-archive marker
        assert!(tar.ends_with(&[0u8; 1024]));
    }

    #[test]
    fn test_build_owner_remapped_to_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("file"), b"x").unwrap();
        let owner = fs::metadata(dir.path().join("file")).unwrap();

        let accounts = Accounts {
            users: vec![User {
                username: "build".into(),
                uid: owner.uid(),
                gid: owner.gid(),
            }],
            groups: vec![Group {
                groupname: "build".into(),
                gid: owner.gid(),
                members: vec![],
            }],
        };

        let mut section = write_data_section(&DataSectionRequest {
            staged_dir: dir.path().to_path_buf(),
            guest_dir: PathBuf::from("/nonexistent"),
            remap: RemapTable::from_accounts(&accounts),
            mtime: 0,
            gzip: GzipConcurrency::serial(),
        })
        .unwrap();

        let mut bytes = Vec::new();
        section.file.as_file_mut().read_to_end(&mut bytes).unwrap();
        let mut archive = tar::Archive::new(GzDecoder::new(&bytes[..]));
        let entry = archive.entries().unwrap().next().unwrap().unwrap();
        assert_eq!(entry.header().uid().unwrap(), 0);
        assert_eq!(entry.header().gid().unwrap(), 0);
    }

    #[test]
    fn test_missing_staged_dir_is_data_section_error() {
        let err = write_data_section_at(Path::new("/nonexistent/staged"), 0).unwrap_err();
        assert!(matches!(
            err,
            Error::Build(BuildError::DataSection { .. })
        ));
    }
}
