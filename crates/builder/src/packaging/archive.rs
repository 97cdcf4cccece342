//! Deterministic tar writing for reproducible packages
//!
//! Identical input trees and timestamps produce identical archives: entries
//! are visited in byte order of their names, every mtime is the fixed
//! timestamp and ownership goes through the remap table.

use super::ownership::{OwnerNames, RemapTable};
use apkforge_hash::{sha1_hex, sha1_hex_reader};
use std::fs::{self, File, Metadata};
use std::io::{self, Seek, SeekFrom, Write};
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};
use tar::{Builder, EntryType, Header};

/// PAX record carrying the per-entry checksum read by apk-tools
pub const CHECKSUM_PAX_KEY: &str = "APK-TOOLS.checksum.SHA1";

/// Size of the end-of-archive marker (two zero blocks)
const TAR_TRAILER_LEN: usize = 1024;

/// How the entries of a staged tree are written
#[derive(Debug, Clone, Copy)]
pub struct TreeOptions<'a> {
    pub mtime: u64,
    pub remap: &'a RemapTable,
    pub names: &'a OwnerNames,
    /// Emit `APK-TOOLS.checksum.SHA1` records for files and symlinks
    pub checksums: bool,
}

/// Add the contents of `root` to the archive, without `root` itself
///
/// Symlinks are stored, never followed. Sockets, fifos and device nodes
/// are skipped.
///
/// # Errors
///
/// Returns the first I/O error, annotated with the offending path.
pub fn append_tree<W: Write>(
    builder: &mut Builder<W>,
    root: &Path,
    options: &TreeOptions<'_>,
) -> io::Result<()> {
    builder.follow_symlinks(false);
    append_dir_contents(builder, root, Path::new(""), options)
}

fn append_dir_contents<W: Write>(
    builder: &mut Builder<W>,
    dir: &Path,
    prefix: &Path,
    options: &TreeOptions<'_>,
) -> io::Result<()> {
    let mut entries = fs::read_dir(dir)
        .map_err(|e| with_path(e, dir))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| with_path(e, dir))?;
    entries.sort_by_key(fs::DirEntry::file_name);

    for entry in entries {
        let path = entry.path();
        let name = prefix.join(entry.file_name());
        let metadata = fs::symlink_metadata(&path).map_err(|e| with_path(e, &path))?;
        let file_type = metadata.file_type();

        if file_type.is_dir() {
            let mut header = entry_header(EntryType::Directory, &metadata, options)?;
            header.set_size(0);
            let mut dir_name = name.clone().into_os_string();
            dir_name.push("/");
            builder
                .append_data(&mut header, Path::new(&dir_name), io::empty())
                .map_err(|e| with_path(e, &path))?;
            append_dir_contents(builder, &path, &name, options)?;
        } else if file_type.is_file() {
            append_regular(builder, &path, &name, &metadata, options)
                .map_err(|e| with_path(e, &path))?;
        } else if file_type.is_symlink() {
            append_symlink(builder, &path, &name, &metadata, options)
                .map_err(|e| with_path(e, &path))?;
        }
    }
    Ok(())
}

fn append_regular<W: Write>(
    builder: &mut Builder<W>,
    path: &Path,
    name: &Path,
    metadata: &Metadata,
    options: &TreeOptions<'_>,
) -> io::Result<()> {
    let mut file = File::open(path)?;

    if options.checksums {
        let checksum = sha1_hex_reader(&mut file)?;
        builder.append_pax_extensions([(CHECKSUM_PAX_KEY, checksum.as_bytes())])?;
        file.seek(SeekFrom::Start(0))?;
    }

    let mut header = entry_header(EntryType::Regular, metadata, options)?;
    header.set_size(metadata.len());
    builder.append_data(&mut header, name, &mut file)
}

fn append_symlink<W: Write>(
    builder: &mut Builder<W>,
    path: &Path,
    name: &Path,
    metadata: &Metadata,
    options: &TreeOptions<'_>,
) -> io::Result<()> {
    let target: PathBuf = fs::read_link(path)?;

    if options.checksums {
        let checksum = sha1_hex(target.as_os_str().as_encoded_bytes());
        builder.append_pax_extensions([(CHECKSUM_PAX_KEY, checksum.as_bytes())])?;
    }

    let mut header = entry_header(EntryType::Symlink, metadata, options)?;
    header.set_size(0);
    builder.append_link(&mut header, name, &target)
}

fn entry_header(
    entry_type: EntryType,
    metadata: &Metadata,
    options: &TreeOptions<'_>,
) -> io::Result<Header> {
    let uid = options.remap.uid(metadata.uid());
    let gid = options.remap.gid(metadata.gid());

    let mut header = Header::new_gnu();
    header.set_entry_type(entry_type);
    header.set_mode(metadata.permissions().mode() & 0o7777);
    header.set_mtime(options.mtime);
    header.set_uid(u64::from(uid));
    header.set_gid(u64::from(gid));
    header.set_username(options.names.user(uid))?;
    header.set_groupname(options.names.group(gid))?;
    header.set_device_major(0)?;
    header.set_device_minor(0)?;
    Ok(header)
}

/// Add an in-memory file owned by root
///
/// # Errors
///
/// Returns an error if the entry cannot be written.
pub fn append_root_file<W: Write>(
    builder: &mut Builder<W>,
    name: &str,
    data: &[u8],
    mode: u32,
    mtime: u64,
) -> io::Result<()> {
    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Regular);
    header.set_size(data.len() as u64);
    header.set_mode(mode);
    header.set_mtime(mtime);
    header.set_uid(0);
    header.set_gid(0);
    header.set_username("root")?;
    header.set_groupname("root")?;
    header.set_device_major(0)?;
    header.set_device_minor(0)?;
    builder.append_data(&mut header, name, data)
}

/// Finish an in-memory archive and strip its end-of-archive marker
///
/// Control and signature sections are concatenated in front of the data
/// section, so only the last tar in the file may carry the marker.
///
/// # Errors
///
/// Returns an error if the archive cannot be finished.
pub fn into_unterminated(builder: Builder<Vec<u8>>) -> io::Result<Vec<u8>> {
    let mut bytes = builder.into_inner()?;
    let len = bytes.len().saturating_sub(TAR_TRAILER_LEN);
    bytes.truncate(len);
    Ok(bytes)
}

fn with_path(err: io::Error, path: &Path) -> io::Error {
    io::Error::new(err.kind(), format!("{}: {err}", path.display()))
}
