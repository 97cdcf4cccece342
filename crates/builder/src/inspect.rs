//! Reading emitted artifacts back
//!
//! Used by the `inspect` command and by tests to check what was written.

use apkforge_errors::{BuildError, Error, SigningError};
use apkforge_hash::Hash;
use apkforge_signing::rsa::RsaPublicKey;
use flate2::bufread::GzDecoder;
use std::collections::BTreeMap;
use std::io::{self, Read};
use std::path::Path;
use tar::EntryType;

const PKGINFO_NAME: &str = ".PKGINFO";
const SIGNATURE_PREFIX: &str = ".SIGN.RSA.";
const SIGNATURE_SUFFIX: &str = ".pub";
const CHECKSUM_PAX_KEY: &str = crate::packaging::archive::CHECKSUM_PAX_KEY;

/// One tar entry of a section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionEntry {
    pub path: String,
    pub entry_type: EntryType,
    pub size: u64,
    pub mode: u32,
    pub uid: u64,
    pub gid: u64,
    pub uname: String,
    pub gname: String,
    pub mtime: u64,
    pub link_name: Option<String>,
    /// `APK-TOOLS.checksum.SHA1` record, if present
    pub checksum: Option<String>,
}

/// One gzip member of an artifact
#[derive(Debug, Clone)]
pub struct Section {
    /// Compressed bytes exactly as stored in the artifact
    pub compressed: Vec<u8>,
    pub entries: Vec<SectionEntry>,
}

/// The sections of an `.apk`
#[derive(Debug, Clone)]
pub struct ApkSections {
    pub signature: Option<Section>,
    pub control: Section,
    pub data: Section,
    pkginfo: Vec<(String, String)>,
    signature_blob: Option<(String, Vec<u8>)>,
}

impl ApkSections {
    /// Read and parse an artifact from disk
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid artifact.
    pub async fn from_file(path: &Path) -> Result<Self, Error> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| Error::io_with_path(&e, path))?;
        Self::parse(&bytes)
    }

    /// Split an artifact into its sections
    ///
    /// # Errors
    ///
    /// Returns `BuildError::MalformedArchive` unless the input holds a
    /// control and a data section, optionally preceded by a signature.
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        let mut members = split_members(bytes)?;

        let signature = match members.len() {
            2 => None,
            3 => Some(members.remove(0)),
            n => return Err(malformed(format!("expected 2 or 3 gzip members, found {n}"))),
        };
        let data = members.pop().ok_or_else(|| malformed("missing data section"))?;
        let control = members.pop().ok_or_else(|| malformed("missing control section"))?;

        let (control, control_files) = read_section(control, true)?;
        let (data, _) = read_section(data, false)?;

        let pkginfo = control_files
            .get(PKGINFO_NAME)
            .map(|raw| parse_pkginfo(&String::from_utf8_lossy(raw)))
            .ok_or_else(|| malformed("control section has no .PKGINFO"))?;

        let (signature, signature_blob) = match signature {
            Some(member) => {
                let (section, files) = read_section(member, true)?;
                let blob = files
                    .into_iter()
                    .find_map(|(name, body)| signature_key_name(&name).map(|key| (key, body)))
                    .ok_or_else(|| malformed("signature section has no .SIGN.RSA entry"))?;
                (Some(section), Some(blob))
            }
            None => (None, None),
        };

        Ok(Self {
            signature,
            control,
            data,
            pkginfo,
            signature_blob,
        })
    }

    /// `.PKGINFO` key/value pairs in file order, comments excluded
    #[must_use]
    pub fn pkginfo(&self) -> &[(String, String)] {
        &self.pkginfo
    }

    /// First value of a `.PKGINFO` key
    #[must_use]
    pub fn pkginfo_value(&self, key: &str) -> Option<&str> {
        self.pkginfo
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value of a repeated `.PKGINFO` key
    #[must_use]
    pub fn pkginfo_values(&self, key: &str) -> Vec<&str> {
        self.pkginfo
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Key name and raw bytes of the embedded signature
    #[must_use]
    pub fn signature_blob(&self) -> Option<(&str, &[u8])> {
        self.signature_blob
            .as_ref()
            .map(|(key, body)| (key.as_str(), body.as_slice()))
    }

    /// Recompute the data-section hash and compare it with `datahash`
    ///
    /// # Errors
    ///
    /// Returns `BuildError::MalformedArchive` without a `datahash` entry and
    /// `BuildError::HashMismatch` if the hashes differ.
    pub fn verify_data_hash(&self) -> Result<Hash, Error> {
        let expected = self
            .pkginfo_value("datahash")
            .ok_or_else(|| malformed(".PKGINFO has no datahash"))?;
        let actual = Hash::from_data(&self.data.compressed);

        if actual.to_hex() != expected {
            return Err(BuildError::HashMismatch {
                file: "data section".to_string(),
                expected: expected.to_string(),
                actual: actual.to_hex(),
            }
            .into());
        }
        Ok(actual)
    }

    /// Check the embedded signature against the compressed control section
    ///
    /// # Errors
    ///
    /// Returns `SigningError::VerificationFailed` for unsigned artifacts or
    /// a signature that does not match.
    pub fn verify_signature(&self, public_key: &RsaPublicKey) -> Result<(), Error> {
        let (_, blob) = self
            .signature_blob()
            .ok_or_else(|| SigningError::VerificationFailed {
                reason: "package is not signed".to_string(),
            })?;
        apkforge_signing::verify_signature(public_key, &self.control.compressed, blob)
    }
}

/// Cut the input into gzip members, keeping both forms of each
fn split_members(bytes: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, Error> {
    let mut members = Vec::new();
    let mut rest = bytes;

    while !rest.is_empty() {
        let mut decoder = GzDecoder::new(rest);
        let mut plain = Vec::new();
        decoder
            .read_to_end(&mut plain)
            .map_err(|e| malformed(format!("gzip member {}: {e}", members.len())))?;

        let remaining = decoder.into_inner();
        let used = rest.len() - remaining.len();
        if used == 0 {
            return Err(malformed("trailing bytes after last gzip member"));
        }
        members.push((rest[..used].to_vec(), plain));
        rest = remaining;
    }
    Ok(members)
}

/// List the entries of a decompressed tar, optionally keeping file bodies
fn read_section(
    (compressed, plain): (Vec<u8>, Vec<u8>),
    keep_contents: bool,
) -> Result<(Section, BTreeMap<String, Vec<u8>>), Error> {
    let mut files = BTreeMap::new();
    let entries = list_entries(&plain, keep_contents.then_some(&mut files))
        .map_err(|e| malformed(format!("invalid tar stream: {e}")))?;
    Ok((
        Section {
            compressed,
            entries,
        },
        files,
    ))
}

fn list_entries(
    plain: &[u8],
    mut contents: Option<&mut BTreeMap<String, Vec<u8>>>,
) -> io::Result<Vec<SectionEntry>> {
    let mut archive = tar::Archive::new(plain);
    let mut entries = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        let checksum = entry.pax_extensions()?.and_then(|mut exts| {
            exts.find_map(|ext| {
                let ext = ext.ok()?;
                (ext.key().ok()? == CHECKSUM_PAX_KEY)
                    .then(|| ext.value().ok().map(str::to_string))
                    .flatten()
            })
        });

        let header = entry.header();
        let record = SectionEntry {
            path: entry.path()?.display().to_string(),
            entry_type: header.entry_type(),
            size: header.size()?,
            mode: header.mode()?,
            uid: header.uid()?,
            gid: header.gid()?,
            uname: header.username().ok().flatten().unwrap_or_default().to_string(),
            gname: header.groupname().ok().flatten().unwrap_or_default().to_string(),
            mtime: header.mtime()?,
            link_name: entry.link_name()?.map(|l| l.display().to_string()),
            checksum,
        };

        if let Some(files) = contents.as_deref_mut() {
            if record.entry_type == EntryType::Regular {
                let mut body = Vec::new();
                entry.read_to_end(&mut body)?;
                files.insert(record.path.clone(), body);
            }
        }
        entries.push(record);
    }
    Ok(entries)
}

fn parse_pkginfo(text: &str) -> Vec<(String, String)> {
    text.lines()
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

fn signature_key_name(entry: &str) -> Option<String> {
    entry
        .strip_prefix(SIGNATURE_PREFIX)?
        .strip_suffix(SIGNATURE_SUFFIX)
        .map(str::to_string)
}

fn malformed(message: impl Into<String>) -> Error {
    BuildError::MalformedArchive {
        message: message.into(),
    }
    .into()
}
