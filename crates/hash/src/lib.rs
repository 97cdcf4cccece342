#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Digests used by the apk container format
//!
//! SHA-256 covers the compressed data section (`datahash`), SHA-1 covers
//! individual archive entries (`APK-TOOLS.checksum.SHA1`) and the control
//! section that gets signed.

use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::{self, Read, Write};

/// A SHA-256 hash value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hash {
    bytes: [u8; 32],
}

impl Hash {
    /// Create a hash from raw bytes
    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Convert to hex string
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Compute hash of a byte slice
    #[must_use]
    pub fn from_data(data: &[u8]) -> Self {
        Self::from_bytes(Sha256::digest(data).into())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Writer adapter that hashes everything passing through it
///
/// Lets the data section be compressed, hashed and spooled to disk in a
/// single pass.
pub struct HashingWriter<W: Write> {
    inner: W,
    hasher: Sha256,
    written: u64,
}

impl<W: Write> HashingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            written: 0,
        }
    }

    /// Bytes forwarded to the inner writer so far
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Return the inner writer and the digest of everything written
    pub fn finish(self) -> (W, Hash) {
        (self.inner, Hash::from_bytes(self.hasher.finalize().into()))
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Raw SHA-1 digest of a byte slice
#[must_use]
pub fn sha1_digest(data: &[u8]) -> [u8; 20] {
    Sha1::digest(data).into()
}

/// Hex SHA-1 of a byte slice, the form used in per-entry checksum records
#[must_use]
pub fn sha1_hex(data: &[u8]) -> String {
    hex::encode(sha1_digest(data))
}

/// Hex SHA-1 of everything a reader yields
///
/// # Errors
/// Returns an error if reading fails.
pub fn sha1_hex_reader<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = Sha1::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_basics() {
        let hash = Hash::from_data(b"hello world");
        let expected = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";
        assert_eq!(hash.to_hex(), expected);
        assert_eq!(hash.to_string(), expected);
    }

    #[test]
    fn test_hashing_writer_matches_one_shot() {
        let mut writer = HashingWriter::new(Vec::new());
        writer.write_all(b"hello ").unwrap();
        writer.write_all(b"world").unwrap();
        assert_eq!(writer.bytes_written(), 11);

        let (inner, hash) = writer.finish();
        assert_eq!(inner, b"hello world");
        assert_eq!(hash, Hash::from_data(b"hello world"));
    }

    #[test]
    fn test_sha1_hex() {
        assert_eq!(
            sha1_hex(b"hello world"),
            "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed"
        );
        assert_eq!(sha1_hex(b""), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(
            sha1_hex_reader(&b"hello world"[..]).unwrap(),
            sha1_hex(b"hello world")
        );
    }
}
