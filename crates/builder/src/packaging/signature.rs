//! Signature section

use super::archive::{append_root_file, into_unterminated};
use super::compression::gzip_bytes;
use apkforge_errors::{BuildError, Error};
use apkforge_signing::{signature_file_name, ApkSigner};
use tar::Builder;

/// Sign the compressed control section and wrap the signature in its own section
///
/// # Errors
///
/// Returns `BuildError::SigningError` if signing or archiving fails.
pub fn build_signature_section(
    signer: &dyn ApkSigner,
    control: &[u8],
    mtime: u64,
) -> Result<Vec<u8>, Error> {
    let signature = signer.sign(control)?;
    let name = signature_file_name(signer.key_name());

    let mut builder = Builder::new(Vec::new());
    let archived = append_root_file(&mut builder, &name, &signature, 0o644, mtime)
        .and_then(|()| into_unterminated(builder))
        .and_then(|tar| gzip_bytes(&tar));

    archived.map_err(|e| {
        BuildError::SigningError {
            message: format!("unable to write signature section: {e}"),
        }
        .into()
    })
}
