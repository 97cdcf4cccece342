//! Signing error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum SigningError {
    #[error("signing key not found: {path}")]
    KeyNotFound { path: String },

    #[error("unable to load signing key {path}: {reason}")]
    KeyLoad { path: String, reason: String },

    #[error("signature creation failed: {reason}")]
    SignFailed { reason: String },

    #[error("signature verification failed: {reason}")]
    VerificationFailed { reason: String },
}

impl UserFacingError for SigningError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::KeyNotFound { .. } => Some("Point packaging.signing.key at an existing PEM file."),
            Self::KeyLoad { .. } => {
                Some("Use an RSA key in PKCS#1 or PKCS#8 PEM form and check the passphrase.")
            }
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::KeyNotFound { .. } => "signing.key_not_found",
            Self::KeyLoad { .. } => "signing.key_load",
            Self::SignFailed { .. } => "signing.sign_failed",
            Self::VerificationFailed { .. } => "signing.verification_failed",
        };
        Some(code)
    }
}
