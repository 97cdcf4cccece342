//! Package emission error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum BuildError {
    #[error("unable to ensure workspace exists: {message}")]
    Workspace { message: String },

    #[error("analyzing package {package}: {message}")]
    DependencyAnalysis { package: String, message: String },

    #[error("unable to preprocess package data: {message}")]
    InstalledSize { message: String },

    #[error("unable to write data section: {message}")]
    DataSection { message: String },

    #[error("unable to build control section: {message}")]
    ControlSection { message: String },

    #[error("compression failed: {message}")]
    Compression { message: String },

    #[error("signing error: {message}")]
    SigningError { message: String },

    #[error("unable to write apk file {path}: {message}")]
    OutputFailed { path: String, message: String },

    #[error("hash mismatch for {file}: expected {expected}, got {actual}")]
    HashMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("malformed package archive: {message}")]
    MalformedArchive { message: String },

    #[error("build task failed: {message}")]
    TaskFailed { message: String },
}

impl UserFacingError for BuildError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Workspace { .. } | Self::OutputFailed { .. } => {
                Some("Ensure the workspace and output directories are writable.")
            }
            Self::DependencyAnalysis { .. } => {
                Some("Inspect the staged files or the recorded dependency data for this package.")
            }
            Self::SigningError { .. } => {
                Some("Verify signing configuration and ensure the required keys are available.")
            }
            Self::HashMismatch { .. } | Self::MalformedArchive { .. } => {
                Some("Rebuild the package; the artifact does not match its control data.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::TaskFailed { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Workspace { .. } => "build.workspace",
            Self::DependencyAnalysis { .. } => "build.dependency_analysis",
            Self::InstalledSize { .. } => "build.installed_size",
            Self::DataSection { .. } => "build.data_section",
            Self::ControlSection { .. } => "build.control_section",
            Self::Compression { .. } => "build.compression",
            Self::SigningError { .. } => "build.signing_error",
            Self::OutputFailed { .. } => "build.output_failed",
            Self::HashMismatch { .. } => "build.hash_mismatch",
            Self::MalformedArchive { .. } => "build.malformed_archive",
            Self::TaskFailed { .. } => "build.task_failed",
        };
        Some(code)
    }
}
