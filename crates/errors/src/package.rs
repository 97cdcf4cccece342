//! Package specification error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum PackageError {
    #[error("invalid package specification: {message}")]
    InvalidSpec { message: String },

    #[error("unknown architecture: {arch}")]
    UnknownArch { arch: String },

    #[error("failed to parse package specification: {message}")]
    ParseError { message: String },
}

impl crate::UserFacingError for PackageError {
    fn user_message(&self) -> std::borrow::Cow<'_, str> {
        std::borrow::Cow::Owned(self.to_string())
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::InvalidSpec { .. } => "package.invalid_spec",
            Self::UnknownArch { .. } => "package.unknown_arch",
            Self::ParseError { .. } => "package.parse_error",
        };
        Some(code)
    }
}
