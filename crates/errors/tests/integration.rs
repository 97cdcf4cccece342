//! Integration tests for error types

#[cfg(test)]
mod tests {
    use apkforge_errors::*;

    #[test]
    fn test_error_conversion() {
        let build_err = BuildError::DataSection {
            message: "disk full".into(),
        };
        let err: Error = build_err.into();
        assert!(matches!(err, Error::Build(_)));
        assert_eq!(err.user_code(), Some("build.data_section"));
    }

    #[test]
    fn test_error_display_names_phase() {
        let err = BuildError::DependencyAnalysis {
            package: "zlib".into(),
            message: "scanner crashed".into(),
        };
        assert_eq!(err.to_string(), "analyzing package zlib: scanner crashed");
    }

    #[test]
    fn test_error_clone() {
        let err = SigningError::KeyNotFound {
            path: "/keys/test.rsa".into(),
        };
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        let err: Error = io_err.into();
        assert!(matches!(
            err,
            Error::Io {
                kind: std::io::ErrorKind::PermissionDenied,
                ..
            }
        ));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_user_hints() {
        let err: Error = SigningError::KeyLoad {
            path: "k.pem".into(),
            reason: "bad pem".into(),
        }
        .into();
        assert!(err.user_hint().is_some());
        assert_eq!(err.user_code(), Some("signing.key_load"));
    }
}
