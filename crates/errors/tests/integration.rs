//! Integration tests for error types

#[cfg(test)]
mod tests {
    use kiln_errors::*;

    #[test]
    fn test_error_conversion() {
        let err: Error = ConfigurationError::UnknownOption {
            name: "lto".into(),
        }
        .into();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_error_display() {
        let err = ConfigurationError::CompilerTooOld {
            package: "libxmlpp/5.5.0".into(),
            standard: "17".into(),
            compiler: "gcc".into(),
            version: "7".into(),
            minimum: "8".into(),
        };
        assert_eq!(
            err.to_string(),
            "libxmlpp/5.5.0 requires C++17, which gcc 7 does not support (minimum 8)"
        );
    }

    #[test]
    fn test_phase_wrapping_keeps_first_phase() {
        let err = Error::from(PackagingError::MissingArtifact {
            path: "lib/libfoo.a".into(),
        })
        .in_phase("package")
        .in_phase("export");

        assert_eq!(err.phase(), Some("package"));
        assert!(matches!(err.root(), Error::Packaging(_)));
        assert_eq!(
            err.user_message(),
            "package phase failed: packaging error: expected artifact missing: lib/libfoo.a"
        );
        assert_eq!(err.user_code(), Some("packaging.missing_artifact"));
    }

    #[test]
    fn test_only_downloads_are_retryable() {
        let download: Error = AcquisitionError::DownloadFailed {
            url: "https://example.com/a.tar.gz".into(),
            message: "timeout".into(),
        }
        .into();
        let checksum: Error = AcquisitionError::ChecksumMismatch {
            file: "a.tar.gz".into(),
            expected: "00".into(),
            actual: "11".into(),
        }
        .into();
        let build: Error = BuildError::CompileFailed {
            message: "error: expected ';'".into(),
        }
        .into();

        assert!(download.in_phase("source").is_retryable());
        assert!(!checksum.is_retryable());
        assert!(!build.is_retryable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = Error::io_with_path(&io_err, "/tmp/pkg");
        assert_eq!(err.user_message(), "denied (/tmp/pkg)");
        assert_eq!(err.user_code(), Some("error.io"));
    }

    #[test]
    fn test_network_errors_retry_only_transient_failures() {
        let timeout: Error = NetworkError::Timeout {
            url: "https://example.com/a.tar.xz".into(),
        }
        .into();
        let unavailable: Error = NetworkError::HttpStatus {
            url: "https://example.com/a.tar.xz".into(),
            status: 503,
        }
        .into();
        let missing: Error = NetworkError::HttpStatus {
            url: "https://example.com/a.tar.xz".into(),
            status: 404,
        }
        .into();

        assert!(timeout.in_phase("source").is_retryable());
        assert!(unavailable.is_retryable());
        assert!(!missing.is_retryable());
        assert_eq!(missing.user_code(), Some("network.http_status"));
        assert!(missing.user_hint().is_some());
        assert_eq!(
            missing.user_message(),
            "network error: https://example.com/a.tar.xz answered HTTP 404"
        );
    }
}
