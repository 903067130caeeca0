//! Integration tests for net crate

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use kiln_errors::{AcquisitionError, Error, NetworkError, UserFacingError};
    use kiln_events::{channel, AppEvent, DownloadEvent};
    use kiln_net::*;
    use sha2::{Digest, Sha256};
    use tempfile::tempdir;

    fn sha256_hex(data: &[u8]) -> String {
        hex::encode(Sha256::digest(data))
    }

    #[tokio::test]
    async fn test_download_file() {
        let server = MockServer::start();
        let (tx, mut rx) = channel();

        let content = b"test file content";
        let mock = server.mock(|when, then| {
            when.method(GET).path("/test.tar.gz");
            then.status(200)
                .header("content-length", content.len().to_string())
                .body(content);
        });

        let temp = tempdir().unwrap();
        let dest = temp.path().join("downloads").join("test.tar.gz");
        let client = NetClient::with_defaults().unwrap();
        let url = server.url("/test.tar.gz");

        let result = download_file(&client, &url, &dest, None, Some("demo/1.0"), &tx)
            .await
            .unwrap();

        mock.assert();
        assert_eq!(result.size, content.len() as u64);
        assert_eq!(result.sha256, sha256_hex(content));
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), content);

        let mut saw_start = false;
        let mut saw_complete = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                AppEvent::Download(DownloadEvent::Started { package, .. }) => {
                    assert_eq!(package.as_deref(), Some("demo/1.0"));
                    saw_start = true;
                }
                AppEvent::Download(DownloadEvent::Completed { bytes, .. }) => {
                    assert_eq!(bytes, content.len() as u64);
                    saw_complete = true;
                }
                _ => {}
            }
        }
        assert!(saw_start);
        assert!(saw_complete);
    }

    #[tokio::test]
    async fn test_download_with_sha256_verification() {
        let server = MockServer::start();
        let (tx, _rx) = channel();

        let content = b"verified content";
        server.mock(|when, then| {
            when.method(GET).path("/verified.tar.xz");
            then.status(200).body(content);
        });

        let temp = tempdir().unwrap();
        let client = NetClient::with_defaults().unwrap();
        let url = server.url("/verified.tar.xz");

        let expected = sha256_hex(content).to_uppercase();
        let dest = temp.path().join("ok.tar.xz");
        let result = download_file(&client, &url, &dest, Some(&expected), None, &tx)
            .await
            .unwrap();
        assert_eq!(result.sha256, sha256_hex(content));

        let (tx, mut rx) = channel();
        let wrong = sha256_hex(b"different content");
        let dest2 = temp.path().join("wrong.tar.xz");
        let error = download_file(&client, &url, &dest2, Some(&wrong), None, &tx)
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            Error::Acquisition(AcquisitionError::ChecksumMismatch { .. })
        ));
        assert!(!dest2.exists());
        assert!(!dest2.with_extension("download").exists());
        let mut saw_mismatch = false;
        while let Ok(event) = rx.try_recv() {
            if let AppEvent::Download(DownloadEvent::ChecksumMismatch { actual, .. }) = event {
                assert_eq!(actual, sha256_hex(content));
                saw_mismatch = true;
            }
        }
        assert!(saw_mismatch);
    }

    #[tokio::test]
    async fn test_http_error_handling() {
        let server = MockServer::start();
        let (tx, _rx) = channel();

        server.mock(|when, then| {
            when.method(GET).path("/404");
            then.status(404).body("Not Found");
        });

        let client = NetClient::with_defaults().unwrap();
        let temp = tempdir().unwrap();
        let error = download_file(
            &client,
            &server.url("/404"),
            &temp.path().join("missing.tar.gz"),
            None,
            None,
            &tx,
        )
        .await
        .unwrap_err();

        assert!(matches!(
            error,
            Error::Network(NetworkError::HttpStatus { status: 404, .. })
        ));
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_config_conversion() {
        let mut network = kiln_config::NetworkConfig::default();
        network.timeout = 12;
        let config = NetConfig::from(&network);
        assert_eq!(config.timeout, std::time::Duration::from_secs(12));
        assert!(config.user_agent.starts_with("kiln/"));
    }
}
