//! File download with progress reporting and sha256 verification

use futures::StreamExt;
use kiln_errors::{AcquisitionError, Error, NetworkError};
use kiln_events::{AppEvent, DownloadEvent, EventEmitter, EventSender};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::Instant;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::NetClient;

/// Download operation handle
pub struct Download {
    url: Url,
    package: Option<String>,
}

/// Result of a download operation
#[derive(Debug, Clone)]
pub struct DownloadResult {
    pub url: String,
    pub size: u64,
    /// Lowercase hex sha256 of the downloaded bytes
    pub sha256: String,
}

impl Download {
    /// Create a new download
    ///
    /// # Errors
    ///
    /// Returns an error if the provided URL is invalid or cannot be parsed.
    pub fn new(url: &str) -> Result<Self, Error> {
        let url = Url::parse(url).map_err(|e| NetworkError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { url, package: None })
    }

    /// Attribute download events to a package
    #[must_use]
    pub fn for_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    /// Execute the download
    ///
    /// The body is hashed while streaming to `dest.download`; the file is
    /// renamed to `dest` only after verification succeeds. On a mismatch
    /// the partial file is deleted.
    ///
    /// # Errors
    ///
    /// Returns `NetworkError` for transport failures and error statuses,
    /// `AcquisitionError::ChecksumMismatch` when `expected_sha256` does not
    /// match, or an I/O error when writing fails.
    pub async fn execute(
        self,
        client: &NetClient,
        dest: &Path,
        expected_sha256: Option<&str>,
        tx: &EventSender,
    ) -> Result<DownloadResult, Error> {
        let url_str = self.url.to_string();
        let started = Instant::now();

        let response = client.get(url_str.as_str()).await?;

        if !response.status().is_success() {
            return Err(NetworkError::HttpStatus {
                url: url_str,
                status: response.status().as_u16(),
            }
            .into());
        }

        let content_length = response.content_length();
        tx.emit_download_started(url_str.clone(), self.package.clone(), content_length);

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp_path = dest.with_extension("download");
        let mut file = File::create(&temp_path).await?;

        let mut stream = response.bytes_stream();
        let mut downloaded = 0u64;
        let mut hasher = Sha256::new();

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    drop(file);
                    let _ = tokio::fs::remove_file(&temp_path).await;
                    return Err(NetworkError::Transfer {
                        url: url_str,
                        message: e.to_string(),
                    }
                    .into());
                }
            };

            hasher.update(&chunk);
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            tx.emit(AppEvent::Download(DownloadEvent::Progress {
                url: url_str.clone(),
                bytes_downloaded: downloaded,
                total_bytes: content_length,
            }));
        }

        file.flush().await?;
        drop(file);

        let actual = hex::encode(hasher.finalize());

        if let Some(expected) = expected_sha256 {
            if !actual.eq_ignore_ascii_case(expected.trim()) {
                let _ = tokio::fs::remove_file(&temp_path).await;

                tx.emit(AppEvent::Download(DownloadEvent::ChecksumMismatch {
                    url: url_str.clone(),
                    package: self.package.clone(),
                    expected: expected.to_string(),
                    actual: actual.clone(),
                }));

                return Err(AcquisitionError::ChecksumMismatch {
                    file: dest.display().to_string(),
                    expected: expected.to_string(),
                    actual,
                }
                .into());
            }
        }

        tokio::fs::rename(&temp_path, dest).await?;

        tx.emit_download_completed(
            url_str.clone(),
            self.package,
            downloaded,
            started.elapsed(),
            actual.clone(),
        );

        Ok(DownloadResult {
            url: url_str,
            size: downloaded,
            sha256: actual,
        })
    }
}
