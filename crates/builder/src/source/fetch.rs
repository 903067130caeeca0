//! Fetching a source from one URL

use kiln_errors::{AcquisitionError, Error};
use kiln_events::{AppEvent, DownloadEvent, EventEmitter, EventSender};
use kiln_net::NetClient;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Where a source URL points
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Location {
    Remote(String),
    Local(PathBuf),
}

impl Location {
    /// Classify a recipe URL; relative paths resolve against `recipe_dir`
    pub(crate) fn parse(url: &str, recipe_dir: &Path) -> Self {
        if url.starts_with("http://") || url.starts_with("https://") {
            return Self::Remote(url.to_string());
        }
        let raw = url.strip_prefix("file://").unwrap_or(url);
        let path = Path::new(raw);
        if path.is_absolute() {
            Self::Local(path.to_path_buf())
        } else {
            Self::Local(recipe_dir.join(path))
        }
    }
}

/// What one URL produced
#[derive(Debug, Clone)]
pub(crate) enum Fetched {
    /// An archive in the downloads folder, with its sha256
    Archive { path: PathBuf, sha256: String },
    /// A local source tree, used as is
    Directory(PathBuf),
}

/// File name an archive is stored under in the downloads folder
pub(crate) fn archive_file_name(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    without_query
        .rsplit(['/', '\\'])
        .find(|segment| !segment.is_empty())
        .map_or_else(|| "source-archive".to_string(), ToString::to_string)
}

/// Fetch `url` into `downloads_dir`
pub(crate) async fn fetch(
    client: &NetClient,
    url: &str,
    package: &str,
    recipe_dir: &Path,
    downloads_dir: &Path,
    expected_sha256: Option<&str>,
    tx: &EventSender,
) -> Result<Fetched, Error> {
    let dest = downloads_dir.join(archive_file_name(url));

    match Location::parse(url, recipe_dir) {
        Location::Remote(url) => {
            let result =
                kiln_net::download_file(client, &url, &dest, expected_sha256, Some(package), tx)
                    .await?;
            Ok(Fetched::Archive {
                path: dest,
                sha256: result.sha256,
            })
        }
        Location::Local(path) if path.is_dir() => Ok(Fetched::Directory(path)),
        Location::Local(path) if path.is_file() => {
            match copy_verified(&path, &dest, expected_sha256).await {
                Ok(sha256) => Ok(Fetched::Archive { path: dest, sha256 }),
                Err(Error::Acquisition(AcquisitionError::ChecksumMismatch {
                    file,
                    expected,
                    actual,
                })) => {
                    tx.emit(AppEvent::Download(DownloadEvent::ChecksumMismatch {
                        url: url.to_string(),
                        package: Some(package.to_string()),
                        expected: expected.clone(),
                        actual: actual.clone(),
                    }));
                    Err(AcquisitionError::ChecksumMismatch {
                        file,
                        expected,
                        actual,
                    }
                    .into())
                }
                Err(err) => Err(err),
            }
        }
        Location::Local(path) => Err(AcquisitionError::DownloadFailed {
            url: url.to_string(),
            message: format!("{} does not exist", path.display()),
        }
        .into()),
    }
}

/// Copy a local archive while hashing it
///
/// On a checksum mismatch the copy is deleted.
pub(crate) async fn copy_verified(
    src: &Path,
    dest: &Path,
    expected_sha256: Option<&str>,
) -> Result<String, Error> {
    let mut input = tokio::fs::File::open(src)
        .await
        .map_err(|e| Error::io_with_path(&e, src))?;
    let mut output = tokio::fs::File::create(dest)
        .await
        .map_err(|e| Error::io_with_path(&e, dest))?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let read = input
            .read(&mut buffer)
            .await
            .map_err(|e| Error::io_with_path(&e, src))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
        output
            .write_all(&buffer[..read])
            .await
            .map_err(|e| Error::io_with_path(&e, dest))?;
    }
    output
        .flush()
        .await
        .map_err(|e| Error::io_with_path(&e, dest))?;
    drop(output);

    let actual = hex::encode(hasher.finalize());
    if let Some(expected) = expected_sha256 {
        if !expected.eq_ignore_ascii_case(&actual) {
            let _ = tokio::fs::remove_file(dest).await;
            return Err(AcquisitionError::ChecksumMismatch {
                file: src.display().to_string(),
                expected: expected.to_string(),
                actual,
            }
            .into());
        }
    }

    Ok(actual)
}
