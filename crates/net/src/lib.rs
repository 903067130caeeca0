#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Network operations for kiln
//!
//! HTTP downloads of source archives with streaming sha256 verification.

mod client;
mod download;

pub use client::{NetClient, NetConfig};
pub use download::{Download, DownloadResult};

use kiln_errors::Error;
use kiln_events::EventSender;
use std::path::Path;

/// Download a file, verifying its sha256 when one is given
///
/// Events are attributed to `package` when one is given.
///
/// # Errors
///
/// Returns an error if the URL is invalid, the download fails, the checksum
/// does not match, or writing the file fails.
pub async fn download_file(
    client: &NetClient,
    url: &str,
    dest: &Path,
    expected_sha256: Option<&str>,
    package: Option<&str>,
    tx: &EventSender,
) -> Result<DownloadResult, Error> {
    let mut download = Download::new(url)?;
    if let Some(package) = package {
        download = download.for_package(package);
    }
    download.execute(client, dest, expected_sha256, tx).await
}
