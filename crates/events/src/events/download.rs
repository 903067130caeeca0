use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Source archive transfers
///
/// `package` is the `name/version` reference the archive belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DownloadEvent {
    /// Server answered; the body is about to stream
    Started {
        url: String,
        package: Option<String>,
        total_bytes: Option<u64>,
    },

    Progress {
        url: String,
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
    },

    /// Archive stored under its final name
    Completed {
        url: String,
        package: Option<String>,
        bytes: u64,
        elapsed: Duration,
        sha256: String,
    },

    /// One URL failed; `next_mirror` is the URL tried next, if any
    Failed {
        url: String,
        package: Option<String>,
        error: String,
        next_mirror: Option<String>,
    },

    /// Archive did not match the recipe's sha256 and was deleted
    ChecksumMismatch {
        url: String,
        package: Option<String>,
        expected: String,
        actual: String,
    },
}
