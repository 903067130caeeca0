//! Structured logging integration for events
//!
//! Converts kiln events into tracing records with structured fields so
//! `--json` runs and `RUST_LOG` filters see the same data the terminal
//! output is rendered from.

use kiln_events::{AppEvent, BuildEvent, DownloadEvent, GeneralEvent};
use tracing::{debug, error, info, warn};

/// Log an `AppEvent` at its own level with structured fields
pub fn log_event_with_tracing(event: &AppEvent) {
    match event {
        AppEvent::Download(download_event) => log_download(download_event),
        AppEvent::Build(build_event) => log_build(build_event),
        AppEvent::General(general_event) => log_general(general_event),
    }
}

fn log_download(event: &DownloadEvent) {
    match event {
        DownloadEvent::Started {
            url,
            package,
            total_bytes,
        } => {
            info!(
                target: "kiln::events::download",
                url = %url,
                package = ?package,
                total_bytes = ?total_bytes,
                "Download started"
            );
        }
        DownloadEvent::Progress {
            url,
            bytes_downloaded,
            total_bytes,
        } => {
            debug!(
                target: "kiln::events::download",
                url = %url,
                bytes_downloaded = bytes_downloaded,
                total_bytes = ?total_bytes,
                "Download progress"
            );
        }
        DownloadEvent::Completed {
            url,
            package,
            bytes,
            elapsed,
            sha256,
        } => {
            info!(
                target: "kiln::events::download",
                url = %url,
                package = ?package,
                bytes = bytes,
                elapsed_ms = elapsed.as_millis(),
                sha256 = %sha256,
                "Download completed"
            );
        }
        DownloadEvent::Failed {
            url,
            package,
            error,
            next_mirror,
        } => {
            warn!(
                target: "kiln::events::download",
                url = %url,
                package = ?package,
                error = %error,
                next_mirror = ?next_mirror,
                "Download failed"
            );
        }
        DownloadEvent::ChecksumMismatch {
            url,
            package,
            expected,
            actual,
        } => {
            warn!(
                target: "kiln::events::download",
                url = %url,
                package = ?package,
                expected = %expected,
                actual = %actual,
                "Checksum mismatch"
            );
        }
    }
}

fn log_build(event: &BuildEvent) {
    match event {
        BuildEvent::SessionStarted {
            session_id,
            package,
            version,
            build_system,
        } => {
            info!(
                target: "kiln::events::build",
                session_id = %session_id,
                package = %package,
                version = %version,
                build_system = ?build_system,
                "Build session started"
            );
        }
        BuildEvent::PhaseStarted {
            session_id,
            package,
            phase,
        } => {
            info!(
                target: "kiln::events::build",
                session_id = %session_id,
                package = %package,
                phase = %phase,
                "Phase started"
            );
        }
        BuildEvent::PhaseCompleted {
            session_id,
            package,
            phase,
            duration,
        } => {
            info!(
                target: "kiln::events::build",
                session_id = %session_id,
                package = %package,
                phase = %phase,
                duration_ms = duration.as_millis(),
                "Phase completed"
            );
        }
        BuildEvent::CommandStarted {
            session_id,
            package,
            command,
            working_dir,
        } => {
            info!(
                target: "kiln::events::build",
                session_id = %session_id,
                package = %package,
                command = %command,
                working_dir = %working_dir.display(),
                "Command started"
            );
        }
        BuildEvent::CommandCompleted {
            session_id,
            package,
            command,
            exit_code,
            duration,
        } => {
            debug!(
                target: "kiln::events::build",
                session_id = %session_id,
                package = %package,
                command = %command,
                exit_code = ?exit_code,
                duration_ms = duration.as_millis(),
                "Command completed"
            );
        }
        BuildEvent::StepOutput {
            session_id,
            package,
            line,
            is_stderr,
        } => {
            debug!(
                target: "kiln::events::build",
                session_id = %session_id,
                package = %package,
                is_stderr = is_stderr,
                "{line}"
            );
        }
        BuildEvent::SourceChanged {
            session_id,
            package,
            change,
            target,
            description,
        } => {
            info!(
                target: "kiln::events::build",
                session_id = %session_id,
                package = %package,
                change = %change,
                file = %target,
                description = ?description,
                "Source changed"
            );
        }
        BuildEvent::PackageStep {
            session_id,
            package,
            step,
            detail,
        } => {
            info!(
                target: "kiln::events::build",
                session_id = %session_id,
                package = %package,
                step = %step,
                detail = %detail,
                "Package step"
            );
        }
        BuildEvent::SessionCompleted {
            session_id,
            package,
            version,
            package_dir,
            duration,
        } => {
            info!(
                target: "kiln::events::build",
                session_id = %session_id,
                package = %package,
                version = %version,
                package_dir = %package_dir.display(),
                duration_ms = duration.as_millis(),
                "Build session completed"
            );
        }
        BuildEvent::SessionFailed {
            session_id,
            package,
            version,
            phase,
            failure,
        } => {
            error!(
                target: "kiln::events::build",
                session_id = %session_id,
                package = %package,
                version = %version,
                phase = ?phase,
                retryable = failure.retryable,
                code = ?failure.code,
                message = %failure.message,
                hint = ?failure.hint,
                "Build session failed"
            );
        }
    }
}

fn log_general(event: &GeneralEvent) {
    match event {
        GeneralEvent::Warning { message, context } => {
            warn!(target: "kiln::events::general", context = ?context, "{message}");
        }
        GeneralEvent::DebugLog { message } => {
            debug!(target: "kiln::events::general", "{message}");
        }
    }
}
