#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for async communication in kiln
//!
//! All output goes through events; library crates never log or print
//! directly. The CLI drains the channel and renders or logs each event.

pub mod events;
pub use events::{
    AppEvent, BuildEvent, BuildPhase, BuildSystem, DownloadEvent, FailureContext, GeneralEvent,
    SourceChange,
};

use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// Type alias for event sender using the `AppEvent` system
pub type EventSender = UnboundedSender<AppEvent>;

/// Type alias for event receiver using the `AppEvent` system
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<AppEvent>;

/// Create a new event channel
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// Generate a fresh build session identifier
#[must_use]
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// The unified trait for emitting events throughout kiln
///
/// Works the same whether you hold a raw `EventSender` or a struct that
/// contains an optional one.
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Emit an event through this emitter
    fn emit(&self, event: AppEvent) {
        if let Some(sender) = self.event_sender() {
            // Ignore send errors - if receiver is dropped, we just continue
            let _ = sender.send(event);
        }
    }

    /// Emit a debug log event
    fn emit_debug(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::debug(message)));
    }

    /// Emit a warning event
    fn emit_warning(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning(message)));
    }

    /// Emit a warning event with context
    fn emit_warning_with_context(&self, message: impl Into<String>, context: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning_with_context(
            message, context,
        )));
    }

    /// Emit a download started event
    fn emit_download_started(
        &self,
        url: impl Into<String>,
        package: Option<String>,
        total_bytes: Option<u64>,
    ) {
        self.emit(AppEvent::Download(DownloadEvent::Started {
            url: url.into(),
            package,
            total_bytes,
        }));
    }

    /// Emit a download completed event
    fn emit_download_completed(
        &self,
        url: impl Into<String>,
        package: Option<String>,
        bytes: u64,
        elapsed: Duration,
        sha256: impl Into<String>,
    ) {
        self.emit(AppEvent::Download(DownloadEvent::Completed {
            url: url.into(),
            package,
            bytes,
            elapsed,
            sha256: sha256.into(),
        }));
    }

    /// Emit a build phase started event
    fn emit_phase_started(
        &self,
        session_id: impl Into<String>,
        package: impl Into<String>,
        phase: BuildPhase,
    ) {
        self.emit(AppEvent::Build(BuildEvent::PhaseStarted {
            session_id: session_id.into(),
            package: package.into(),
            phase,
        }));
    }

    /// Emit a build phase completed event
    fn emit_phase_completed(
        &self,
        session_id: impl Into<String>,
        package: impl Into<String>,
        phase: BuildPhase,
        duration: Duration,
    ) {
        self.emit(AppEvent::Build(BuildEvent::PhaseCompleted {
            session_id: session_id.into(),
            package: package.into(),
            phase,
            duration,
        }));
    }

    /// Emit a source changed event for an applied patch or edit
    fn emit_source_changed(
        &self,
        session_id: impl Into<String>,
        package: impl Into<String>,
        change: SourceChange,
        target: impl Into<String>,
        description: Option<String>,
    ) {
        self.emit(AppEvent::Build(BuildEvent::SourceChanged {
            session_id: session_id.into(),
            package: package.into(),
            change,
            target: target.into(),
            description,
        }));
    }
}

/// Implementation of `EventEmitter` for the raw `EventSender`
impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}
