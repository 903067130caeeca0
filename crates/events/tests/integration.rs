//! Integration tests for events

#[cfg(test)]
mod tests {
    use kiln_errors::{ConfigurationError, Error};
    use kiln_events::*;

    #[tokio::test]
    async fn test_event_emitter_helpers() {
        let (tx, mut rx) = channel();

        tx.emit_warning_with_context("no sha256", "https://example.com/demo.tar.xz");
        tx.emit_debug("test debug");
        tx.emit_phase_started("s1", "libxmlpp", BuildPhase::Source);

        match rx.recv().await.unwrap() {
            AppEvent::General(GeneralEvent::Warning { message, context }) => {
                assert_eq!(message, "no sha256");
                assert_eq!(context.as_deref(), Some("https://example.com/demo.tar.xz"));
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let event2 = rx.recv().await.unwrap();
        assert!(matches!(
            event2,
            AppEvent::General(GeneralEvent::DebugLog { .. })
        ));

        let event3 = rx.recv().await.unwrap();
        assert!(matches!(
            event3,
            AppEvent::Build(BuildEvent::PhaseStarted {
                phase: BuildPhase::Source,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_source_changed_event() {
        let (tx, mut rx) = channel();

        tx.emit_source_changed(
            "s1",
            "libxmlpp/5.4.0",
            SourceChange::Edit,
            "meson.build",
            Some("drop tests subdir".into()),
        );

        let event = rx.recv().await.unwrap();
        assert_eq!(event.log_level(), tracing::Level::INFO);
        let json: serde_json::Value = serde_json::from_str(&event.log_fields()).unwrap();
        assert_eq!(json["event"]["type"], "SourceChanged");
        assert_eq!(json["event"]["change"], "edit");
        assert_eq!(json["event"]["target"], "meson.build");
    }

    #[tokio::test]
    async fn test_dropped_receiver() {
        let (tx, rx) = channel();
        drop(rx);

        // Should not panic when receiver is dropped
        tx.emit_warning("ignored");
    }

    #[test]
    fn test_failure_context_from_error() {
        let err = Error::from(ConfigurationError::CrossBuildingUnsupported {
            package: "libxmlpp".into(),
        })
        .in_phase("validate");
        let failure = FailureContext::from_error(&err);

        assert_eq!(
            failure.code.as_deref(),
            Some("configuration.cross_building")
        );
        assert!(failure.message.starts_with("validate phase failed"));
        assert!(!failure.retryable);
    }

    #[test]
    fn test_event_serialization_and_levels() {
        let event = AppEvent::Build(BuildEvent::PhaseStarted {
            session_id: "s1".into(),
            package: "testcpp".into(),
            phase: BuildPhase::Configure,
        });
        let json: serde_json::Value = serde_json::from_str(&event.log_fields()).unwrap();
        assert_eq!(json["domain"], "build");
        assert_eq!(json["event"]["type"], "PhaseStarted");
        assert_eq!(json["event"]["phase"], "configure");
        assert_eq!(event.log_level(), tracing::Level::INFO);
        assert_eq!(event.log_target(), "kiln::events::build");

        let warning = AppEvent::General(GeneralEvent::warning("careful"));
        assert_eq!(warning.log_level(), tracing::Level::WARN);

        let mismatch = AppEvent::Download(DownloadEvent::ChecksumMismatch {
            url: "https://example.com/a.tar.xz".into(),
            package: None,
            expected: "00".into(),
            actual: "ff".into(),
        });
        assert_eq!(mismatch.log_level(), tracing::Level::WARN);
        assert_eq!(mismatch.log_target(), "kiln::events::download");
    }
}
