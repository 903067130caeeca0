//! Event handling and progress display

use crate::logging::log_event_with_tracing;
use console::style;
use kiln_events::{AppEvent, BuildEvent, DownloadEvent, GeneralEvent, SourceChange};

/// Event handler for progress display and user feedback
pub struct EventHandler {
    colors_enabled: bool,
    debug_enabled: bool,
    /// Status lines go to stderr unless JSON output owns the terminal
    quiet: bool,
}

impl EventHandler {
    pub fn new(colors_enabled: bool, debug_enabled: bool, quiet: bool) -> Self {
        Self {
            colors_enabled,
            debug_enabled,
            quiet,
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, event: AppEvent) {
        log_event_with_tracing(&event);
        if self.quiet {
            return;
        }

        match event {
            AppEvent::Build(build_event) => self.handle_build_event(build_event),
            AppEvent::Download(download_event) => self.handle_download_event(download_event),
            AppEvent::General(general_event) => self.handle_general_event(general_event),
        }
    }

    fn handle_build_event(&self, event: BuildEvent) {
        match event {
            BuildEvent::SessionStarted {
                package,
                version,
                build_system,
                ..
            } => {
                self.show_status(&format!(
                    "Building {package}/{version} with {build_system:?}"
                ));
            }
            BuildEvent::PhaseStarted { phase, .. } => {
                self.show_status(&format!("{} {phase}", self.accent("==>")));
            }
            BuildEvent::PhaseCompleted {
                phase, duration, ..
            } => {
                if self.debug_enabled {
                    self.show_status(&format!(
                        "    {phase} done in {:.2}s",
                        duration.as_secs_f64()
                    ));
                }
            }
            BuildEvent::CommandStarted { command, .. } => {
                self.show_status(&format!("    $ {command}"));
            }
            BuildEvent::StepOutput {
                line, is_stderr, ..
            } => {
                if self.debug_enabled {
                    if is_stderr {
                        eprintln!("      {}", self.dim(&line));
                    } else {
                        eprintln!("      {line}");
                    }
                }
            }
            BuildEvent::SourceChanged {
                change,
                target,
                description,
                ..
            } => {
                let verb = match change {
                    SourceChange::Patch => "patched",
                    SourceChange::Edit => "edited",
                };
                match description {
                    Some(description) => {
                        self.show_status(&format!("    {verb} {target}: {description}"));
                    }
                    None => self.show_status(&format!("    {verb} {target}")),
                }
            }
            BuildEvent::PackageStep { step, detail, .. } => {
                self.show_status(&format!("    {step}: {detail}"));
            }
            BuildEvent::SessionCompleted {
                package,
                version,
                package_dir,
                duration,
                ..
            } => {
                self.show_success(&format!(
                    "Built {package}/{version} in {:.1}s -> {}",
                    duration.as_secs_f64(),
                    package_dir.display()
                ));
            }
            BuildEvent::SessionFailed {
                package,
                version,
                phase,
                failure,
                ..
            } => {
                let phase = phase.map_or_else(String::new, |phase| format!(" during {phase}"));
                self.show_error(&format!(
                    "Build of {package}/{version} failed{phase}: {}",
                    failure.message
                ));
            }
            BuildEvent::CommandCompleted { .. } => {}
        }
    }

    fn handle_download_event(&self, event: DownloadEvent) {
        match event {
            DownloadEvent::Started { url, .. } => {
                self.show_status(&format!("    fetching {url}"));
            }
            DownloadEvent::Completed { bytes, sha256, .. } => {
                let short = sha256.get(..12).unwrap_or(sha256.as_str());
                self.show_status(&format!("    fetched {bytes} bytes (sha256 {short})"));
            }
            DownloadEvent::Failed {
                url,
                error,
                next_mirror,
                ..
            } => {
                let next = next_mirror.map_or_else(String::new, |m| format!(", trying {m}"));
                self.show_warning(&format!("{url}: {error}{next}"));
            }
            DownloadEvent::ChecksumMismatch {
                url,
                expected,
                actual,
                ..
            } => {
                self.show_warning(&format!(
                    "{url}: checksum mismatch (expected {expected}, got {actual})"
                ));
            }
            DownloadEvent::Progress { .. } => {}
        }
    }

    fn handle_general_event(&self, event: GeneralEvent) {
        match event {
            GeneralEvent::Warning { message, context } => match context {
                Some(context) => self.show_warning(&format!("{message} ({context})")),
                None => self.show_warning(&message),
            },
            GeneralEvent::DebugLog { message } => {
                if self.debug_enabled {
                    eprintln!("{}", self.dim(&format!("debug: {message}")));
                }
            }
        }
    }

    fn show_status(&self, message: &str) {
        eprintln!("{message}");
    }

    fn show_success(&self, message: &str) {
        if self.colors_enabled {
            eprintln!("{}", style(message).green().bold());
        } else {
            eprintln!("{message}");
        }
    }

    fn show_warning(&self, message: &str) {
        if self.colors_enabled {
            eprintln!("{} {message}", style("warning:").yellow().bold());
        } else {
            eprintln!("warning: {message}");
        }
    }

    fn show_error(&self, message: &str) {
        if self.colors_enabled {
            eprintln!("{} {message}", style("error:").red().bold());
        } else {
            eprintln!("error: {message}");
        }
    }

    fn accent(&self, text: &str) -> String {
        if self.colors_enabled {
            style(text).cyan().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.colors_enabled {
            style(text).dim().to_string()
        } else {
            text.to_string()
        }
    }
}
