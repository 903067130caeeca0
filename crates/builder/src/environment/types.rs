//! Types and result structures for build environment

/// Result of executing a build command
#[derive(Debug, Clone)]
pub struct BuildCommandResult {
    /// Whether the command succeeded
    pub success: bool,
    /// Exit code
    pub exit_code: Option<i32>,
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

impl BuildCommandResult {
    /// Stderr if the command wrote any, stdout otherwise
    #[must_use]
    pub fn failure_output(&self) -> &str {
        if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}
