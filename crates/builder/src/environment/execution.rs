//! Command execution in the build environment

use super::{core::BuildEnvironment, types::BuildCommandResult};
use kiln_errors::{BuildError, Error};
use kiln_events::{AppEvent, BuildEvent, EventEmitter};
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;

impl BuildEnvironment {
    /// Execute a command in the build environment
    ///
    /// Output is captured and forwarded line by line as `StepOutput`
    /// events. A non-zero exit is reported through `success`; callers map
    /// it to the error of their phase.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::ToolNotFound` if the program cannot be located
    /// and `BuildError::CommandFailed` if it cannot be spawned.
    pub async fn execute_command(
        &self,
        program: &str,
        args: &[&str],
        working_dir: Option<&Path>,
    ) -> Result<BuildCommandResult, Error> {
        let binary = self.resolve_tool(program)?;
        let command_line = format!("{program} {}", args.join(" "));

        let mut cmd = tokio::process::Command::new(&binary);
        cmd.args(args)
            .envs(&self.env_vars)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let cwd = working_dir.map_or_else(
            || std::env::current_dir().unwrap_or_default(),
            Path::to_path_buf,
        );
        cmd.current_dir(&cwd);

        self.emit(AppEvent::Build(BuildEvent::CommandStarted {
            session_id: self.session_id.clone(),
            package: self.package.clone(),
            command: command_line.clone(),
            working_dir: cwd.clone(),
        }));

        let started = Instant::now();
        let output = cmd.output().await.map_err(|e| BuildError::CommandFailed {
            command: command_line.clone(),
            message: e.to_string(),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        for (line, is_stderr) in stdout
            .lines()
            .map(|line| (line, false))
            .chain(stderr.lines().map(|line| (line, true)))
        {
            self.emit(AppEvent::Build(BuildEvent::StepOutput {
                session_id: self.session_id.clone(),
                package: self.package.clone(),
                line: line.to_string(),
                is_stderr,
            }));
        }

        let result = BuildCommandResult {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: stdout.trim_end().to_string(),
            stderr: stderr.trim_end().to_string(),
        };

        self.emit(AppEvent::Build(BuildEvent::CommandCompleted {
            session_id: self.session_id.clone(),
            package: self.package.clone(),
            command: command_line,
            exit_code: result.exit_code,
            duration: started.elapsed(),
        }));

        Ok(result)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_execute_captures_output() {
        let (tx, mut rx) = kiln_events::channel();
        let env = BuildEnvironment::new("session", "demo/1.0")
            .with_event_sender(Some(tx))
            .with_env_var("KILN_TEST_VALUE", "hello");

        let result = env
            .execute_command("sh", &["-c", "echo $KILN_TEST_VALUE; echo oops >&2; exit 3"], None)
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.exit_code, Some(3));
        assert_eq!(result.stdout, "hello");
        assert_eq!(result.stderr, "oops");
        assert_eq!(result.failure_output(), "oops");

        let mut saw_started = false;
        let mut saw_completed = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                AppEvent::Build(BuildEvent::CommandStarted { .. }) => saw_started = true,
                AppEvent::Build(BuildEvent::CommandCompleted { exit_code, .. }) => {
                    saw_completed = exit_code == Some(3);
                }
                _ => {}
            }
        }
        assert!(saw_started && saw_completed);
    }
}
