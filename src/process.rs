//! External command invocation.
//!
//! Every tool call (version probes, container launches) goes through the
//! [`CommandRunner`] seam so phases can be exercised without a container
//! runtime. `SystemRunner` is the real implementation.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::errors::ProcessError;

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Best available diagnostic text: stderr, then stdout, then the exit code.
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        match self.code {
            Some(code) => format!("exited with code {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Runs one external command to completion, bounded by a timeout.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        limit: Duration,
    ) -> Result<CommandOutput, ProcessError>;
}

/// Spawns real processes with `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        limit: Duration,
    ) -> Result<CommandOutput, ProcessError> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessError::SpawnFailed {
                program: program.to_string(),
                source,
            })?;

        // Dropping the future on timeout kills the child.
        let output = match timeout(limit, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| ProcessError::WaitFailed {
                program: program.to_string(),
                source,
            })?,
            Err(_) => {
                return Err(ProcessError::TimedOut {
                    program: program.to_string(),
                    timeout_secs: limit.as_secs(),
                });
            }
        };

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_prefers_stderr() {
        let out = CommandOutput {
            code: Some(125),
            stdout: "ignored".to_string(),
            stderr: "  permission denied\n".to_string(),
        };
        assert_eq!(out.diagnostic(), "permission denied");
    }

    #[test]
    fn diagnostic_falls_back_to_exit_code() {
        let out = CommandOutput {
            code: Some(3),
            ..Default::default()
        };
        assert_eq!(out.diagnostic(), "exited with code 3");
        assert!(!out.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn system_runner_captures_output() {
        let out = SystemRunner
            .run(
                "sh",
                &["-c".to_string(), "echo hello; echo oops >&2; exit 4".to_string()],
                Duration::from_secs(10),
            )
            .await
            .unwrap();
        assert_eq!(out.code, Some(4));
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn system_runner_reports_missing_program() {
        let err = SystemRunner
            .run("apex-definitely-not-installed", &[], Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::SpawnFailed { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn system_runner_enforces_timeout() {
        let err = SystemRunner
            .run(
                "sh",
                &["-c".to_string(), "sleep 5".to_string()],
                Duration::from_millis(200),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::TimedOut { .. }));
    }
}
