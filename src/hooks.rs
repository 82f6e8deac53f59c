//! Lifecycle command execution for post-generate hooks and checks
//!
//! Subprocess execution sits behind the [`CommandRunner`] capability so the
//! orchestrator can be tested with a fake executor. Commands run through the
//! platform shell, sequentially, each blocking until exit; the first
//! non-zero exit aborts the remainder of its list with the captured output
//! in the error payload.

use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::error::{PacksmithError, Result};

/// Captured result of one command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Subprocess execution capability
pub trait CommandRunner {
    fn run(&self, command: &str, cwd: &Path) -> Result<CommandOutput>;
}

/// Runs commands through the platform shell, with an optional timeout
#[derive(Debug, Default)]
pub struct SystemRunner {
    pub timeout: Option<Duration>,
}

impl SystemRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    fn shell_command(command: &str) -> Command {
        #[cfg(windows)]
        {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(command);
            cmd
        }
        #[cfg(not(windows))]
        {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(command);
            cmd
        }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, command: &str, cwd: &Path) -> Result<CommandOutput> {
        let mut cmd = Self::shell_command(command);
        cmd.current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let Some(timeout) = self.timeout else {
            let output = cmd.output().map_err(|e| PacksmithError::IoError {
                message: format!("Failed to spawn '{command}': {e}"),
            })?;
            return Ok(CommandOutput {
                exit_code: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        };

        let mut child = cmd.spawn().map_err(|e| PacksmithError::IoError {
            message: format!("Failed to spawn '{command}': {e}"),
        })?;

        let started = Instant::now();
        loop {
            match child.try_wait()? {
                Some(_) => break,
                None if started.elapsed() >= timeout => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(PacksmithError::HookTimedOut {
                        command: command.to_string(),
                        secs: timeout.as_secs(),
                    });
                }
                None => std::thread::sleep(Duration::from_millis(25)),
            }
        }

        let output = child.wait_with_output().map_err(|e| PacksmithError::IoError {
            message: format!("Failed to collect output of '{command}': {e}"),
        })?;

        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Which lifecycle list a command belongs to, for error mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    PostGenerate,
    Check,
}

/// Run a command list sequentially in declared order.
///
/// The first non-zero exit aborts the remaining commands and the whole
/// generation, surfacing the captured output. Returns one summary line per
/// completed command.
pub fn run_sequence(
    runner: &dyn CommandRunner,
    commands: &[String],
    cwd: &Path,
    kind: HookKind,
) -> Result<Vec<String>> {
    let mut summaries = Vec::with_capacity(commands.len());

    for command in commands {
        let output = runner.run(command, cwd)?;
        if !output.success() {
            return Err(match kind {
                HookKind::PostGenerate => PacksmithError::HookExecutionFailed {
                    command: command.clone(),
                    exit_code: output.exit_code,
                    stdout: output.stdout,
                    stderr: output.stderr,
                },
                HookKind::Check => PacksmithError::CheckFailed {
                    command: command.clone(),
                    exit_code: output.exit_code,
                    stdout: output.stdout,
                    stderr: output.stderr,
                },
            });
        }
        summaries.push(format!("{command} (exit 0)"));
    }

    Ok(summaries)
}
