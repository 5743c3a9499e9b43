//! Subprocess execution for the external training framework.
//!
//! Every pipeline step is a single blocking command (git, pip, or one of the
//! framework's Python entry points) run to completion before the next starts.

use crate::error::BenchError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// A fully resolved command for one pipeline step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCommand {
    /// Human-readable step label used in logs and errors.
    pub step: String,
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl StepCommand {
    pub fn new(step: impl Into<String>, program: impl Into<String>, cwd: PathBuf) -> Self {
        Self {
            step: step.into(),
            program: program.into(),
            args: Vec::new(),
            cwd,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Shell-like rendering, for logs only.
    pub fn display(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(quote(&self.program));
        parts.extend(self.args.iter().map(|a| quote(a)));
        parts.join(" ")
    }
}

fn quote(s: &str) -> String {
    if s.is_empty() || s.contains(char::is_whitespace) {
        format!("'{s}'")
    } else {
        s.to_string()
    }
}

/// Runs pipeline steps.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    /// Run `cmd` to completion. A non-zero exit is an error.
    async fn execute(&self, cmd: &StepCommand) -> Result<(), BenchError>;
}

/// Executes steps as real child processes with inherited stdio.
pub struct ProcessExecutor {
    timeout: Option<Duration>,
}

impl ProcessExecutor {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl StepExecutor for ProcessExecutor {
    async fn execute(&self, cmd: &StepCommand) -> Result<(), BenchError> {
        info!(step = %cmd.step, cwd = %cmd.cwd.display(), "Running step");
        debug!(command = %cmd.display(), "Spawning");

        let mut child = Command::new(&cmd.program)
            .args(&cmd.args)
            .current_dir(&cmd.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| BenchError::Spawn {
                program: cmd.program.clone(),
                source,
            })?;

        let status = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    child.kill().await.ok();
                    return Err(BenchError::Timeout(format!(
                        "step '{}' exceeded {}s",
                        cmd.step,
                        limit.as_secs()
                    )));
                }
            },
            None => child.wait().await?,
        };

        if !status.success() {
            return Err(BenchError::StepFailed {
                step: cmd.step.clone(),
                command: cmd.display(),
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

/// Information about the detected Python installation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PythonInfo {
    pub path: PathBuf,
    pub version: String,
}

/// Probe for a usable Python interpreter, preferring `preferred` when given.
pub async fn detect_python(preferred: Option<&str>) -> Result<PythonInfo, BenchError> {
    let mut candidates: Vec<&str> = Vec::new();
    if let Some(p) = preferred {
        candidates.push(p);
    }
    candidates.extend(["python3", "python"]);

    for cmd in candidates {
        let Ok(output) = Command::new(cmd).arg("--version").output().await else {
            continue;
        };
        if !output.status.success() {
            continue;
        }
        // Python 2 printed its version on stderr.
        let mut version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if version.is_empty() {
            version = String::from_utf8_lossy(&output.stderr).trim().to_string();
        }
        return Ok(PythonInfo {
            path: PathBuf::from(cmd),
            version,
        });
    }

    Err(BenchError::framework(
        "Python not found. Install Python 3.8+ to run the training framework.",
    ))
}
