//! Running the external merge and lookup executables.
//!
//! The executables are black boxes with a positional-argument interface. A run
//! captures both output streams in full and blocks the invocation until the
//! process exits. How it exited decides the outcome:
//!
//! - exit code `0`: success, stdout carries the structured result
//! - positive exit code: an expected domain miss (absent, deleted or corrupt)
//! - killed by a signal: abnormal termination, reported as `-signal`
//!
//! Only failing to start the process at all is an error.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
};

use tokio::process::Command;

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Failed to launch `{program}`: {source}")]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("`{program}` exited without an exit code or signal")]
    UnknownExit { program: PathBuf },
}

/// Why a lookup reported a miss, following the table reader's exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    NotFound,
    Deleted,
    Corrupt,
    Other(i32),
}

impl MissReason {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => MissReason::NotFound,
            2 => MissReason::Deleted,
            3 => MissReason::Corrupt,
            other => MissReason::Other(other),
        }
    }
}

/// The three ways an external run can end once it has started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Success {
        stdout: String,
        stderr: String,
    },
    DomainMiss {
        code: i32,
        stdout: String,
        stderr: String,
    },
    Terminated {
        signal: i32,
        stdout: String,
        stderr: String,
    },
}

impl ProcessOutcome {
    /// Classify a signed return code: zero, positive exit code, or negated signal.
    pub fn from_return_code(code: i32, stdout: String, stderr: String) -> Self {
        match code {
            0 => ProcessOutcome::Success { stdout, stderr },
            c if c > 0 => ProcessOutcome::DomainMiss {
                code: c,
                stdout,
                stderr,
            },
            c => ProcessOutcome::Terminated {
                signal: c.saturating_neg(),
                stdout,
                stderr,
            },
        }
    }

    /// Signed status as reported to callers. Signals are negative.
    pub fn status(&self) -> i32 {
        match self {
            ProcessOutcome::Success { .. } => 0,
            ProcessOutcome::DomainMiss { code, .. } => *code,
            ProcessOutcome::Terminated { signal, .. } => signal.saturating_neg(),
        }
    }

    pub fn stdout(&self) -> &str {
        match self {
            ProcessOutcome::Success { stdout, .. }
            | ProcessOutcome::DomainMiss { stdout, .. }
            | ProcessOutcome::Terminated { stdout, .. } => stdout,
        }
    }

    pub fn stderr(&self) -> &str {
        match self {
            ProcessOutcome::Success { stderr, .. }
            | ProcessOutcome::DomainMiss { stderr, .. }
            | ProcessOutcome::Terminated { stderr, .. } => stderr,
        }
    }

    pub fn miss_reason(&self) -> Option<MissReason> {
        match self {
            ProcessOutcome::DomainMiss { code, .. } => Some(MissReason::from_code(*code)),
            _ => None,
        }
    }
}

/// A fully specified run of an external executable.
#[derive(Debug, Clone)]
pub struct ExternalCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ExternalCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// `argv = [region, bucket, staging_dir]`
    pub fn merger(program: &Path, region: &str, bucket: &str, staging_dir: &Path) -> Self {
        Self::new(program).arg(region).arg(bucket).arg(staging_dir)
    }

    /// `argv = [table_path, user_key]`
    pub fn table_reader(program: &Path, table_path: &Path, user_key: &str) -> Self {
        Self::new(program).arg(table_path).arg(user_key)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    pub async fn run(&self) -> Result<ProcessOutcome, ProcessError> {
        tracing::debug!(program = ?self.program, args = ?self.args, "running external process");

        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| ProcessError::Launch {
                program: self.program.clone(),
                source,
            })?;

        let code = return_code(output.status).ok_or_else(|| ProcessError::UnknownExit {
            program: self.program.clone(),
        })?;
        let outcome = ProcessOutcome::from_return_code(
            code,
            String::from_utf8_lossy(&output.stdout).into_owned(),
            String::from_utf8_lossy(&output.stderr).into_owned(),
        );

        match &outcome {
            ProcessOutcome::Success { .. } => {
                tracing::info!(program = ?self.program, "external process succeeded")
            }
            ProcessOutcome::DomainMiss { code, .. } => tracing::info!(
                program = ?self.program,
                code,
                reason = ?MissReason::from_code(*code),
                "external process reported a miss"
            ),
            ProcessOutcome::Terminated { signal, stderr, .. } => tracing::warn!(
                program = ?self.program,
                signal,
                stderr = %stderr,
                "external process was terminated by a signal"
            ),
        }

        Ok(outcome)
    }
}

#[cfg(unix)]
fn return_code(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|signal| -signal))
}

#[cfg(not(unix))]
fn return_code(status: ExitStatus) -> Option<i32> {
    status.code()
}
