//! Child-process execution for runtime clients.
//!
//! [`ProcessRunner`] implements [`CommandRunner`] with `std::process`.
//! Captured calls drain stdout and stderr on helper threads and poll the
//! child until it exits or the deadline passes, at which point it is killed.
//! Attached calls inherit the caller's terminal and carry no deadline.

use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::RuntimeError;

const PROCESS_TARGET: &str = "rig_core::runtime::process";
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// A single runtime client invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    operation: &'static str,
    args: Vec<String>,
}

impl Invocation {
    /// Starts an invocation of `program` for the named runtime operation.
    #[must_use]
    pub fn new(program: impl Into<String>, operation: &'static str) -> Self {
        Self {
            program: program.into(),
            operation,
            args: Vec::new(),
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Appends `flag` when `enabled` is set.
    #[must_use]
    pub fn flag(self, flag: &str, enabled: bool) -> Self {
        if enabled { self.arg(flag) } else { self }
    }

    /// Executable to run.
    #[must_use]
    pub fn program(&self) -> &str {
        self.program.as_str()
    }

    /// Runtime operation name used in diagnostics.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        self.operation
    }

    /// Arguments passed to the executable.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.args
    }
}

/// Captured result of a finished invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status, or `None` when the process was killed by a signal.
    pub status: Option<i32>,
    /// Standard output as UTF-8 (lossy).
    pub stdout: String,
    /// Standard error as UTF-8 (lossy).
    pub stderr: String,
}

impl CommandOutput {
    /// Builds a successful output carrying `stdout`.
    #[must_use]
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Builds a failed output carrying `stderr`.
    #[must_use]
    pub fn failure(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Whether the process exited with status zero.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Abstraction over process execution so clients can be tested without a
/// runtime installed.
pub trait CommandRunner {
    /// Runs the invocation to completion, capturing its output.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Timeout`] when `timeout` elapses and an
    /// unavailability or I/O error when the process cannot be spawned.
    fn run(&self, invocation: &Invocation, timeout: Duration)
    -> Result<CommandOutput, RuntimeError>;

    /// Runs the invocation attached to the caller's terminal.
    ///
    /// # Errors
    ///
    /// Returns an unavailability or I/O error when the process cannot be
    /// spawned or waited on.
    fn attach(&self, invocation: &Invocation) -> Result<i32, RuntimeError>;
}

/// [`CommandRunner`] backed by `std::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(
        &self,
        invocation: &Invocation,
        timeout: Duration,
    ) -> Result<CommandOutput, RuntimeError> {
        debug!(
            target: PROCESS_TARGET,
            program = invocation.program(),
            operation = invocation.operation(),
            args = ?invocation.arguments(),
            "running runtime client"
        );
        let mut child = Command::new(invocation.program())
            .args(invocation.arguments())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|error| spawn_error(invocation, error))?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        let status = wait_with_deadline(invocation, &mut child, timeout);
        let stdout = collect(stdout);
        let stderr = collect(stderr);
        let status = status?;

        Ok(CommandOutput {
            status: status.code(),
            stdout,
            stderr,
        })
    }

    fn attach(&self, invocation: &Invocation) -> Result<i32, RuntimeError> {
        debug!(
            target: PROCESS_TARGET,
            program = invocation.program(),
            operation = invocation.operation(),
            args = ?invocation.arguments(),
            "attaching runtime client"
        );
        let status = Command::new(invocation.program())
            .args(invocation.arguments())
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|error| spawn_error(invocation, error))?;
        Ok(status.code().unwrap_or(-1))
    }
}

fn spawn_error(invocation: &Invocation, error: io::Error) -> RuntimeError {
    if error.kind() == io::ErrorKind::NotFound {
        return RuntimeError::Unavailable {
            message: format!("runtime client '{}' was not found", invocation.program()),
            transient: false,
        };
    }
    RuntimeError::Io {
        program: invocation.program().to_owned(),
        source: Arc::new(error),
    }
}

fn drain<R>(pipe: Option<R>) -> Option<JoinHandle<String>>
where
    R: Read + Send + 'static,
{
    pipe.map(|mut reader| {
        thread::spawn(move || {
            let mut bytes = Vec::new();
            if let Err(error) = reader.read_to_end(&mut bytes) {
                debug!(target: PROCESS_TARGET, %error, "failed to drain child pipe");
            }
            String::from_utf8_lossy(&bytes).into_owned()
        })
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

fn wait_with_deadline(
    invocation: &Invocation,
    child: &mut Child,
    timeout: Duration,
) -> Result<ExitStatus, RuntimeError> {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                debug!(
                    target: PROCESS_TARGET,
                    operation = invocation.operation(),
                    ?status,
                    elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "runtime client exited"
                );
                return Ok(status);
            }
            Ok(None) if start.elapsed() > timeout => {
                warn!(
                    target: PROCESS_TARGET,
                    operation = invocation.operation(),
                    timeout_secs = timeout.as_secs(),
                    "runtime client timed out, killing process"
                );
                drop(child.kill());
                drop(child.wait());
                return Err(RuntimeError::Timeout {
                    operation: invocation.operation().to_owned(),
                    timeout_secs: timeout.as_secs(),
                });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(error) => {
                return Err(RuntimeError::Io {
                    program: invocation.program().to_owned(),
                    source: Arc::new(error),
                });
            }
        }
    }
}
