//! Failures reported by container runtime clients.
//!
//! Every variant is classified as transient or fatal through
//! [`RuntimeError::is_transient`]; only transient failures of read-only
//! queries are retried.

use std::sync::Arc;

use thiserror::Error;

/// Errors raised by a [`ContainerRuntime`](super::ContainerRuntime).
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    /// The runtime cannot be reached at all.
    #[error("container runtime unavailable: {message}")]
    Unavailable {
        /// Human-readable cause.
        message: String,
        /// Whether retrying later may succeed.
        transient: bool,
    },

    /// The runtime reports that the named container does not exist.
    #[error("no such container '{name}'")]
    NoSuchContainer {
        /// Container name that was addressed.
        name: String,
    },

    /// A control call exceeded its deadline and was killed.
    #[error("runtime call '{operation}' timed out after {timeout_secs}s")]
    Timeout {
        /// Runtime operation that was running.
        operation: String,
        /// Configured timeout in seconds.
        timeout_secs: u64,
    },

    /// The runtime client exited unsuccessfully.
    #[error("runtime call '{operation}' failed with status {status}: {stderr}")]
    CommandFailed {
        /// Runtime operation that failed.
        operation: String,
        /// Client exit status, `-1` when killed by a signal.
        status: i32,
        /// Trimmed standard error output.
        stderr: String,
    },

    /// The runtime client produced output that could not be understood.
    #[error("runtime call '{operation}' produced unexpected output: {message}")]
    InvalidOutput {
        /// Runtime operation whose output was rejected.
        operation: String,
        /// Description of the problem.
        message: String,
    },

    /// Spawning or talking to the runtime client failed.
    #[error("I/O error running '{program}': {source}")]
    Io {
        /// Client executable.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl RuntimeError {
    /// Reports whether the failure may clear up on retry.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable { transient, .. } => *transient,
            Self::Timeout { .. } => true,
            Self::NoSuchContainer { .. }
            | Self::CommandFailed { .. }
            | Self::InvalidOutput { .. }
            | Self::Io { .. } => false,
        }
    }

    /// Reports whether the runtime itself could not be reached.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }
}
