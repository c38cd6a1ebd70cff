use std::path::PathBuf;

use rig_config::WorkloadPathsError;
use thiserror::Error;

use crate::definition::DefinitionError;
use crate::editor::EditorError;
use crate::identity::{IdentityError, WorkloadKind};
use crate::lock::LockError;
use crate::runtime::RuntimeError;

/// Fatal failures of lifecycle operations.
///
/// State mismatches are not errors; they are reported through
/// [`Outcome::Skipped`](super::Outcome::Skipped).
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The definition could not be found, read, parsed or validated.
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    /// A workload name or the naming configuration is invalid.
    #[error(transparent)]
    InvalidName(#[from] IdentityError),

    /// The runtime could not be reached or did not answer in time.
    #[error(transparent)]
    RuntimeUnavailable(RuntimeError),

    /// The runtime rejected a call.
    #[error(transparent)]
    Runtime(RuntimeError),

    /// The rename target is already occupied.
    #[error("cannot rename {kind} '{from}' to '{to}': {reason}")]
    RenameConflict {
        /// Workload kind.
        kind: WorkloadKind,
        /// Current name.
        from: String,
        /// Requested name.
        to: String,
        /// What occupies the target.
        reason: String,
    },

    /// The target of a new definition is already defined.
    #[error("a {kind} definition named '{name}' already exists at {}", path.display())]
    DefinitionExists {
        /// Workload kind of the target.
        kind: WorkloadKind,
        /// Target name.
        name: String,
        /// File already backing the name.
        path: PathBuf,
    },

    /// The editor failed while editing a definition.
    #[error(transparent)]
    Editor(#[from] EditorError),

    /// Another process is operating on the workload.
    #[error(transparent)]
    WorkloadBusy(LockError),

    /// The lock file could not be managed.
    #[error(transparent)]
    Lock(LockError),

    /// The lock directory could not be prepared.
    #[error(transparent)]
    Paths(#[from] WorkloadPathsError),

    /// The requested inspect path does not exist in the container document.
    #[error("{kind} '{name}' has no inspect field '{field}'")]
    InspectField {
        /// Workload kind.
        kind: WorkloadKind,
        /// Workload name.
        name: String,
        /// Dotted field path that was requested.
        field: String,
    },
}

impl From<RuntimeError> for LifecycleError {
    fn from(error: RuntimeError) -> Self {
        if error.is_unavailable() {
            Self::RuntimeUnavailable(error)
        } else {
            Self::Runtime(error)
        }
    }
}

impl From<LockError> for LifecycleError {
    fn from(error: LockError) -> Self {
        match error {
            LockError::Busy { .. } => Self::WorkloadBusy(error),
            LockError::Io { .. } => Self::Lock(error),
        }
    }
}

impl LifecycleError {
    /// Whether the failure is a missing definition.
    #[must_use]
    pub const fn is_definition_not_found(&self) -> bool {
        matches!(self, Self::Definition(DefinitionError::NotFound { .. }))
    }
}
