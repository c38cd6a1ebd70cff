use std::fmt;

use crate::identity::WorkloadKind;

/// Result of a lifecycle operation that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T = ()> {
    /// The operation ran and produced `T`.
    Done(T),
    /// The workload was already in a state that makes the operation a no-op.
    Skipped(Notice),
}

impl<T> Outcome<T> {
    /// Whether the operation was skipped.
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }

    /// The notice explaining a skip, if any.
    #[must_use]
    pub const fn notice(&self) -> Option<&Notice> {
        match self {
            Self::Skipped(notice) => Some(notice),
            Self::Done(_) => None,
        }
    }
}

/// Informational, non-fatal state mismatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// `start` found the workload running.
    AlreadyRunning {
        /// Workload kind.
        kind: WorkloadKind,
        /// Workload name.
        name: String,
    },
    /// `stop` found the workload stopped.
    NotRunning {
        /// Workload kind.
        kind: WorkloadKind,
        /// Workload name.
        name: String,
    },
    /// The operation needs a container and there is none.
    NotExisting {
        /// Workload kind.
        kind: WorkloadKind,
        /// Workload name.
        name: String,
    },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRunning { kind, name } => write!(f, "{kind} '{name}' is already running"),
            Self::NotRunning { kind, name } => write!(f, "{kind} '{name}' is not running"),
            Self::NotExisting { kind, name } => write!(
                f,
                "{kind} '{name}' does not exist; start it first with `rig {} start {name}`",
                kind.plural()
            ),
        }
    }
}
