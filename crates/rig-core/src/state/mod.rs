//! Derives workload state from the containers the runtime reports.
//!
//! Nothing is cached: every query lists containers afresh and filters them
//! through the naming convention. Names that do not parse, that carry a
//! different prefix, or that belong to a different instance number are
//! ignored, so a workload's state always describes the container its
//! lifecycle operations act on.

use std::collections::BTreeSet;
use std::fmt;

use tracing::trace;

use crate::definition::WorkloadDefinition;
use crate::identity::{ContainerIdentity, ContainerKind, Naming, WorkloadName};
use crate::runtime::{ContainerInfo, ContainerRuntime, RetryPolicy, RuntimeError};

const STATE_TARGET: &str = "rig_core::state";

/// Derived lifecycle state of a workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WorkloadState {
    /// Neither a definition nor a container exists.
    Unknown,
    /// A definition exists but no container has been created.
    Defined,
    /// A container exists but is not executing.
    Existing,
    /// The container is executing.
    Running,
}

impl WorkloadState {
    /// Whether a container exists, running or not.
    #[must_use]
    pub const fn has_container(self) -> bool {
        matches!(self, Self::Existing | Self::Running)
    }
}

impl fmt::Display for WorkloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unknown => "unknown",
            Self::Defined => "defined",
            Self::Existing => "existing",
            Self::Running => "running",
        })
    }
}

/// Answers existence and running queries against a runtime.
#[derive(Debug)]
pub struct StateResolver<'a, R: ?Sized> {
    runtime: &'a R,
    naming: &'a Naming,
    retry: RetryPolicy,
}

impl<'a, R: ContainerRuntime + ?Sized> StateResolver<'a, R> {
    /// Creates a resolver over `runtime` using `naming` to parse names.
    #[must_use]
    pub const fn new(runtime: &'a R, naming: &'a Naming, retry: RetryPolicy) -> Self {
        Self {
            runtime,
            naming,
            retry,
        }
    }

    fn containers(&self, include_stopped: bool) -> Result<Vec<ContainerInfo>, RuntimeError> {
        self.retry
            .run("ps", || self.runtime.list_containers(include_stopped))
    }

    fn managed(&self, include_stopped: bool) -> Result<Vec<(ContainerIdentity, bool)>, RuntimeError> {
        let managed = self
            .containers(include_stopped)?
            .into_iter()
            .filter_map(|info| match self.naming.parse(&info.name) {
                Ok(identity) if identity.instance() == self.naming.instance() => {
                    Some((identity, info.running))
                }
                Ok(identity) => {
                    trace!(
                        target: STATE_TARGET,
                        container = %info.name,
                        instance = identity.instance().get(),
                        "ignoring container of another instance"
                    );
                    None
                }
                Err(reason) => {
                    trace!(
                        target: STATE_TARGET,
                        container = %info.name,
                        %reason,
                        "ignoring unmanaged container"
                    );
                    None
                }
            })
            .collect();
        Ok(managed)
    }

    /// Logical names of containers whose kind segment matches `kind`.
    ///
    /// # Errors
    ///
    /// Returns the runtime failure when containers cannot be listed.
    pub fn list_by_kind(
        &self,
        kind: ContainerKind,
        include_stopped: bool,
    ) -> Result<BTreeSet<String>, RuntimeError> {
        Ok(self
            .managed(include_stopped)?
            .into_iter()
            .filter(|(identity, _)| identity.kind() == kind)
            .map(|(identity, _)| identity.name().to_string())
            .collect())
    }

    /// Whether a container exists for the definition, running or not.
    ///
    /// # Errors
    ///
    /// Returns the runtime failure when containers cannot be listed.
    pub fn exists(&self, definition: &WorkloadDefinition) -> Result<bool, RuntimeError> {
        self.name_listed(definition, true)
    }

    /// Whether the definition's container is executing.
    ///
    /// # Errors
    ///
    /// Returns the runtime failure when containers cannot be listed.
    pub fn is_running(&self, definition: &WorkloadDefinition) -> Result<bool, RuntimeError> {
        self.name_listed(definition, false)
    }

    fn name_listed(
        &self,
        definition: &WorkloadDefinition,
        include_stopped: bool,
    ) -> Result<bool, RuntimeError> {
        let kind = definition.kind().container_kind();
        Ok(self
            .list_by_kind(kind, include_stopped)?
            .contains(definition.name().as_str()))
    }

    /// State of a loaded definition: `Defined`, `Existing` or `Running`.
    ///
    /// # Errors
    ///
    /// Returns the runtime failure when containers cannot be listed.
    pub fn state(&self, definition: &WorkloadDefinition) -> Result<WorkloadState, RuntimeError> {
        let kind = definition.kind().container_kind();
        self.state_of(kind, definition.name(), true)
    }

    /// State of a name that may lack a definition.
    ///
    /// # Errors
    ///
    /// Returns the runtime failure when containers cannot be listed.
    pub fn state_of(
        &self,
        kind: ContainerKind,
        name: &WorkloadName,
        defined: bool,
    ) -> Result<WorkloadState, RuntimeError> {
        let mut state = if defined {
            WorkloadState::Defined
        } else {
            WorkloadState::Unknown
        };
        for (identity, running) in self.managed(true)? {
            if identity.kind() != kind || identity.name() != name {
                continue;
            }
            if running {
                return Ok(WorkloadState::Running);
            }
            state = WorkloadState::Existing;
        }
        Ok(state)
    }

    /// Whether a container with exactly this identity exists.
    ///
    /// # Errors
    ///
    /// Returns the runtime failure when containers cannot be listed.
    pub fn container_exists(&self, identity: &ContainerIdentity) -> Result<bool, RuntimeError> {
        let wanted = identity.to_string();
        Ok(self
            .containers(true)?
            .iter()
            .any(|info| info.name == wanted))
    }
}
