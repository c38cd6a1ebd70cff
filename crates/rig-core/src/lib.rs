//! Workload lifecycle management for rig.
//!
//! A workload is a chain or a service described by a definition file in the
//! workload tree and realised as one container (plus an optional companion
//! data container) in a Docker-compatible runtime. This crate owns:
//!
//! - [`identity`]: the `{prefix}_{kind}_{name}_{instance}` naming convention
//!   and its inverse.
//! - [`definition`]: loading, validating and rewriting definition files in
//!   JSON, TOML or YAML.
//! - [`runtime`]: the [`ContainerRuntime`] seam and its `docker` client
//!   implementation.
//! - [`state`]: deriving `Defined`/`Existing`/`Running` from live listings.
//! - [`lock`]: advisory per-workload locks for mutating operations.
//! - [`editor`]: opening definition files in the operator's editor.
//! - [`lifecycle`]: the start, stop, rename, update and remove sequences,
//!   plus editing definitions and graduating chains into services.
//!
//! Workload state is never cached. Every operation asks the runtime afresh,
//! so state changes made outside rig are observed on the next call.

pub mod definition;
pub mod editor;
pub mod identity;
pub mod lifecycle;
pub mod lock;
pub mod runtime;
pub mod state;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use definition::{DefinitionError, DefinitionStore, WorkloadDefinition};
pub use editor::{CommandEditor, DefinitionEditor, EditorError};
pub use identity::{ContainerIdentity, ContainerKind, Naming, WorkloadKind, WorkloadName};
pub use lifecycle::{
    Lifecycle, LifecycleError, LogsOptions, Notice, Outcome, RemoveOptions, StartOptions,
    StopOptions, UpdateOptions,
};
pub use runtime::{ContainerRuntime, DockerCli, RetryPolicy, RuntimeError};
pub use state::WorkloadState;

#[cfg(test)]
mod tests;
