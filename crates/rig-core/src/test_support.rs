//! In-memory container runtime for tests.
//!
//! [`FakeRuntime`] mimics the observable behaviour of the Docker client:
//! names are unique, running containers refuse removal, and unknown names
//! produce [`RuntimeError::NoSuchContainer`]. Every call is recorded so tests
//! can assert on ordering or on the absence of mutating calls.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};

use serde_json::{Value, json};

use crate::runtime::{
    ContainerInfo, ContainerRuntime, ContainerSpec, ExecRequest, LogsRequest, RuntimeError,
};

/// A call observed by [`FakeRuntime`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCall {
    /// `list_containers`.
    List {
        /// Whether stopped containers were requested.
        include_stopped: bool,
    },
    /// `create` of the named container.
    Create(String),
    /// `start` of the named container.
    Start(String),
    /// `stop` of the named container.
    Stop(String),
    /// `remove` of the named container.
    Remove {
        /// Container name.
        name: String,
        /// Whether volumes were removed too.
        volumes: bool,
    },
    /// `rename` between two names.
    Rename {
        /// Previous name.
        old: String,
        /// New name.
        new: String,
    },
    /// `pull` of an image.
    Pull(String),
    /// `exec` in the named container.
    Exec {
        /// Container name.
        container: String,
        /// Program and arguments.
        argv: Vec<String>,
        /// Whether a TTY was requested.
        interactive: bool,
    },
    /// `logs` of the named container.
    Logs(String),
    /// `inspect` of the named container.
    Inspect(String),
}

impl RuntimeCall {
    /// Whether the call changes runtime state.
    #[must_use]
    pub const fn is_mutating(&self) -> bool {
        matches!(
            self,
            Self::Create(_)
                | Self::Start(_)
                | Self::Stop(_)
                | Self::Remove { .. }
                | Self::Rename { .. }
                | Self::Pull(_)
        )
    }
}

/// Container held by [`FakeRuntime`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeContainer {
    /// Synthetic identifier.
    pub id: String,
    /// Creation parameters the container was built from.
    pub spec: ContainerSpec,
    /// Whether the container is executing.
    pub running: bool,
}

/// In-memory [`ContainerRuntime`].
#[derive(Debug, Default)]
pub struct FakeRuntime {
    containers: RefCell<BTreeMap<String, FakeContainer>>,
    calls: RefCell<Vec<RuntimeCall>>,
    failures: RefCell<VecDeque<(&'static str, RuntimeError)>>,
    exit_status: Cell<i32>,
    next_id: Cell<u64>,
}

impl FakeRuntime {
    /// Empty runtime.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a container, running or stopped.
    pub fn insert(&self, name: &str, image: &str, running: bool) {
        let id = self.allocate_id();
        self.containers.borrow_mut().insert(
            name.to_owned(),
            FakeContainer {
                id,
                spec: ContainerSpec::new(name, image),
                running,
            },
        );
    }

    /// Makes the next call to `operation` fail with `error`.
    ///
    /// Operations are named after the Docker verbs: `ps`, `create`, `start`,
    /// `stop`, `rm`, `rename`, `pull`, `exec`, `logs` and `inspect`.
    pub fn fail_next(&self, operation: &'static str, error: RuntimeError) {
        self.failures.borrow_mut().push_back((operation, error));
    }

    /// Status returned by `exec` and `logs`.
    pub fn set_exit_status(&self, status: i32) {
        self.exit_status.set(status);
    }

    /// Snapshot of a container.
    #[must_use]
    pub fn container(&self, name: &str) -> Option<FakeContainer> {
        self.containers.borrow().get(name).cloned()
    }

    /// Names of every container, sorted.
    #[must_use]
    pub fn container_names(&self) -> Vec<String> {
        self.containers.borrow().keys().cloned().collect()
    }

    /// Whether the named container is executing.
    #[must_use]
    pub fn is_running(&self, name: &str) -> bool {
        self.containers
            .borrow()
            .get(name)
            .is_some_and(|container| container.running)
    }

    /// Every call observed so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.calls.borrow().clone()
    }

    /// Calls that changed runtime state.
    #[must_use]
    pub fn mutating_calls(&self) -> Vec<RuntimeCall> {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.is_mutating())
            .cloned()
            .collect()
    }

    /// Forgets recorded calls.
    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    fn allocate_id(&self) -> String {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        format!("{id:012x}")
    }

    fn record(&self, operation: &'static str, call: RuntimeCall) -> Result<(), RuntimeError> {
        self.calls.borrow_mut().push(call);
        let mut failures = self.failures.borrow_mut();
        match failures.iter().position(|(op, _)| *op == operation) {
            Some(index) => match failures.remove(index) {
                Some((_, error)) => Err(error),
                None => Ok(()),
            },
            None => Ok(()),
        }
    }

    fn with_container<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut FakeContainer) -> Result<T, RuntimeError>,
    ) -> Result<T, RuntimeError> {
        let mut containers = self.containers.borrow_mut();
        let container = containers
            .get_mut(name)
            .ok_or_else(|| RuntimeError::NoSuchContainer {
                name: name.to_owned(),
            })?;
        f(container)
    }
}

fn conflict(operation: &str, name: &str) -> RuntimeError {
    RuntimeError::CommandFailed {
        operation: operation.to_owned(),
        status: 1,
        stderr: format!("Conflict. The container name \"/{name}\" is already in use"),
    }
}

impl ContainerRuntime for FakeRuntime {
    fn list_containers(&self, include_stopped: bool) -> Result<Vec<ContainerInfo>, RuntimeError> {
        self.record("ps", RuntimeCall::List { include_stopped })?;
        Ok(self
            .containers
            .borrow()
            .iter()
            .filter(|(_, container)| include_stopped || container.running)
            .map(|(name, container)| ContainerInfo {
                name: name.clone(),
                id: container.id.clone(),
                status: if container.running {
                    String::from("Up 1 second")
                } else {
                    String::from("Exited (0) 1 second ago")
                },
                running: container.running,
            })
            .collect())
    }

    fn create(&self, spec: &ContainerSpec) -> Result<(), RuntimeError> {
        self.record("create", RuntimeCall::Create(spec.name.clone()))?;
        if self.containers.borrow().contains_key(&spec.name) {
            return Err(conflict("create", &spec.name));
        }
        let id = self.allocate_id();
        self.containers.borrow_mut().insert(
            spec.name.clone(),
            FakeContainer {
                id,
                spec: spec.clone(),
                running: false,
            },
        );
        Ok(())
    }

    fn start(&self, name: &str) -> Result<(), RuntimeError> {
        self.record("start", RuntimeCall::Start(name.to_owned()))?;
        self.with_container(name, |container| {
            container.running = true;
            Ok(())
        })
    }

    fn stop(&self, name: &str) -> Result<(), RuntimeError> {
        self.record("stop", RuntimeCall::Stop(name.to_owned()))?;
        self.with_container(name, |container| {
            container.running = false;
            Ok(())
        })
    }

    fn remove(&self, name: &str, volumes: bool) -> Result<(), RuntimeError> {
        self.record(
            "rm",
            RuntimeCall::Remove {
                name: name.to_owned(),
                volumes,
            },
        )?;
        self.with_container(name, |container| {
            if container.running {
                return Err(RuntimeError::CommandFailed {
                    operation: String::from("rm"),
                    status: 1,
                    stderr: String::from("You cannot remove a running container"),
                });
            }
            Ok(())
        })?;
        self.containers.borrow_mut().remove(name);
        Ok(())
    }

    fn rename(&self, old: &str, new: &str) -> Result<(), RuntimeError> {
        self.record(
            "rename",
            RuntimeCall::Rename {
                old: old.to_owned(),
                new: new.to_owned(),
            },
        )?;
        let mut containers = self.containers.borrow_mut();
        if containers.contains_key(new) {
            return Err(conflict("rename", new));
        }
        let mut container = containers
            .remove(old)
            .ok_or_else(|| RuntimeError::NoSuchContainer {
                name: old.to_owned(),
            })?;
        new.clone_into(&mut container.spec.name);
        containers.insert(new.to_owned(), container);
        Ok(())
    }

    fn pull(&self, image: &str) -> Result<(), RuntimeError> {
        self.record("pull", RuntimeCall::Pull(image.to_owned()))
    }

    fn exec(&self, request: &ExecRequest) -> Result<i32, RuntimeError> {
        self.record(
            "exec",
            RuntimeCall::Exec {
                container: request.container.clone(),
                argv: request.argv.clone(),
                interactive: request.interactive,
            },
        )?;
        self.with_container(&request.container, |_| Ok(()))?;
        Ok(self.exit_status.get())
    }

    fn logs(&self, request: &LogsRequest) -> Result<i32, RuntimeError> {
        self.record("logs", RuntimeCall::Logs(request.container.clone()))?;
        self.with_container(&request.container, |_| Ok(()))?;
        Ok(self.exit_status.get())
    }

    fn inspect(&self, name: &str) -> Result<Value, RuntimeError> {
        self.record("inspect", RuntimeCall::Inspect(name.to_owned()))?;
        self.with_container(name, |container| {
            let spec = &container.spec;
            Ok(json!({
                "Id": container.id,
                "Name": format!("/{name}"),
                "State": { "Running": container.running },
                "Config": {
                    "Image": spec.image,
                    "Env": spec.environment,
                    "Cmd": spec.command,
                    "User": spec.user.clone().unwrap_or_default(),
                },
                "HostConfig": {
                    "Binds": spec.volumes,
                    "VolumesFrom": spec.volumes_from,
                    "PublishAllPorts": spec.publish_all_ports,
                },
            }))
        })
    }
}
