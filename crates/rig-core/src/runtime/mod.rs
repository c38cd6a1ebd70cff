//! Container runtime seam.
//!
//! [`ContainerRuntime`] is the narrow set of primitives the lifecycle layer
//! needs. [`DockerCli`] implements it by driving the `docker` client; tests
//! substitute in-memory doubles. Each primitive is assumed atomic.

mod docker;
mod error;
mod process;
mod retry;

use serde_json::Value;

pub use self::docker::{DockerCli, classify_failure, parse_ps_output};
pub use self::error::RuntimeError;
pub use self::process::{CommandOutput, CommandRunner, Invocation, ProcessRunner};
pub use self::retry::RetryPolicy;

/// One container as reported by the runtime.
///
/// Containers carrying several names are reported once per name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    /// Container name without the leading `/`.
    pub name: String,
    /// Runtime identifier.
    pub id: String,
    /// Human-readable status such as `Up 3 minutes`.
    pub status: String,
    /// Whether the container is currently executing.
    pub running: bool,
}

/// Everything needed to create a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSpec {
    /// Container name.
    pub name: String,
    /// Image reference.
    pub image: String,
    /// Command and arguments passed to the image.
    pub command: Vec<String>,
    /// Entrypoint override.
    pub entrypoint: Option<String>,
    /// Environment entries in `KEY=value` form.
    pub environment: Vec<String>,
    /// Port mappings in `host:container` form.
    pub ports: Vec<String>,
    /// Volume mappings in `host:container` form.
    pub volumes: Vec<String>,
    /// Containers whose volumes are mounted into this one.
    pub volumes_from: Vec<String>,
    /// Publishes every exposed port.
    pub publish_all_ports: bool,
    /// User the container runs as.
    pub user: Option<String>,
    /// Working directory inside the container.
    pub workdir: Option<String>,
}

impl ContainerSpec {
    /// Minimal container description naming a container and its image.
    #[must_use]
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            ..Self::default()
        }
    }
}

/// Command to run inside an existing container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRequest {
    /// Target container name.
    pub container: String,
    /// Program and arguments.
    pub argv: Vec<String>,
    /// Attaches a TTY and keeps stdin open.
    pub interactive: bool,
}

/// Log streaming options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogsRequest {
    /// Target container name.
    pub container: String,
    /// Keeps streaming new output.
    pub follow: bool,
    /// Number of trailing lines, or every line when `None`.
    pub tail: Option<usize>,
}

/// Primitives offered by a container runtime.
///
/// Control calls are bounded by the implementation's timeout. `exec` and
/// `logs` are attached to the caller's terminal and are not.
pub trait ContainerRuntime {
    /// Lists containers, including stopped ones when `include_stopped` is set.
    ///
    /// # Errors
    ///
    /// Returns a [`RuntimeError`] when the runtime cannot be queried.
    fn list_containers(&self, include_stopped: bool) -> Result<Vec<ContainerInfo>, RuntimeError>;

    /// Creates a container without starting it.
    ///
    /// # Errors
    ///
    /// Returns a [`RuntimeError`] when creation fails.
    fn create(&self, spec: &ContainerSpec) -> Result<(), RuntimeError>;

    /// Starts an existing container.
    ///
    /// # Errors
    ///
    /// Returns a [`RuntimeError`] when the container cannot be started.
    fn start(&self, name: &str) -> Result<(), RuntimeError>;

    /// Stops a running container.
    ///
    /// # Errors
    ///
    /// Returns a [`RuntimeError`] when the container cannot be stopped.
    fn stop(&self, name: &str) -> Result<(), RuntimeError>;

    /// Removes a stopped container, and its anonymous volumes when `volumes`
    /// is set.
    ///
    /// # Errors
    ///
    /// Returns a [`RuntimeError`] when removal fails.
    fn remove(&self, name: &str, volumes: bool) -> Result<(), RuntimeError>;

    /// Renames a container.
    ///
    /// # Errors
    ///
    /// Returns a [`RuntimeError`] when the rename is refused.
    fn rename(&self, old: &str, new: &str) -> Result<(), RuntimeError>;

    /// Pulls a fresh copy of an image.
    ///
    /// # Errors
    ///
    /// Returns a [`RuntimeError`] when the pull fails.
    fn pull(&self, image: &str) -> Result<(), RuntimeError>;

    /// Runs a command in a container and returns its exit status.
    ///
    /// # Errors
    ///
    /// Returns a [`RuntimeError`] when the command cannot be launched.
    fn exec(&self, request: &ExecRequest) -> Result<i32, RuntimeError>;

    /// Streams a container's logs and returns the client's exit status.
    ///
    /// # Errors
    ///
    /// Returns a [`RuntimeError`] when streaming cannot be started.
    fn logs(&self, request: &LogsRequest) -> Result<i32, RuntimeError>;

    /// Returns the runtime's machine-readable description of a container.
    ///
    /// # Errors
    ///
    /// Returns a [`RuntimeError`] when the container cannot be inspected.
    fn inspect(&self, name: &str) -> Result<Value, RuntimeError>;
}

impl<T: ContainerRuntime + ?Sized> ContainerRuntime for &T {
    fn list_containers(&self, include_stopped: bool) -> Result<Vec<ContainerInfo>, RuntimeError> {
        (**self).list_containers(include_stopped)
    }

    fn create(&self, spec: &ContainerSpec) -> Result<(), RuntimeError> {
        (**self).create(spec)
    }

    fn start(&self, name: &str) -> Result<(), RuntimeError> {
        (**self).start(name)
    }

    fn stop(&self, name: &str) -> Result<(), RuntimeError> {
        (**self).stop(name)
    }

    fn remove(&self, name: &str, volumes: bool) -> Result<(), RuntimeError> {
        (**self).remove(name, volumes)
    }

    fn rename(&self, old: &str, new: &str) -> Result<(), RuntimeError> {
        (**self).rename(old, new)
    }

    fn pull(&self, image: &str) -> Result<(), RuntimeError> {
        (**self).pull(image)
    }

    fn exec(&self, request: &ExecRequest) -> Result<i32, RuntimeError> {
        (**self).exec(request)
    }

    fn logs(&self, request: &LogsRequest) -> Result<i32, RuntimeError> {
        (**self).logs(request)
    }

    fn inspect(&self, name: &str) -> Result<Value, RuntimeError> {
        (**self).inspect(name)
    }
}

impl<T: ContainerRuntime + ?Sized> ContainerRuntime for Box<T> {
    fn list_containers(&self, include_stopped: bool) -> Result<Vec<ContainerInfo>, RuntimeError> {
        (**self).list_containers(include_stopped)
    }

    fn create(&self, spec: &ContainerSpec) -> Result<(), RuntimeError> {
        (**self).create(spec)
    }

    fn start(&self, name: &str) -> Result<(), RuntimeError> {
        (**self).start(name)
    }

    fn stop(&self, name: &str) -> Result<(), RuntimeError> {
        (**self).stop(name)
    }

    fn remove(&self, name: &str, volumes: bool) -> Result<(), RuntimeError> {
        (**self).remove(name, volumes)
    }

    fn rename(&self, old: &str, new: &str) -> Result<(), RuntimeError> {
        (**self).rename(old, new)
    }

    fn pull(&self, image: &str) -> Result<(), RuntimeError> {
        (**self).pull(image)
    }

    fn exec(&self, request: &ExecRequest) -> Result<i32, RuntimeError> {
        (**self).exec(request)
    }

    fn logs(&self, request: &LogsRequest) -> Result<i32, RuntimeError> {
        (**self).logs(request)
    }

    fn inspect(&self, name: &str) -> Result<Value, RuntimeError> {
        (**self).inspect(name)
    }
}
