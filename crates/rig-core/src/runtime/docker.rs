//! [`ContainerRuntime`] backed by the `docker` command-line client.

use std::time::Duration;

use rig_config::Config;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::process::{CommandOutput, CommandRunner, Invocation, ProcessRunner};
use super::{ContainerInfo, ContainerRuntime, ContainerSpec, ExecRequest, LogsRequest, RuntimeError};

const DOCKER_TARGET: &str = "rig_core::runtime::docker";
const PS_FORMAT: &str = "{{json .}}";

const NO_SUCH_CONTAINER: [&str; 2] = ["No such container", "No such object"];
const DAEMON_UNREACHABLE: [&str; 2] = ["Cannot connect to the Docker daemon", "error during connect"];

/// Drives the `docker` client through a [`CommandRunner`].
#[derive(Debug, Clone)]
pub struct DockerCli<R = ProcessRunner> {
    binary: String,
    timeout: Duration,
    runner: R,
}

impl DockerCli<ProcessRunner> {
    /// Client using `binary` with `timeout` per control call.
    #[must_use]
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self::with_runner(binary, timeout, ProcessRunner)
    }

    /// Client configured from the resolved configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.docker_binary(), config.runtime_timeout())
    }
}

impl<R: CommandRunner> DockerCli<R> {
    /// Client executing through a custom runner.
    #[must_use]
    pub fn with_runner(binary: impl Into<String>, timeout: Duration, runner: R) -> Self {
        Self {
            binary: binary.into(),
            timeout,
            runner,
        }
    }

    fn invocation(&self, operation: &'static str) -> Invocation {
        Invocation::new(self.binary.as_str(), operation).arg(operation)
    }

    fn control(&self, invocation: &Invocation, subject: &str) -> Result<String, RuntimeError> {
        let output = self.runner.run(invocation, self.timeout)?;
        if output.is_success() {
            return Ok(output.stdout);
        }
        Err(classify_failure(invocation.operation(), subject, &output))
    }
}

impl<R: CommandRunner> ContainerRuntime for DockerCli<R> {
    fn list_containers(&self, include_stopped: bool) -> Result<Vec<ContainerInfo>, RuntimeError> {
        let invocation = self
            .invocation("ps")
            .flag("--all", include_stopped)
            .args(["--no-trunc", "--format", PS_FORMAT]);
        let stdout = self.control(&invocation, "")?;
        let containers = parse_ps_output(&stdout)?;
        debug!(
            target: DOCKER_TARGET,
            include_stopped,
            count = containers.len(),
            "listed containers"
        );
        Ok(containers)
    }

    fn create(&self, spec: &ContainerSpec) -> Result<(), RuntimeError> {
        let invocation = create_invocation(self.invocation("create"), spec);
        self.control(&invocation, &spec.name).map(drop)
    }

    fn start(&self, name: &str) -> Result<(), RuntimeError> {
        let invocation = self.invocation("start").arg(name);
        self.control(&invocation, name).map(drop)
    }

    fn stop(&self, name: &str) -> Result<(), RuntimeError> {
        let invocation = self.invocation("stop").arg(name);
        self.control(&invocation, name).map(drop)
    }

    fn remove(&self, name: &str, volumes: bool) -> Result<(), RuntimeError> {
        let invocation = self.invocation("rm").flag("--volumes", volumes).arg(name);
        self.control(&invocation, name).map(drop)
    }

    fn rename(&self, old: &str, new: &str) -> Result<(), RuntimeError> {
        let invocation = self.invocation("rename").args([old, new]);
        self.control(&invocation, old).map(drop)
    }

    fn pull(&self, image: &str) -> Result<(), RuntimeError> {
        let invocation = self.invocation("pull").arg(image);
        self.control(&invocation, image).map(drop)
    }

    fn exec(&self, request: &ExecRequest) -> Result<i32, RuntimeError> {
        let invocation = self
            .invocation("exec")
            .flag("--interactive", request.interactive)
            .flag("--tty", request.interactive)
            .arg(request.container.as_str())
            .args(request.argv.iter().map(String::as_str));
        self.runner.attach(&invocation)
    }

    fn logs(&self, request: &LogsRequest) -> Result<i32, RuntimeError> {
        let mut invocation = self.invocation("logs").flag("--follow", request.follow);
        if let Some(tail) = request.tail {
            invocation = invocation.args(["--tail".to_owned(), tail.to_string()]);
        }
        self.runner
            .attach(&invocation.arg(request.container.as_str()))
    }

    fn inspect(&self, name: &str) -> Result<Value, RuntimeError> {
        let invocation = self.invocation("inspect").args(["--type", "container", name]);
        let stdout = self.control(&invocation, name)?;
        let invalid = |message: String| RuntimeError::InvalidOutput {
            operation: String::from("inspect"),
            message,
        };
        let document: Value =
            serde_json::from_str(&stdout).map_err(|error| invalid(error.to_string()))?;
        match document {
            Value::Array(mut entries) if !entries.is_empty() => Ok(entries.swap_remove(0)),
            Value::Array(_) => Err(RuntimeError::NoSuchContainer {
                name: name.to_owned(),
            }),
            other => Ok(other),
        }
    }
}

fn create_invocation(mut invocation: Invocation, spec: &ContainerSpec) -> Invocation {
    invocation = invocation
        .args(["--name", spec.name.as_str()])
        .flag("--publish-all", spec.publish_all_ports);
    for port in &spec.ports {
        invocation = invocation.args(["--publish", port.as_str()]);
    }
    for entry in &spec.environment {
        invocation = invocation.args(["--env", entry.as_str()]);
    }
    for volume in &spec.volumes {
        invocation = invocation.args(["--volume", volume.as_str()]);
    }
    for source in &spec.volumes_from {
        invocation = invocation.args(["--volumes-from", source.as_str()]);
    }
    if let Some(entrypoint) = &spec.entrypoint {
        invocation = invocation.args(["--entrypoint", entrypoint.as_str()]);
    }
    if let Some(user) = &spec.user {
        invocation = invocation.args(["--user", user.as_str()]);
    }
    if let Some(workdir) = &spec.workdir {
        invocation = invocation.args(["--workdir", workdir.as_str()]);
    }
    invocation
        .arg(spec.image.as_str())
        .args(spec.command.iter().map(String::as_str))
}

#[derive(Debug, Deserialize)]
struct PsRow {
    #[serde(rename = "ID", default)]
    id: String,
    #[serde(rename = "Names", default)]
    names: String,
    #[serde(rename = "Status", default)]
    status: String,
    #[serde(rename = "State", default)]
    state: String,
}

impl PsRow {
    fn is_running(&self) -> bool {
        if self.state.is_empty() {
            self.status.starts_with("Up")
        } else {
            self.state == "running"
        }
    }
}

/// Parses `docker ps --format '{{json .}}'` output, one object per line.
///
/// A container with several comma-separated names yields one entry per
/// name. Blank lines are skipped.
///
/// # Errors
///
/// Returns [`RuntimeError::InvalidOutput`] when a line is not a JSON object.
pub fn parse_ps_output(stdout: &str) -> Result<Vec<ContainerInfo>, RuntimeError> {
    let mut containers = Vec::new();
    for line in stdout.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let row: PsRow = serde_json::from_str(line).map_err(|error| RuntimeError::InvalidOutput {
            operation: String::from("ps"),
            message: format!("{error} in line {line:?}"),
        })?;
        let running = row.is_running();
        for name in row.names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            containers.push(ContainerInfo {
                name: name.trim_start_matches('/').to_owned(),
                id: row.id.clone(),
                status: row.status.clone(),
                running,
            });
        }
    }
    Ok(containers)
}

/// Maps a failed client invocation onto a [`RuntimeError`].
#[must_use]
pub fn classify_failure(operation: &str, subject: &str, output: &CommandOutput) -> RuntimeError {
    let stderr = output.stderr.trim();
    if DAEMON_UNREACHABLE.iter().any(|marker| stderr.contains(marker)) {
        return RuntimeError::Unavailable {
            message: stderr.to_owned(),
            transient: true,
        };
    }
    if NO_SUCH_CONTAINER.iter().any(|marker| stderr.contains(marker)) {
        return RuntimeError::NoSuchContainer {
            name: subject.to_owned(),
        };
    }
    RuntimeError::CommandFailed {
        operation: operation.to_owned(),
        status: output.status.unwrap_or(-1),
        stderr: stderr.to_owned(),
    }
}
