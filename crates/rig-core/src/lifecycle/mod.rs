//! Lifecycle orchestration for chains and services.
//!
//! [`Lifecycle`] combines the definition store, the naming convention and the
//! state resolver to drive a [`ContainerRuntime`]. Mutating operations hold
//! the workload's advisory lock for their whole duration; queries take no
//! lock. State is re-read from the runtime at the start of every operation.
//!
//! Multi-step sequences (stop then remove, rename, update) run to completion
//! or stop at the first failure. Steps that already succeeded are not rolled
//! back.

mod error;
mod inspect;
mod outcome;

use std::collections::BTreeSet;
use std::path::PathBuf;

use rig_config::{Config, WorkloadPaths};
use serde_json::Value;
use tracing::{debug, info};

pub use self::error::LifecycleError;
pub use self::inspect::{ALL_FIELDS, select_field};
pub use self::outcome::{Notice, Outcome};

use crate::definition::{CommandLine, DefinitionStore, WorkloadDefinition};
use crate::editor::DefinitionEditor;
use crate::identity::{Naming, WorkloadKind, WorkloadName};
use crate::lock::WorkloadLock;
use crate::runtime::{ContainerRuntime, ContainerSpec, ExecRequest, LogsRequest, RetryPolicy};
use crate::state::{StateResolver, WorkloadState};

const LIFECYCLE_TARGET: &str = "rig_core::lifecycle";

/// Options for [`Lifecycle::start`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StartOptions {
    /// Publishes every exposed port when the container is created.
    pub publish_all_ports: bool,
}

/// Options for [`Lifecycle::stop`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StopOptions {
    /// Removes the primary container after stopping it.
    pub remove_container: bool,
    /// Removes the companion data container after stopping.
    pub remove_data: bool,
}

/// Options for [`Lifecycle::remove`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    /// Removes the companion data container too.
    pub remove_data: bool,
    /// Deletes the definition file as well.
    pub force: bool,
}

/// Options for [`Lifecycle::update`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Pulls a fresh image before recreating the container.
    pub pull: bool,
}

/// Options for [`Lifecycle::logs`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogsOptions {
    /// Keeps streaming new output.
    pub follow: bool,
    /// Number of trailing lines, or every line when `None`.
    pub tail: Option<usize>,
}

/// Lifecycle orchestrator bound to one runtime and workload tree.
#[derive(Debug)]
pub struct Lifecycle<R> {
    runtime: R,
    naming: Naming,
    paths: WorkloadPaths,
    retry: RetryPolicy,
    data_image: String,
}

impl<R: ContainerRuntime> Lifecycle<R> {
    /// Creates an orchestrator with default retry and data image settings.
    #[must_use]
    pub fn new(runtime: R, naming: Naming, paths: WorkloadPaths) -> Self {
        Self {
            runtime,
            naming,
            paths,
            retry: RetryPolicy::default(),
            data_image: rig_config::default_data_image(),
        }
    }

    /// Creates an orchestrator from the resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidName`] for an unusable prefix and
    /// [`LifecycleError::Paths`] for an empty root directory.
    pub fn from_config(config: &Config, runtime: R) -> Result<Self, LifecycleError> {
        let naming = Naming::from_config(config)?;
        let paths = WorkloadPaths::from_config(config)?;
        Ok(Self::new(runtime, naming, paths)
            .with_retry(RetryPolicy::from_config(config))
            .with_data_image(config.data_image()))
    }

    /// Replaces the retry policy for read-only queries.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replaces the image used for companion data containers.
    #[must_use]
    pub fn with_data_image(mut self, image: impl Into<String>) -> Self {
        self.data_image = image.into();
        self
    }

    /// Runtime driven by this orchestrator.
    #[must_use]
    pub const fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Naming parameters in effect.
    #[must_use]
    pub const fn naming(&self) -> &Naming {
        &self.naming
    }

    /// Definition store for `kind`.
    #[must_use]
    pub fn store(&self, kind: WorkloadKind) -> DefinitionStore {
        DefinitionStore::for_kind(&self.paths, kind)
    }

    /// State resolver over this orchestrator's runtime.
    #[must_use]
    pub const fn resolver(&self) -> StateResolver<'_, R> {
        StateResolver::new(&self.runtime, &self.naming, self.retry)
    }

    fn lock(&self, kind: WorkloadKind, name: &WorkloadName) -> Result<WorkloadLock, LifecycleError> {
        let locks_dir = self.paths.prepare_locks_dir()?;
        Ok(WorkloadLock::acquire(locks_dir, kind, name)?)
    }

    fn load(&self, kind: WorkloadKind, name: &WorkloadName) -> Result<WorkloadDefinition, LifecycleError> {
        Ok(self.store(kind).load(name)?)
    }

    /// Starts a workload, creating its containers first when needed.
    ///
    /// # Errors
    ///
    /// Returns definition, lock and runtime failures.
    pub fn start(
        &self,
        kind: WorkloadKind,
        name: &str,
        options: StartOptions,
    ) -> Result<Outcome, LifecycleError> {
        let name = WorkloadName::new(name)?;
        let _lock = self.lock(kind, &name)?;
        let definition = self.load(kind, &name)?;
        let resolver = self.resolver();
        if resolver.is_running(&definition)? {
            return Ok(Outcome::Skipped(Notice::AlreadyRunning {
                kind,
                name: name.into_inner(),
            }));
        }
        if !resolver.exists(&definition)? {
            self.create_containers(&definition, options.publish_all_ports)?;
        } else if options.publish_all_ports {
            debug!(
                target: LIFECYCLE_TARGET,
                %kind,
                %name,
                "container already exists; port publishing is fixed at creation"
            );
        }
        let primary = self.naming.primary(kind, definition.name()).to_string();
        self.runtime.start(&primary)?;
        info!(target: LIFECYCLE_TARGET, %kind, %name, container = %primary, "started workload");
        Ok(Outcome::Done(()))
    }

    /// Stops a running workload, optionally removing its containers.
    ///
    /// # Errors
    ///
    /// Returns definition, lock and runtime failures.
    pub fn stop(
        &self,
        kind: WorkloadKind,
        name: &str,
        options: StopOptions,
    ) -> Result<Outcome, LifecycleError> {
        let name = WorkloadName::new(name)?;
        let _lock = self.lock(kind, &name)?;
        let definition = self.load(kind, &name)?;
        let resolver = self.resolver();
        if !resolver.is_running(&definition)? {
            return Ok(Outcome::Skipped(Notice::NotRunning {
                kind,
                name: name.into_inner(),
            }));
        }
        let primary = self.naming.primary(kind, definition.name()).to_string();
        self.runtime.stop(&primary)?;
        info!(target: LIFECYCLE_TARGET, %kind, %name, container = %primary, "stopped workload");
        if options.remove_container {
            self.runtime.remove(&primary, false)?;
            info!(target: LIFECYCLE_TARGET, %kind, %name, container = %primary, "removed container");
        }
        if options.remove_data {
            self.remove_data_container(&definition)?;
        }
        Ok(Outcome::Done(()))
    }

    /// Removes a workload's container and, with `force`, its definition.
    ///
    /// # Errors
    ///
    /// Returns definition, lock and runtime failures.
    pub fn remove(
        &self,
        kind: WorkloadKind,
        name: &str,
        options: RemoveOptions,
    ) -> Result<Outcome, LifecycleError> {
        let name = WorkloadName::new(name)?;
        let _lock = self.lock(kind, &name)?;
        let definition = self.load(kind, &name)?;
        let state = self.resolver().state(&definition)?;
        if !state.has_container() && !options.force {
            return Ok(Outcome::Skipped(Notice::NotExisting {
                kind,
                name: name.into_inner(),
            }));
        }
        let primary = self.naming.primary(kind, definition.name()).to_string();
        if state == WorkloadState::Running {
            self.runtime.stop(&primary)?;
        }
        if state.has_container() {
            self.runtime.remove(&primary, false)?;
            info!(target: LIFECYCLE_TARGET, %kind, %name, container = %primary, "removed container");
        }
        if options.remove_data {
            self.remove_data_container(&definition)?;
        }
        if options.force {
            self.store(kind).delete(definition.path())?;
            info!(
                target: LIFECYCLE_TARGET,
                %kind,
                %name,
                file = %definition.path().display(),
                "deleted definition"
            );
        }
        Ok(Outcome::Done(()))
    }

    /// Renames a workload's containers and definition file.
    ///
    /// Containers are renamed first, then the new definition is written with
    /// its identity field cleared, then the old file is deleted. A failure
    /// between those steps leaves the earlier ones in place.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::RenameConflict`] when the target name is
    /// already in use, plus definition, lock and runtime failures.
    pub fn rename(
        &self,
        kind: WorkloadKind,
        old: &str,
        new: &str,
    ) -> Result<Outcome, LifecycleError> {
        let old_name = WorkloadName::new(old)?;
        let new_name = WorkloadName::new(new)?;
        let conflict = |reason: &str| LifecycleError::RenameConflict {
            kind,
            from: old.to_owned(),
            to: new.to_owned(),
            reason: reason.to_owned(),
        };
        if old_name == new_name {
            return Err(conflict("the names are identical"));
        }
        let locks_dir = self.paths.prepare_locks_dir()?;
        let _locks = WorkloadLock::acquire_many(locks_dir, kind, &[&old_name, &new_name])?;
        let store = self.store(kind);
        let definition = store.load(&old_name)?;
        if store.contains(&new_name) {
            return Err(conflict("a definition with that name already exists"));
        }

        let resolver = self.resolver();
        let new_primary = self.naming.primary(kind, &new_name);
        let new_data = self.naming.data(&new_name);
        if resolver.container_exists(&new_primary)? {
            return Err(conflict("its container name is already taken"));
        }
        if resolver.container_exists(&new_data)? {
            return Err(conflict("its data container name is already taken"));
        }

        let old_primary = self.naming.primary(kind, definition.name());
        let old_data = self.naming.data(definition.name());
        if resolver.container_exists(&old_primary)? {
            self.runtime
                .rename(&old_primary.to_string(), &new_primary.to_string())?;
        }
        if resolver.container_exists(&old_data)? {
            self.runtime
                .rename(&old_data.to_string(), &new_data.to_string())?;
        }

        let old_path = definition.path().to_path_buf();
        let new_path = DefinitionStore::sibling_path(&old_path, &new_name);
        let mut document = definition.into_document();
        document.rename_to(new_name.as_str());
        store.write(&document, &new_path)?;
        store.delete(&old_path)?;
        info!(
            target: LIFECYCLE_TARGET,
            %kind,
            from = %old_name,
            to = %new_name,
            file = %new_path.display(),
            "renamed workload"
        );
        Ok(Outcome::Done(()))
    }

    /// Recreates a workload's container, restarting it only if it was running.
    ///
    /// Companion data containers that already exist are left untouched.
    ///
    /// # Errors
    ///
    /// Returns definition, lock and runtime failures.
    pub fn update(
        &self,
        kind: WorkloadKind,
        name: &str,
        options: UpdateOptions,
    ) -> Result<Outcome, LifecycleError> {
        let name = WorkloadName::new(name)?;
        let _lock = self.lock(kind, &name)?;
        let definition = self.load(kind, &name)?;
        let state = self.resolver().state(&definition)?;
        let was_running = state == WorkloadState::Running;
        let primary = self.naming.primary(kind, definition.name()).to_string();

        if was_running {
            self.runtime.stop(&primary)?;
        }
        if state.has_container() {
            self.runtime.remove(&primary, false)?;
        }
        if options.pull {
            self.runtime.pull(definition.image())?;
        }
        self.create_containers(&definition, false)?;
        if was_running {
            self.runtime.start(&primary)?;
        }
        info!(
            target: LIFECYCLE_TARGET,
            %kind,
            %name,
            was_running,
            pulled = options.pull,
            "updated workload"
        );
        Ok(Outcome::Done(()))
    }

    /// Runs a command inside an existing container.
    ///
    /// # Errors
    ///
    /// Returns definition and runtime failures.
    pub fn exec(
        &self,
        kind: WorkloadKind,
        name: &str,
        argv: Vec<String>,
        interactive: bool,
    ) -> Result<Outcome<i32>, LifecycleError> {
        let Some(definition) = self.existing(kind, name)? else {
            return Ok(not_existing(kind, name));
        };
        let request = ExecRequest {
            container: self.naming.primary(kind, definition.name()).to_string(),
            argv,
            interactive,
        };
        debug!(target: LIFECYCLE_TARGET, %kind, name, ?request, "executing in workload");
        Ok(Outcome::Done(self.runtime.exec(&request)?))
    }

    /// Streams a workload's container logs.
    ///
    /// # Errors
    ///
    /// Returns definition and runtime failures.
    pub fn logs(
        &self,
        kind: WorkloadKind,
        name: &str,
        options: LogsOptions,
    ) -> Result<Outcome<i32>, LifecycleError> {
        let Some(definition) = self.existing(kind, name)? else {
            return Ok(not_existing(kind, name));
        };
        let request = LogsRequest {
            container: self.naming.primary(kind, definition.name()).to_string(),
            follow: options.follow,
            tail: options.tail,
        };
        Ok(Outcome::Done(self.runtime.logs(&request)?))
    }

    /// Returns the runtime's description of a workload's container, or one
    /// field of it.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InspectField`] for unknown fields, plus
    /// definition and runtime failures.
    pub fn inspect(
        &self,
        kind: WorkloadKind,
        name: &str,
        field: &str,
    ) -> Result<Outcome<Value>, LifecycleError> {
        let Some(definition) = self.existing(kind, name)? else {
            return Ok(not_existing(kind, name));
        };
        let container = self.naming.primary(kind, definition.name()).to_string();
        let document = self
            .retry
            .run("inspect", || self.runtime.inspect(&container))?;
        let selected = select_field(&document, field).ok_or_else(|| LifecycleError::InspectField {
            kind,
            name: name.to_owned(),
            field: field.to_owned(),
        })?;
        Ok(Outcome::Done(selected.clone()))
    }

    /// Names of every known definition.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Definition`] when the directory is unreadable.
    pub fn list_known(&self, kind: WorkloadKind) -> Result<BTreeSet<String>, LifecycleError> {
        Ok(self.store(kind).list()?)
    }

    /// Names of workloads with a container, running or not.
    ///
    /// # Errors
    ///
    /// Returns runtime failures.
    pub fn list_existing(&self, kind: WorkloadKind) -> Result<BTreeSet<String>, LifecycleError> {
        Ok(self.resolver().list_by_kind(kind.container_kind(), true)?)
    }

    /// Names of workloads whose container is executing.
    ///
    /// # Errors
    ///
    /// Returns runtime failures.
    pub fn list_running(&self, kind: WorkloadKind) -> Result<BTreeSet<String>, LifecycleError> {
        Ok(self.resolver().list_by_kind(kind.container_kind(), false)?)
    }

    /// Text of the definition file backing `name`.
    ///
    /// # Errors
    ///
    /// Returns definition failures.
    pub fn cat(&self, kind: WorkloadKind, name: &str) -> Result<String, LifecycleError> {
        let name = WorkloadName::new(name)?;
        Ok(self.store(kind).read_raw(&name)?)
    }

    /// Opens the definition file backing `name` in `editor`, then reloads it
    /// to check the edited file is still a valid definition.
    ///
    /// An invalid edit is reported but left on disk so it can be fixed.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Editor`] when the editor fails and
    /// definition failures when the file is missing or no longer valid.
    pub fn edit<E: DefinitionEditor>(
        &self,
        kind: WorkloadKind,
        name: &str,
        editor: &E,
    ) -> Result<PathBuf, LifecycleError> {
        let name = WorkloadName::new(name)?;
        let store = self.store(kind);
        let path = store.locate(&name)?;
        editor.edit(&path)?;
        let definition = store.load(&name)?;
        info!(
            target: LIFECYCLE_TARGET,
            %kind,
            %name,
            file = %definition.path().display(),
            "edited definition"
        );
        Ok(path)
    }

    /// Lays down a service definition from the chain definition `name`.
    ///
    /// The service keeps the chain's settings and file format, records the
    /// chain it came from under the `chain` key, and shares the chain's data
    /// container. Containers are not touched.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::DefinitionExists`] when a service of that
    /// name is already defined, plus definition and lock failures.
    pub fn graduate(&self, name: &str) -> Result<PathBuf, LifecycleError> {
        let name = WorkloadName::new(name)?;
        let _lock = self.lock(WorkloadKind::Service, &name)?;
        let chain = self.load(WorkloadKind::Chain, &name)?;
        let services = self.store(WorkloadKind::Service);
        if let Ok(path) = services.locate(&name) {
            return Err(LifecycleError::DefinitionExists {
                kind: WorkloadKind::Service,
                name: name.into_inner(),
                path,
            });
        }
        let file_name = chain
            .path()
            .file_name()
            .map_or_else(|| format!("{name}.toml").into(), ToOwned::to_owned);
        let target = services.directory().join(file_name);
        let mut document = chain.into_document();
        document.graduate_from_chain(name.as_str());
        services.write(&document, &target)?;
        info!(
            target: LIFECYCLE_TARGET,
            %name,
            file = %target.display(),
            "graduated chain to service"
        );
        Ok(target)
    }

    /// Current state of `name`, including `Unknown` for names with neither a
    /// definition nor a container.
    ///
    /// # Errors
    ///
    /// Returns definition failures other than a missing file, and runtime
    /// failures.
    pub fn state(&self, kind: WorkloadKind, name: &str) -> Result<WorkloadState, LifecycleError> {
        let name = WorkloadName::new(name)?;
        match self.load(kind, &name) {
            Ok(definition) => Ok(self.resolver().state(&definition)?),
            Err(error) if error.is_definition_not_found() => {
                Ok(self
                    .resolver()
                    .state_of(kind.container_kind(), &name, false)?)
            }
            Err(error) => Err(error),
        }
    }

    /// Loads the definition and returns it only when a container exists.
    fn existing(
        &self,
        kind: WorkloadKind,
        name: &str,
    ) -> Result<Option<WorkloadDefinition>, LifecycleError> {
        let name = WorkloadName::new(name)?;
        let definition = self.load(kind, &name)?;
        if self.resolver().exists(&definition)? {
            Ok(Some(definition))
        } else {
            Ok(None)
        }
    }

    fn create_containers(
        &self,
        definition: &WorkloadDefinition,
        publish_all_ports: bool,
    ) -> Result<(), LifecycleError> {
        if definition.wants_data_container() {
            let data = self.naming.data(definition.name());
            if self.resolver().container_exists(&data)? {
                debug!(target: LIFECYCLE_TARGET, container = %data, "data container already exists");
            } else {
                let spec = ContainerSpec::new(data.to_string(), self.data_image.as_str());
                self.runtime.create(&spec)?;
                info!(target: LIFECYCLE_TARGET, container = %data, "created data container");
            }
        }
        let spec = self.primary_spec(definition, publish_all_ports);
        self.runtime.create(&spec)?;
        info!(
            target: LIFECYCLE_TARGET,
            container = %spec.name,
            image = %spec.image,
            "created container"
        );
        Ok(())
    }

    fn primary_spec(&self, definition: &WorkloadDefinition, publish_all_ports: bool) -> ContainerSpec {
        let service = definition.service();
        let volumes_from = if definition.wants_data_container() {
            vec![self.naming.data(definition.name()).to_string()]
        } else {
            Vec::new()
        };
        ContainerSpec {
            name: self
                .naming
                .primary(definition.kind(), definition.name())
                .to_string(),
            image: service.image,
            command: service
                .command
                .as_ref()
                .map(CommandLine::argv)
                .unwrap_or_default(),
            entrypoint: service.entrypoint,
            environment: service.environment,
            ports: service.ports,
            volumes: service.volumes,
            volumes_from,
            publish_all_ports: service.publish_all_ports || publish_all_ports,
            user: service.user,
            workdir: service.workdir,
        }
    }

    fn remove_data_container(&self, definition: &WorkloadDefinition) -> Result<(), LifecycleError> {
        let data = self.naming.data(definition.name());
        if self.resolver().container_exists(&data)? {
            self.runtime.remove(&data.to_string(), true)?;
            info!(target: LIFECYCLE_TARGET, container = %data, "removed data container");
        } else {
            debug!(target: LIFECYCLE_TARGET, container = %data, "no data container to remove");
        }
        Ok(())
    }
}

fn not_existing<T>(kind: WorkloadKind, name: &str) -> Outcome<T> {
    Outcome::Skipped(Notice::NotExisting {
        kind,
        name: name.to_owned(),
    })
}

#[cfg(test)]
mod tests;
