//! Unit tests for lifecycle orchestration.

use std::fs;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

use mockall::mock;
use rstest::{fixture, rstest};
use serde_json::json;
use tempfile::TempDir;

use super::*;
use crate::definition::{DefinitionError, GRADUATED_FROM_KEY};
use crate::editor::EditorError;
use crate::runtime::{ContainerInfo, RuntimeError};
use crate::test_support::{FakeRuntime, RuntimeCall};

mock! {
    Runtime {}
    impl ContainerRuntime for Runtime {
        fn list_containers(&self, include_stopped: bool) -> Result<Vec<ContainerInfo>, RuntimeError>;
        fn create(&self, spec: &ContainerSpec) -> Result<(), RuntimeError>;
        fn start(&self, name: &str) -> Result<(), RuntimeError>;
        fn stop(&self, name: &str) -> Result<(), RuntimeError>;
        fn remove(&self, name: &str, volumes: bool) -> Result<(), RuntimeError>;
        fn rename(&self, old: &str, new: &str) -> Result<(), RuntimeError>;
        fn pull(&self, image: &str) -> Result<(), RuntimeError>;
        fn exec(&self, request: &ExecRequest) -> Result<i32, RuntimeError>;
        fn logs(&self, request: &LogsRequest) -> Result<i32, RuntimeError>;
        fn inspect(&self, name: &str) -> Result<Value, RuntimeError>;
    }
}

struct Workspace {
    root: TempDir,
}

impl Workspace {
    fn chain_file(&self, name: &str) -> PathBuf {
        self.root.path().join("chains").join(format!("{name}.toml"))
    }

    fn write_chain(&self, name: &str, body: &str) {
        let path = self.chain_file(name);
        fs::create_dir_all(path.parent().expect("chains dir")).expect("create chains dir");
        fs::write(path, body).expect("write chain definition");
    }

    fn lifecycle<R: ContainerRuntime>(&self, runtime: R) -> Lifecycle<R> {
        self.lifecycle_for_instance(runtime, NonZeroU32::MIN)
    }

    fn lifecycle_for_instance<R: ContainerRuntime>(
        &self,
        runtime: R,
        instance: NonZeroU32,
    ) -> Lifecycle<R> {
        let naming = Naming::new("rig", instance).expect("naming");
        let paths = WorkloadPaths::from_root(self.root.path()).expect("paths");
        Lifecycle::new(runtime, naming, paths)
            .with_retry(RetryPolicy::new(2, Duration::ZERO))
            .with_data_image("busybox")
    }
}

#[fixture]
fn workspace() -> Workspace {
    let workspace = Workspace {
        root: TempDir::new().expect("temp dir"),
    };
    workspace.write_chain("alpha", "[service]\nimage = \"chain-image\"\n");
    workspace
}

fn with_data(workspace: &Workspace) {
    workspace.write_chain(
        "alpha",
        "[service]\nimage = \"chain-image\"\ndata_container = true\ncommand = \"run --fast\"\n",
    );
}

#[rstest]
fn start_creates_and_starts_container(workspace: Workspace) {
    let lifecycle = workspace.lifecycle(FakeRuntime::new());
    let outcome = lifecycle
        .start(WorkloadKind::Chain, "alpha", StartOptions::default())
        .expect("start");
    assert_eq!(outcome, Outcome::Done(()));
    assert!(lifecycle.runtime().is_running("rig_chain_alpha_1"));
    assert_eq!(
        lifecycle.state(WorkloadKind::Chain, "alpha").expect("state"),
        WorkloadState::Running
    );
}

#[rstest]
fn start_is_idempotent(workspace: Workspace) {
    let lifecycle = workspace.lifecycle(FakeRuntime::new());
    lifecycle
        .start(WorkloadKind::Chain, "alpha", StartOptions::default())
        .expect("first start");
    lifecycle.runtime().clear_calls();

    let outcome = lifecycle
        .start(WorkloadKind::Chain, "alpha", StartOptions::default())
        .expect("second start");

    assert!(matches!(
        outcome.notice(),
        Some(Notice::AlreadyRunning { name, .. }) if name == "alpha"
    ));
    assert!(lifecycle.runtime().mutating_calls().is_empty());
}

#[rstest]
fn start_reuses_stopped_container(workspace: Workspace) {
    let runtime = FakeRuntime::new();
    runtime.insert("rig_chain_alpha_1", "chain-image", false);
    let lifecycle = workspace.lifecycle(runtime);
    lifecycle
        .start(WorkloadKind::Chain, "alpha", StartOptions::default())
        .expect("start");
    assert_eq!(
        lifecycle.runtime().mutating_calls(),
        vec![RuntimeCall::Start(String::from("rig_chain_alpha_1"))]
    );
}

#[rstest]
fn start_creates_data_container_before_primary(workspace: Workspace) {
    with_data(&workspace);
    let lifecycle = workspace.lifecycle(FakeRuntime::new());
    lifecycle
        .start(
            WorkloadKind::Chain,
            "alpha",
            StartOptions {
                publish_all_ports: true,
            },
        )
        .expect("start");

    assert_eq!(
        lifecycle.runtime().mutating_calls(),
        vec![
            RuntimeCall::Create(String::from("rig_data_alpha_1")),
            RuntimeCall::Create(String::from("rig_chain_alpha_1")),
            RuntimeCall::Start(String::from("rig_chain_alpha_1")),
        ]
    );
    let primary = lifecycle
        .runtime()
        .container("rig_chain_alpha_1")
        .expect("primary created");
    assert_eq!(primary.spec.volumes_from, vec![String::from("rig_data_alpha_1")]);
    assert_eq!(primary.spec.command, vec!["run", "--fast"]);
    assert!(primary.spec.publish_all_ports);
    let data = lifecycle
        .runtime()
        .container("rig_data_alpha_1")
        .expect("data created");
    assert_eq!(data.spec.image, "busybox");
    assert!(!data.running);
}

#[rstest]
fn missing_definition_makes_no_runtime_call(workspace: Workspace) {
    let lifecycle = workspace.lifecycle(FakeRuntime::new());
    let error = lifecycle
        .start(WorkloadKind::Chain, "ghost", StartOptions::default())
        .expect_err("unknown chain");
    assert!(matches!(
        error,
        LifecycleError::Definition(DefinitionError::NotFound { .. })
    ));
    assert!(lifecycle.runtime().calls().is_empty());
}

#[rstest]
fn invalid_name_is_rejected(workspace: Workspace) {
    let lifecycle = workspace.lifecycle(FakeRuntime::new());
    let error = lifecycle
        .start(WorkloadKind::Chain, "bad name", StartOptions::default())
        .expect_err("whitespace refused");
    assert!(matches!(error, LifecycleError::InvalidName(_)));
}

#[rstest]
fn stop_without_running_container_makes_no_mutating_call(workspace: Workspace) {
    let mut runtime = MockRuntime::new();
    runtime
        .expect_list_containers()
        .returning(|_| Ok(Vec::new()));
    runtime.expect_stop().never();
    runtime.expect_remove().never();
    let lifecycle = workspace.lifecycle(runtime);

    let outcome = lifecycle
        .stop(
            WorkloadKind::Chain,
            "alpha",
            StopOptions {
                remove_container: true,
                remove_data: true,
            },
        )
        .expect("stop");

    assert!(matches!(outcome.notice(), Some(Notice::NotRunning { .. })));
}

#[rstest]
fn stop_with_removal_clears_containers(workspace: Workspace) {
    with_data(&workspace);
    let runtime = FakeRuntime::new();
    runtime.insert("rig_chain_alpha_1", "chain-image", true);
    runtime.insert("rig_data_alpha_1", "busybox", false);
    let lifecycle = workspace.lifecycle(runtime);

    lifecycle
        .stop(
            WorkloadKind::Chain,
            "alpha",
            StopOptions {
                remove_container: true,
                remove_data: true,
            },
        )
        .expect("stop");

    assert_eq!(
        lifecycle.runtime().mutating_calls(),
        vec![
            RuntimeCall::Stop(String::from("rig_chain_alpha_1")),
            RuntimeCall::Remove {
                name: String::from("rig_chain_alpha_1"),
                volumes: false,
            },
            RuntimeCall::Remove {
                name: String::from("rig_data_alpha_1"),
                volumes: true,
            },
        ]
    );
    assert!(lifecycle.runtime().container_names().is_empty());
}

#[rstest]
fn remove_without_container_is_a_notice(workspace: Workspace) {
    let lifecycle = workspace.lifecycle(FakeRuntime::new());
    let outcome = lifecycle
        .remove(WorkloadKind::Chain, "alpha", RemoveOptions::default())
        .expect("remove");
    assert!(matches!(outcome.notice(), Some(Notice::NotExisting { .. })));
    assert!(workspace.chain_file("alpha").exists());
}

#[rstest]
fn forced_remove_deletes_definition(workspace: Workspace) {
    let runtime = FakeRuntime::new();
    runtime.insert("rig_chain_alpha_1", "chain-image", true);
    let lifecycle = workspace.lifecycle(runtime);

    lifecycle
        .remove(
            WorkloadKind::Chain,
            "alpha",
            RemoveOptions {
                remove_data: false,
                force: true,
            },
        )
        .expect("remove");

    assert!(lifecycle.runtime().container_names().is_empty());
    assert!(!workspace.chain_file("alpha").exists());
    assert_eq!(
        lifecycle.state(WorkloadKind::Chain, "alpha").expect("state"),
        WorkloadState::Unknown
    );
}

#[rstest]
fn rename_moves_containers_and_file(workspace: Workspace) {
    with_data(&workspace);
    let runtime = FakeRuntime::new();
    runtime.insert("rig_chain_alpha_1", "chain-image", true);
    runtime.insert("rig_data_alpha_1", "busybox", false);
    let lifecycle = workspace.lifecycle(runtime);

    lifecycle
        .rename(WorkloadKind::Chain, "alpha", "beta")
        .expect("rename");

    assert_eq!(
        lifecycle.runtime().container_names(),
        vec!["rig_chain_beta_1", "rig_data_beta_1"]
    );
    assert!(lifecycle.runtime().is_running("rig_chain_beta_1"));
    assert!(!workspace.chain_file("alpha").exists());
    assert!(workspace.chain_file("beta").exists());
    assert_eq!(
        lifecycle.state(WorkloadKind::Chain, "beta").expect("state"),
        WorkloadState::Running
    );
    let error = lifecycle
        .cat(WorkloadKind::Chain, "alpha")
        .expect_err("old name gone");
    assert!(error.is_definition_not_found());
}

#[rstest]
#[case::same_name("alpha")]
#[case::existing_definition("beta")]
fn rename_refuses_occupied_targets(workspace: Workspace, #[case] target: &str) {
    workspace.write_chain("beta", "[service]\nimage = \"other\"\n");
    let lifecycle = workspace.lifecycle(FakeRuntime::new());
    let error = lifecycle
        .rename(WorkloadKind::Chain, "alpha", target)
        .expect_err("conflict");
    assert!(matches!(error, LifecycleError::RenameConflict { .. }));
    assert!(lifecycle.runtime().mutating_calls().is_empty());
    assert!(workspace.chain_file("alpha").exists());
}

#[rstest]
fn rename_refuses_taken_container_name(workspace: Workspace) {
    let runtime = FakeRuntime::new();
    runtime.insert("rig_chain_beta_1", "stray", false);
    let lifecycle = workspace.lifecycle(runtime);
    let error = lifecycle
        .rename(WorkloadKind::Chain, "alpha", "beta")
        .expect_err("conflict");
    assert!(matches!(error, LifecycleError::RenameConflict { .. }));
}

#[rstest]
#[case::running(true, true)]
#[case::stopped(false, false)]
fn update_recreates_and_restores_run_state(
    workspace: Workspace,
    #[case] running: bool,
    #[case] restarted: bool,
) {
    let runtime = FakeRuntime::new();
    runtime.insert("rig_chain_alpha_1", "chain-image", running);
    let lifecycle = workspace.lifecycle(runtime);

    lifecycle
        .update(WorkloadKind::Chain, "alpha", UpdateOptions { pull: true })
        .expect("update");

    let name = String::from("rig_chain_alpha_1");
    let mut expected = Vec::new();
    if running {
        expected.push(RuntimeCall::Stop(name.clone()));
    }
    expected.push(RuntimeCall::Remove {
        name: name.clone(),
        volumes: false,
    });
    expected.push(RuntimeCall::Pull(String::from("chain-image")));
    expected.push(RuntimeCall::Create(name.clone()));
    if restarted {
        expected.push(RuntimeCall::Start(name.clone()));
    }
    assert_eq!(lifecycle.runtime().mutating_calls(), expected);
    assert_eq!(lifecycle.runtime().is_running(&name), restarted);
}

#[rstest]
fn update_keeps_existing_data_container(workspace: Workspace) {
    with_data(&workspace);
    let runtime = FakeRuntime::new();
    runtime.insert("rig_chain_alpha_1", "chain-image", false);
    runtime.insert("rig_data_alpha_1", "busybox", false);
    let lifecycle = workspace.lifecycle(runtime);

    lifecycle
        .update(WorkloadKind::Chain, "alpha", UpdateOptions::default())
        .expect("update");

    assert!(
        !lifecycle
            .runtime()
            .mutating_calls()
            .iter()
            .any(|call| matches!(call, RuntimeCall::Remove { name, .. } if name == "rig_data_alpha_1"))
    );
}

#[rstest]
fn exec_requires_container(workspace: Workspace) {
    let lifecycle = workspace.lifecycle(FakeRuntime::new());
    let outcome = lifecycle
        .exec(WorkloadKind::Chain, "alpha", vec![String::from("ls")], false)
        .expect("exec");
    assert!(matches!(outcome.notice(), Some(Notice::NotExisting { .. })));
}

#[rstest]
fn exec_returns_command_status(workspace: Workspace) {
    let runtime = FakeRuntime::new();
    runtime.insert("rig_chain_alpha_1", "chain-image", true);
    runtime.set_exit_status(3);
    let lifecycle = workspace.lifecycle(runtime);
    let outcome = lifecycle
        .exec(WorkloadKind::Chain, "alpha", vec![String::from("ls")], true)
        .expect("exec");
    assert_eq!(outcome, Outcome::Done(3));
}

#[rstest]
fn inspect_selects_field(workspace: Workspace) {
    let runtime = FakeRuntime::new();
    runtime.insert("rig_chain_alpha_1", "chain-image", true);
    let lifecycle = workspace.lifecycle(runtime);

    let outcome = lifecycle
        .inspect(WorkloadKind::Chain, "alpha", "config.image")
        .expect("inspect");
    assert_eq!(outcome, Outcome::Done(json!("chain-image")));

    let error = lifecycle
        .inspect(WorkloadKind::Chain, "alpha", "config.missing")
        .expect_err("unknown field");
    assert!(matches!(error, LifecycleError::InspectField { .. }));
}

#[rstest]
fn lists_reflect_runtime_and_store(workspace: Workspace) {
    workspace.write_chain("beta", "[service]\nimage = \"other\"\n");
    let runtime = FakeRuntime::new();
    runtime.insert("rig_chain_alpha_1", "chain-image", true);
    runtime.insert("rig_chain_beta_1", "other", false);
    runtime.insert("rig_service_gamma_1", "svc", true);
    runtime.insert("someone_else", "x", true);
    let lifecycle = workspace.lifecycle(runtime);

    let known = lifecycle.list_known(WorkloadKind::Chain).expect("known");
    let existing = lifecycle.list_existing(WorkloadKind::Chain).expect("existing");
    let running = lifecycle.list_running(WorkloadKind::Chain).expect("running");

    assert_eq!(known.into_iter().collect::<Vec<_>>(), ["alpha", "beta"]);
    assert_eq!(existing.into_iter().collect::<Vec<_>>(), ["alpha", "beta"]);
    assert_eq!(running.into_iter().collect::<Vec<_>>(), ["alpha"]);
}

#[rstest]
fn unavailable_runtime_is_reported(workspace: Workspace) {
    let runtime = FakeRuntime::new();
    let down = RuntimeError::Unavailable {
        message: String::from("Cannot connect to the Docker daemon"),
        transient: true,
    };
    runtime.fail_next("ps", down.clone());
    runtime.fail_next("ps", down);
    let lifecycle = workspace.lifecycle(runtime);
    let error = lifecycle
        .start(WorkloadKind::Chain, "alpha", StartOptions::default())
        .expect_err("daemon down");
    assert!(matches!(error, LifecycleError::RuntimeUnavailable(_)));
    assert!(lifecycle.runtime().mutating_calls().is_empty());
}

#[rstest]
fn held_lock_makes_workload_busy(workspace: Workspace) {
    let lifecycle = workspace.lifecycle(FakeRuntime::new());
    let locks_dir = workspace.root.path().join(".locks");
    fs::create_dir_all(&locks_dir).expect("locks dir");
    let name = WorkloadName::new("alpha").expect("name");
    let _held = WorkloadLock::acquire(&locks_dir, WorkloadKind::Chain, &name).expect("lock");

    let error = lifecycle
        .start(WorkloadKind::Chain, "alpha", StartOptions::default())
        .expect_err("busy");
    assert!(matches!(error, LifecycleError::WorkloadBusy(_)));
}

#[rstest]
fn operations_target_the_configured_instance(workspace: Workspace) {
    let runtime = FakeRuntime::new();
    runtime.insert("rig_chain_alpha_1", "chain-image", true);
    let second = NonZeroU32::new(2).expect("non-zero");
    let lifecycle = workspace.lifecycle_for_instance(runtime, second);

    let stopped = lifecycle
        .stop(WorkloadKind::Chain, "alpha", StopOptions::default())
        .expect("stop");
    assert!(matches!(stopped.notice(), Some(Notice::NotRunning { .. })));

    let started = lifecycle
        .start(WorkloadKind::Chain, "alpha", StartOptions::default())
        .expect("start");
    assert_eq!(started, Outcome::Done(()));
    assert!(lifecycle.runtime().is_running("rig_chain_alpha_2"));
    assert!(lifecycle.runtime().is_running("rig_chain_alpha_1"));
}

/// Editor double that replaces the file contents.
struct RewritingEditor {
    contents: &'static str,
}

impl DefinitionEditor for RewritingEditor {
    fn edit(&self, path: &std::path::Path) -> Result<(), EditorError> {
        fs::write(path, self.contents).expect("rewrite definition");
        Ok(())
    }
}

struct FailingEditor;

impl DefinitionEditor for FailingEditor {
    fn edit(&self, _path: &std::path::Path) -> Result<(), EditorError> {
        Err(EditorError::Exited {
            program: String::from("vi"),
            status: 1,
        })
    }
}

#[rstest]
fn edit_reloads_the_rewritten_definition(workspace: Workspace) {
    let lifecycle = workspace.lifecycle(FakeRuntime::new());
    let editor = RewritingEditor {
        contents: "[service]\nimage = \"edited-image\"\n",
    };
    let path = lifecycle
        .edit(WorkloadKind::Chain, "alpha", &editor)
        .expect("edit");
    assert_eq!(path, workspace.chain_file("alpha"));
    let definition = lifecycle
        .store(WorkloadKind::Chain)
        .load(&WorkloadName::new("alpha").expect("name"))
        .expect("reload");
    assert_eq!(definition.image(), "edited-image");
    assert!(lifecycle.runtime().calls().is_empty());
}

#[rstest]
fn edit_reports_an_invalid_result_and_keeps_it(workspace: Workspace) {
    let lifecycle = workspace.lifecycle(FakeRuntime::new());
    let editor = RewritingEditor {
        contents: "[service]\n",
    };
    let error = lifecycle
        .edit(WorkloadKind::Chain, "alpha", &editor)
        .expect_err("image removed");
    assert!(matches!(
        error,
        LifecycleError::Definition(DefinitionError::Invalid { .. })
    ));
    assert_eq!(
        fs::read_to_string(workspace.chain_file("alpha")).expect("file kept"),
        "[service]\n"
    );
}

#[rstest]
#[case::editor_failure("alpha")]
#[case::missing_definition("ghost")]
fn edit_failures_leave_files_alone(workspace: Workspace, #[case] name: &str) {
    let lifecycle = workspace.lifecycle(FakeRuntime::new());
    let error = lifecycle
        .edit(WorkloadKind::Chain, name, &FailingEditor)
        .expect_err("edit fails");
    match name {
        "alpha" => assert!(matches!(error, LifecycleError::Editor(_))),
        _ => assert!(error.is_definition_not_found()),
    }
    assert_eq!(
        fs::read_to_string(workspace.chain_file("alpha")).expect("file kept"),
        "[service]\nimage = \"chain-image\"\n"
    );
}

#[rstest]
fn graduate_lays_down_a_service_definition(workspace: Workspace) {
    with_data(&workspace);
    let lifecycle = workspace.lifecycle(FakeRuntime::new());
    let path = lifecycle.graduate("alpha").expect("graduate");
    assert_eq!(path, workspace.root.path().join("services/alpha.toml"));

    let name = WorkloadName::new("alpha").expect("name");
    let service = lifecycle
        .store(WorkloadKind::Service)
        .load(&name)
        .expect("service loads");
    assert_eq!(service.image(), "chain-image");
    assert!(service.wants_data_container());
    assert_eq!(
        service.document().extra.get(GRADUATED_FROM_KEY),
        Some(&json!("alpha"))
    );
    assert!(workspace.chain_file("alpha").exists());
    assert!(lifecycle.runtime().mutating_calls().is_empty());

    lifecycle
        .start(WorkloadKind::Service, "alpha", StartOptions::default())
        .expect("service starts");
    assert!(lifecycle.runtime().is_running("rig_service_alpha_1"));
    let spec = lifecycle
        .runtime()
        .container("rig_service_alpha_1")
        .expect("service container")
        .spec;
    assert_eq!(spec.volumes_from, vec![String::from("rig_data_alpha_1")]);
}

#[rstest]
fn graduate_refuses_an_existing_service(workspace: Workspace) {
    let services = workspace.root.path().join("services");
    fs::create_dir_all(&services).expect("services dir");
    fs::write(services.join("alpha.yaml"), "service:\n  image: svc\n").expect("service file");
    let lifecycle = workspace.lifecycle(FakeRuntime::new());
    let error = lifecycle.graduate("alpha").expect_err("already a service");
    assert!(matches!(
        error,
        LifecycleError::DefinitionExists { kind: WorkloadKind::Service, ref name, .. } if name == "alpha"
    ));
    assert!(!services.join("alpha.toml").exists());
}
