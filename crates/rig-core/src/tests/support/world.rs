//! Scenario world pairing a temporary workload tree with an in-memory runtime.

use std::cell::RefCell;
use std::fs;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

use rig_config::WorkloadPaths;
use tempfile::TempDir;

use crate::identity::{Naming, WorkloadKind};
use crate::lifecycle::{Lifecycle, LifecycleError, Outcome};
use crate::runtime::RetryPolicy;
use crate::test_support::FakeRuntime;

/// Scenario world shared across BDD steps.
pub struct LifecycleWorld {
    root: TempDir,
    lifecycle: Lifecycle<FakeRuntime>,
    last: Option<Result<Outcome, LifecycleError>>,
}

impl LifecycleWorld {
    /// Builds a world with an empty tree and no containers.
    #[must_use]
    pub fn new() -> Self {
        let root = TempDir::new().expect("temp dir");
        let naming = Naming::new("rig", NonZeroU32::MIN).expect("naming");
        let paths = WorkloadPaths::from_root(root.path()).expect("paths");
        let lifecycle = Lifecycle::new(FakeRuntime::new(), naming, paths)
            .with_retry(RetryPolicy::new(1, Duration::ZERO));
        Self {
            root,
            lifecycle,
            last: None,
        }
    }

    /// Path of the TOML definition for `name`.
    #[must_use]
    pub fn definition_path(&self, kind: WorkloadKind, name: &str) -> PathBuf {
        self.root
            .path()
            .join(kind.plural())
            .join(format!("{name}.toml"))
    }

    /// Writes a minimal definition naming `image`.
    pub fn define(&self, kind: WorkloadKind, name: &str, image: &str) {
        let path = self.definition_path(kind, name);
        let parent = path.parent().expect("definition directory");
        fs::create_dir_all(parent).expect("create definition directory");
        fs::write(&path, format!("[service]\nimage = \"{image}\"\n")).expect("write definition");
    }

    /// Orchestrator under test.
    #[must_use]
    pub const fn lifecycle(&self) -> &Lifecycle<FakeRuntime> {
        &self.lifecycle
    }

    /// In-memory runtime backing the orchestrator.
    #[must_use]
    pub const fn runtime(&self) -> &FakeRuntime {
        self.lifecycle.runtime()
    }

    /// Records the result of the latest operation.
    pub fn record(&mut self, result: Result<Outcome, LifecycleError>) {
        self.last = Some(result);
    }

    /// Result of the latest operation.
    #[must_use]
    pub fn last(&self) -> Option<&Result<Outcome, LifecycleError>> {
        self.last.as_ref()
    }
}

/// Fixture constructor used by the step definitions.
pub fn world() -> RefCell<LifecycleWorld> {
    RefCell::new(LifecycleWorld::new())
}
