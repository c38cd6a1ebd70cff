//! Derives the workload tree layout shared by the CLI and the core.
//!
//! The tree root holds one definition directory per workload kind and a
//! hidden directory of advisory lock files. Every component that touches the
//! filesystem derives its paths from here so they agree on the layout.

use std::fs::DirBuilder;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::Config;

const CHAINS_DIR: &str = "chains";
const SERVICES_DIR: &str = "services";
const LOCKS_DIR: &str = ".locks";

/// Canonical paths inside the workload tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadPaths {
    root_dir: PathBuf,
    chains_dir: PathBuf,
    services_dir: PathBuf,
    locks_dir: PathBuf,
}

impl WorkloadPaths {
    /// Derives the tree layout from the shared configuration.
    ///
    /// # Errors
    ///
    /// Returns [`WorkloadPathsError::EmptyRoot`] when the configured root is
    /// blank.
    pub fn from_config(config: &Config) -> Result<Self, WorkloadPathsError> {
        Self::from_root(config.root_dir().as_std_path())
    }

    /// Derives the tree layout below an explicit root directory.
    ///
    /// # Errors
    ///
    /// Returns [`WorkloadPathsError::EmptyRoot`] when `root` is empty.
    pub fn from_root(root: &Path) -> Result<Self, WorkloadPathsError> {
        if root.as_os_str().is_empty() {
            return Err(WorkloadPathsError::EmptyRoot);
        }
        let root_dir = root.to_path_buf();
        Ok(Self {
            chains_dir: root_dir.join(CHAINS_DIR),
            services_dir: root_dir.join(SERVICES_DIR),
            locks_dir: root_dir.join(LOCKS_DIR),
            root_dir,
        })
    }

    /// Root of the workload tree.
    #[must_use]
    pub fn root_dir(&self) -> &Path {
        self.root_dir.as_path()
    }

    /// Directory holding chain definition files.
    #[must_use]
    pub fn chains_dir(&self) -> &Path {
        self.chains_dir.as_path()
    }

    /// Directory holding service definition files.
    #[must_use]
    pub fn services_dir(&self) -> &Path {
        self.services_dir.as_path()
    }

    /// Directory holding per-workload advisory lock files.
    #[must_use]
    pub fn locks_dir(&self) -> &Path {
        self.locks_dir.as_path()
    }

    /// Creates the lock directory with restrictive permissions.
    ///
    /// # Errors
    ///
    /// Returns [`WorkloadPathsError::CreateDirectory`] when the directory
    /// cannot be created.
    pub fn prepare_locks_dir(&self) -> Result<&Path, WorkloadPathsError> {
        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        builder
            .create(&self.locks_dir)
            .map_err(|source| WorkloadPathsError::CreateDirectory {
                path: self.locks_dir.clone(),
                source,
            })?;
        Ok(self.locks_dir())
    }
}

/// Errors raised while deriving the workload tree layout.
#[derive(Debug, Error)]
pub enum WorkloadPathsError {
    /// The configured root directory was blank.
    #[error("the workload root directory must not be empty")]
    EmptyRoot,
    /// Creating a directory inside the tree failed.
    #[error("failed to prepare directory '{path}': {source}")]
    CreateDirectory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}
