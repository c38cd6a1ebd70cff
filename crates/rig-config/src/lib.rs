//! Layered configuration shared by the `rig` binary and its core library.
//!
//! Values are resolved from built-in defaults, configuration files
//! (`--config-path` or `RIG_CONFIG_PATH`), `RIG_*` environment variables and
//! command-line flags, in increasing order of precedence. The resolved
//! [`Config`] is an explicit value threaded through every call; nothing here
//! installs process-wide state.

use std::num::NonZeroU32;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod defaults;
mod logging;
mod paths;

pub use defaults::{
    DEFAULT_CONTAINER_PREFIX, DEFAULT_DATA_IMAGE, DEFAULT_DOCKER_BINARY, DEFAULT_EDITOR,
    DEFAULT_INSTANCE, DEFAULT_LOG_FILTER, DEFAULT_ROOT_DIR_NAME, DEFAULT_RUNTIME_RETRIES,
    DEFAULT_RUNTIME_TIMEOUT_SECS, default_container_prefix, default_data_image,
    default_docker_binary, default_instance, default_log_filter, default_log_filter_string,
    default_log_format, default_root_dir, default_runtime_retries, default_runtime_timeout_secs,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use paths::{WorkloadPaths, WorkloadPathsError};

/// Resolved configuration for a single `rig` invocation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "RIG")]
pub struct Config {
    /// Root of the workload tree holding definitions and lock files.
    #[serde(default = "default_root_dir")]
    pub root_dir: Utf8PathBuf,
    /// Prefix shared by every managed container name.
    #[serde(default = "default_container_prefix")]
    pub container_prefix: String,
    /// Instance number encoded into container names.
    #[serde(default = "default_instance")]
    pub instance: NonZeroU32,
    /// Executable used to drive the container runtime.
    #[serde(default = "default_docker_binary")]
    pub docker_binary: String,
    /// Upper bound, in seconds, for a single runtime control call.
    #[serde(default = "default_runtime_timeout_secs")]
    pub runtime_timeout_secs: u64,
    /// Attempts made for read-only runtime queries that fail transiently.
    #[serde(default = "default_runtime_retries")]
    pub runtime_retries: u32,
    /// Image used when creating companion data containers.
    #[serde(default = "default_data_image")]
    pub data_image: String,
    /// `tracing` filter expression.
    #[serde(default = "default_log_filter_string")]
    pub log_filter: String,
    /// Output format for log records.
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
    /// Editor command used to edit definition files. Falls back to
    /// `$VISUAL`, then `$EDITOR`, then [`DEFAULT_EDITOR`].
    #[serde(default)]
    pub editor: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            container_prefix: default_container_prefix(),
            instance: default_instance(),
            docker_binary: default_docker_binary(),
            runtime_timeout_secs: default_runtime_timeout_secs(),
            runtime_retries: default_runtime_retries(),
            data_image: default_data_image(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            editor: None,
        }
    }
}

impl Config {
    /// Root of the workload tree.
    #[must_use]
    pub fn root_dir(&self) -> &Utf8Path {
        self.root_dir.as_path()
    }

    /// Prefix shared by every managed container name.
    #[must_use]
    pub fn container_prefix(&self) -> &str {
        self.container_prefix.as_str()
    }

    /// Instance number encoded into container names.
    #[must_use]
    pub const fn instance(&self) -> NonZeroU32 {
        self.instance
    }

    /// Executable used to drive the container runtime.
    #[must_use]
    pub fn docker_binary(&self) -> &str {
        self.docker_binary.as_str()
    }

    /// Upper bound for a single runtime control call.
    #[must_use]
    pub const fn runtime_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.runtime_timeout_secs)
    }

    /// Attempts made for read-only runtime queries, never less than one.
    #[must_use]
    pub fn runtime_attempts(&self) -> u32 {
        self.runtime_retries.max(1)
    }

    /// Image used when creating companion data containers.
    #[must_use]
    pub fn data_image(&self) -> &str {
        self.data_image.as_str()
    }

    /// `tracing` filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Output format for log records.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Editor command configured explicitly, if any.
    #[must_use]
    pub fn editor(&self) -> Option<&str> {
        self.editor.as_deref().filter(|command| !command.trim().is_empty())
    }
}
