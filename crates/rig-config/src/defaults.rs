use std::env;
use std::num::NonZeroU32;

use camino::Utf8PathBuf;
use dirs::home_dir;

use crate::logging::LogFormat;

/// Directory name appended to the home directory for the workload tree.
pub const DEFAULT_ROOT_DIR_NAME: &str = ".rig";

/// Prefix shared by every container the tool manages.
pub const DEFAULT_CONTAINER_PREFIX: &str = "rig";

/// Instance number used when none is configured.
pub const DEFAULT_INSTANCE: NonZeroU32 = NonZeroU32::MIN;

/// Executable used to talk to the container runtime.
pub const DEFAULT_DOCKER_BINARY: &str = "docker";

/// Upper bound for a single runtime control call.
pub const DEFAULT_RUNTIME_TIMEOUT_SECS: u64 = 60;

/// Attempts made for read-only runtime queries that fail transiently.
pub const DEFAULT_RUNTIME_RETRIES: u32 = 2;

/// Image backing companion data containers.
pub const DEFAULT_DATA_IMAGE: &str = "busybox";

/// Editor used when neither the configuration nor the environment names one.
pub const DEFAULT_EDITOR: &str = "vi";

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Computes the default workload tree root.
///
/// Falls back to the temporary directory when no home directory is known or
/// when it is not valid UTF-8.
pub fn default_root_dir() -> Utf8PathBuf {
    let base = home_dir()
        .and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
        .unwrap_or_else(fallback_base_directory);
    base.join(DEFAULT_ROOT_DIR_NAME)
}

fn fallback_base_directory() -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(env::temp_dir()).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}

/// Owned container prefix used where allocation is required (e.g. serde).
pub fn default_container_prefix() -> String {
    DEFAULT_CONTAINER_PREFIX.to_owned()
}

/// Default instance number.
pub const fn default_instance() -> NonZeroU32 {
    DEFAULT_INSTANCE
}

/// Owned runtime client executable name.
pub fn default_docker_binary() -> String {
    DEFAULT_DOCKER_BINARY.to_owned()
}

/// Default timeout for runtime control calls, in seconds.
pub const fn default_runtime_timeout_secs() -> u64 {
    DEFAULT_RUNTIME_TIMEOUT_SECS
}

/// Default attempt budget for transient read-only failures.
pub const fn default_runtime_retries() -> u32 {
    DEFAULT_RUNTIME_RETRIES
}

/// Owned data image reference.
pub fn default_data_image() -> String {
    DEFAULT_DATA_IMAGE.to_owned()
}

/// Default log filter expression used by the binary.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binary.
pub fn default_log_format() -> LogFormat {
    LogFormat::Compact
}
