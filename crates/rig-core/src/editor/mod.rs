//! Opening definition files in the operator's editor.
//!
//! [`CommandEditor`] runs the configured editor attached to the caller's
//! terminal through a [`CommandRunner`], so tests can substitute a scripted
//! runner. The editor command is taken from the configuration, then
//! `$VISUAL`, then `$EDITOR`, then [`DEFAULT_EDITOR`]. It may carry its own
//! arguments (`code --wait`); the file path is appended last.

use std::path::Path;

use rig_config::{Config, DEFAULT_EDITOR};
use thiserror::Error;
use tracing::debug;

use crate::runtime::{CommandRunner, Invocation, ProcessRunner, RuntimeError};

const EDITOR_TARGET: &str = "rig_core::editor";

/// Opens a file for interactive editing and returns once editing is done.
pub trait DefinitionEditor {
    /// Edits the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError`] when the editor cannot be launched or does
    /// not exit cleanly.
    fn edit(&self, path: &Path) -> Result<(), EditorError>;
}

impl<T: DefinitionEditor + ?Sized> DefinitionEditor for &T {
    fn edit(&self, path: &Path) -> Result<(), EditorError> {
        (**self).edit(path)
    }
}

/// Errors raised while running the editor.
#[derive(Debug, Clone, Error)]
pub enum EditorError {
    /// The editor command was blank.
    #[error("no editor command is configured")]
    Unconfigured,
    /// The editor could not be started.
    #[error("failed to launch editor '{program}': {source}")]
    Launch {
        /// Editor executable.
        program: String,
        /// Spawn failure.
        #[source]
        source: RuntimeError,
    },
    /// The editor exited unsuccessfully.
    #[error("editor '{program}' exited with status {status}")]
    Exited {
        /// Editor executable.
        program: String,
        /// Exit status reported by the editor.
        status: i32,
    },
}

/// [`DefinitionEditor`] that launches an external editor command.
#[derive(Debug, Clone)]
pub struct CommandEditor<R = ProcessRunner> {
    command: Vec<String>,
    runner: R,
}

impl CommandEditor<ProcessRunner> {
    /// Resolves the editor from the configuration and the environment.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let command = resolve_editor_command(config.editor(), |key| std::env::var(key).ok());
        Self::with_runner(command, ProcessRunner)
    }
}

impl<R: CommandRunner> CommandEditor<R> {
    /// Creates an editor from a resolved command line and a runner.
    #[must_use]
    pub fn with_runner(command: impl Into<String>, runner: R) -> Self {
        let command = command
            .into()
            .split_whitespace()
            .map(str::to_owned)
            .collect();
        Self { command, runner }
    }

    /// Editor executable and its leading arguments.
    #[must_use]
    pub fn command(&self) -> &[String] {
        &self.command
    }
}

impl<R: CommandRunner> DefinitionEditor for CommandEditor<R> {
    fn edit(&self, path: &Path) -> Result<(), EditorError> {
        let Some((program, args)) = self.command.split_first() else {
            return Err(EditorError::Unconfigured);
        };
        let invocation = Invocation::new(program.as_str(), "edit")
            .args(args.iter().cloned())
            .arg(path.to_string_lossy());
        debug!(target: EDITOR_TARGET, %program, file = %path.display(), "opening editor");
        let status = self
            .runner
            .attach(&invocation)
            .map_err(|source| EditorError::Launch {
                program: program.clone(),
                source,
            })?;
        if status == 0 {
            Ok(())
        } else {
            Err(EditorError::Exited {
                program: program.clone(),
                status,
            })
        }
    }
}

/// Picks the editor command: `configured`, then `$VISUAL`, then `$EDITOR`,
/// then [`DEFAULT_EDITOR`]. Blank values are skipped.
pub fn resolve_editor_command(
    configured: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> String {
    configured
        .map(str::to_owned)
        .into_iter()
        .chain(env("VISUAL"))
        .chain(env("EDITOR"))
        .find(|command| !command.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_EDITOR.to_owned())
}

#[cfg(test)]
mod tests;
