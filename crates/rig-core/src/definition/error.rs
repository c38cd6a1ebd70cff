use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use super::format::DefinitionFormat;
use crate::identity::WorkloadKind;

/// Errors raised while resolving, reading or writing definition files.
#[derive(Debug, Clone, Error)]
pub enum DefinitionError {
    /// No file in the search directory backs the requested name.
    #[error("no {kind} definition named '{name}' in {}", directory.display())]
    NotFound {
        /// Kind that was searched.
        kind: WorkloadKind,
        /// Name that was requested.
        name: String,
        /// Directory that was searched.
        directory: PathBuf,
    },

    /// The file parsed but a required field is absent or unusable.
    #[error("definition {} is invalid: {reason}", path.display())]
    Invalid {
        /// File that failed validation.
        path: PathBuf,
        /// Description of the violated requirement.
        reason: String,
    },

    /// The file could not be parsed in the format its extension implies.
    #[error("failed to parse {format} definition {}: {message}", path.display())]
    Malformed {
        /// File that failed to parse.
        path: PathBuf,
        /// Format implied by the extension.
        format: DefinitionFormat,
        /// Parser diagnostic.
        message: String,
    },

    /// The document could not be rendered in the requested format.
    #[error("failed to render {format} definition {}: {message}", path.display())]
    Render {
        /// Destination file.
        path: PathBuf,
        /// Format implied by the extension.
        format: DefinitionFormat,
        /// Serialiser diagnostic.
        message: String,
    },

    /// The destination path carries no supported extension.
    #[error("cannot infer a definition format from {}", path.display())]
    UnsupportedFormat {
        /// Path without a supported extension.
        path: PathBuf,
    },

    /// A filesystem operation failed.
    #[error("definition I/O failed for {}: {source}", path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl DefinitionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }
}
