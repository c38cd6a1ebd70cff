//! Workload definitions and the store that persists them.
//!
//! A definition file is looked up by name in the directory for its kind. The
//! first file found in `json`, `toml`, `yaml`, `yml` order wins, is parsed
//! according to its extension, and is validated into a
//! [`WorkloadDefinition`] before any runtime call is made.

mod document;
mod error;
mod format;
mod store;

use std::path::{Path, PathBuf};

pub use self::document::{CommandLine, DefinitionDocument, GRADUATED_FROM_KEY, ServiceSection};
pub use self::error::DefinitionError;
pub use self::format::{DefinitionFormat, SEARCH_ORDER};
pub use self::store::DefinitionStore;

use crate::identity::{WorkloadKind, WorkloadName};

/// Validated definition with its identity resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadDefinition {
    kind: WorkloadKind,
    name: WorkloadName,
    path: PathBuf,
    document: DefinitionDocument,
}

impl WorkloadDefinition {
    /// Validates a document whose names have already been resolved.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::Invalid`] when the `service` section or its
    /// image is missing, or when the resolved name is not a valid workload
    /// name.
    pub fn from_document(
        kind: WorkloadKind,
        document: DefinitionDocument,
        path: impl Into<PathBuf>,
    ) -> Result<Self, DefinitionError> {
        let path = path.into();
        let invalid = |reason: String| DefinitionError::Invalid {
            path: path.clone(),
            reason,
        };
        let service = document
            .service
            .as_ref()
            .ok_or_else(|| invalid(String::from("a [service] section is required")))?;
        if service.image.trim().is_empty() {
            return Err(invalid(String::from(
                "an \"image\" field is required in the service section",
            )));
        }
        let name = WorkloadName::new(service.name.as_str())
            .map_err(|error| invalid(error.to_string()))?;
        Ok(Self {
            kind,
            name,
            path,
            document,
        })
    }

    /// Kind of workload described.
    #[must_use]
    pub const fn kind(&self) -> WorkloadKind {
        self.kind
    }

    /// Logical name used for container identity.
    #[must_use]
    pub const fn name(&self) -> &WorkloadName {
        &self.name
    }

    /// File the definition was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Parsed document with names resolved.
    #[must_use]
    pub const fn document(&self) -> &DefinitionDocument {
        &self.document
    }

    /// Consumes the definition, returning its document.
    #[must_use]
    pub fn into_document(self) -> DefinitionDocument {
        self.document
    }

    /// Container settings. Always present on a validated definition.
    #[must_use]
    pub fn service(&self) -> ServiceSection {
        self.document.service.clone().unwrap_or_default()
    }

    /// Image reference the container is created from.
    #[must_use]
    pub fn image(&self) -> &str {
        self.document
            .service
            .as_ref()
            .map_or("", |service| service.image.as_str())
    }

    /// Whether a companion data container is requested.
    #[must_use]
    pub fn wants_data_container(&self) -> bool {
        self.document
            .service
            .as_ref()
            .is_some_and(|service| service.data_container)
    }
}
