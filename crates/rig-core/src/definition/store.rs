//! Filesystem-backed definition storage for one workload kind.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rig_config::WorkloadPaths;
use tracing::debug;

use super::document::DefinitionDocument;
use super::error::DefinitionError;
use super::format::{DefinitionFormat, SEARCH_ORDER};
use super::WorkloadDefinition;
use crate::identity::{WorkloadKind, WorkloadName};

const STORE_TARGET: &str = "rig_core::definition";

/// Resolves, loads and persists definitions in a single search directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionStore {
    kind: WorkloadKind,
    directory: PathBuf,
}

impl DefinitionStore {
    /// Creates a store searching `directory` for definitions of `kind`.
    #[must_use]
    pub fn new(kind: WorkloadKind, directory: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            directory: directory.into(),
        }
    }

    /// Creates the store for `kind` inside the configured workload tree.
    #[must_use]
    pub fn for_kind(paths: &WorkloadPaths, kind: WorkloadKind) -> Self {
        let directory = match kind {
            WorkloadKind::Chain => paths.chains_dir(),
            WorkloadKind::Service => paths.services_dir(),
        };
        Self::new(kind, directory)
    }

    /// Kind of workload this store holds.
    #[must_use]
    pub const fn kind(&self) -> WorkloadKind {
        self.kind
    }

    /// Directory searched for definition files.
    #[must_use]
    pub fn directory(&self) -> &Path {
        self.directory.as_path()
    }

    /// Returns the file backing `name`, honouring the extension precedence.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::NotFound`] when no supported file exists.
    pub fn locate(&self, name: &WorkloadName) -> Result<PathBuf, DefinitionError> {
        SEARCH_ORDER
            .iter()
            .map(|(extension, _)| self.directory.join(format!("{name}.{extension}")))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| DefinitionError::NotFound {
                kind: self.kind,
                name: name.to_string(),
                directory: self.directory.clone(),
            })
    }

    /// Reports whether any file backs `name`.
    #[must_use]
    pub fn contains(&self, name: &WorkloadName) -> bool {
        self.locate(name).is_ok()
    }

    /// Loads and validates the definition backing `name`.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::NotFound`] when no file matches,
    /// [`DefinitionError::Malformed`] when the file does not parse and
    /// [`DefinitionError::Invalid`] when a required field is missing.
    pub fn load(&self, name: &WorkloadName) -> Result<WorkloadDefinition, DefinitionError> {
        let path = self.locate(name)?;
        let format = DefinitionFormat::from_path(&path).ok_or_else(|| {
            DefinitionError::UnsupportedFormat { path: path.clone() }
        })?;
        let text = fs::read_to_string(&path).map_err(|error| DefinitionError::io(&path, error))?;
        let mut document = format
            .parse(&text)
            .map_err(|message| DefinitionError::Malformed {
                path: path.clone(),
                format,
                message,
            })?;
        document.resolve_names(name.as_str());
        debug!(
            target: STORE_TARGET,
            kind = %self.kind,
            name = %name,
            file = %path.display(),
            "loaded definition"
        );
        WorkloadDefinition::from_document(self.kind, document, path)
    }

    /// Returns the raw text of the file backing `name`.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::NotFound`] when no file matches and
    /// [`DefinitionError::Io`] when it cannot be read.
    pub fn read_raw(&self, name: &WorkloadName) -> Result<String, DefinitionError> {
        let path = self.locate(name)?;
        fs::read_to_string(&path).map_err(|error| DefinitionError::io(&path, error))
    }

    /// Serialises `document` to `path` in the format its extension implies.
    ///
    /// Parent directories are created and existing files are overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::UnsupportedFormat`] for unknown extensions,
    /// [`DefinitionError::Render`] when serialisation fails and
    /// [`DefinitionError::Io`] when the file cannot be written.
    pub fn write(&self, document: &DefinitionDocument, path: &Path) -> Result<(), DefinitionError> {
        let format = DefinitionFormat::from_path(path).ok_or_else(|| {
            DefinitionError::UnsupportedFormat {
                path: path.to_path_buf(),
            }
        })?;
        let text = format
            .render(document)
            .map_err(|message| DefinitionError::Render {
                path: path.to_path_buf(),
                format,
                message,
            })?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|error| DefinitionError::io(parent, error))?;
        }
        fs::write(path, text).map_err(|error| DefinitionError::io(path, error))?;
        debug!(
            target: STORE_TARGET,
            kind = %self.kind,
            file = %path.display(),
            "wrote definition"
        );
        Ok(())
    }

    /// Lists the names of every definition file, sorted and deduplicated.
    ///
    /// A missing directory yields an empty set.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::Io`] when the directory cannot be read.
    pub fn list(&self) -> Result<BTreeSet<String>, DefinitionError> {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(error) => return Err(DefinitionError::io(&self.directory, error)),
        };
        let mut names = BTreeSet::new();
        for entry in entries {
            let path = entry
                .map_err(|error| DefinitionError::io(&self.directory, error))?
                .path();
            if !path.is_file() || DefinitionFormat::from_path(&path).is_none() {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.insert(stem.to_owned());
            }
        }
        Ok(names)
    }

    /// Removes a definition file. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::Io`] when removal fails for another reason.
    pub fn delete(&self, path: &Path) -> Result<(), DefinitionError> {
        match fs::remove_file(path) {
            Ok(()) => {
                debug!(
                    target: STORE_TARGET,
                    kind = %self.kind,
                    file = %path.display(),
                    "deleted definition"
                );
                Ok(())
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(DefinitionError::io(path, error)),
        }
    }

    /// Path a definition renamed to `new_name` is written to.
    ///
    /// The file stays in the same directory and keeps its extension.
    #[must_use]
    pub fn sibling_path(path: &Path, new_name: &WorkloadName) -> PathBuf {
        let file_name = match path.extension().and_then(|ext| ext.to_str()) {
            Some(extension) => format!("{new_name}.{extension}"),
            None => new_name.to_string(),
        };
        path.with_file_name(file_name)
    }
}
