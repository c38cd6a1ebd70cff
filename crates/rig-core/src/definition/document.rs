//! Serialisable shape of a workload definition file.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level key naming the chain a service was graduated from.
pub const GRADUATED_FROM_KEY: &str = "chain";

/// Top-level definition document as stored on disk.
///
/// Keys this type does not model are captured in [`Self::extra`] and written
/// back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefinitionDocument {
    /// Logical name; defaults to the file stem when blank.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Free-form description shown to operators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Container settings for the workload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceSection>,
    /// Unmodelled top-level keys.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Container settings nested under the `service` key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceSection {
    /// Identity field; regenerated from the document name when blank.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Image reference the container is created from.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,
    /// Creates a companion data container alongside the primary.
    #[serde(default, skip_serializing_if = "is_false")]
    pub data_container: bool,
    /// Publishes every exposed port on start.
    #[serde(default, skip_serializing_if = "is_false")]
    pub publish_all_ports: bool,
    /// Port mappings in `host:container` form.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    /// Environment entries in `KEY=value` form.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment: Vec<String>,
    /// Volume mappings in `host:container` form.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    /// Command passed to the image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<CommandLine>,
    /// Entrypoint override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,
    /// User the container runs as.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Working directory inside the container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workdir: Option<String>,
    /// Unmodelled service keys.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Command given either as one line or as an argument list.
///
/// A line is split on whitespace and has no quoting, so `sh -c 'a b'` must be
/// written as the list `["sh", "-c", "a b"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandLine {
    /// Whitespace-separated command line.
    Line(String),
    /// Arguments passed through unchanged.
    Args(Vec<String>),
}

impl CommandLine {
    /// Argument vector handed to the runtime.
    #[must_use]
    pub fn argv(&self) -> Vec<String> {
        match self {
            Self::Line(line) => line.split_whitespace().map(str::to_owned).collect(),
            Self::Args(args) => args.clone(),
        }
    }
}

#[expect(
    clippy::trivially_copy_pass_by_ref,
    reason = "serde skip_serializing_if passes fields by reference"
)]
const fn is_false(value: &bool) -> bool {
    !*value
}

impl DefinitionDocument {
    /// Builds a minimal document naming an image.
    #[must_use]
    pub fn with_image(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            service: Some(ServiceSection {
                image: image.into(),
                ..ServiceSection::default()
            }),
            ..Self::default()
        }
    }

    /// Fills blank identity fields following the loading rules.
    ///
    /// `name` falls back to `stem`, `service.name` falls back to `name`, and
    /// when both remain blank the image with `/` replaced by `_` is used.
    pub fn resolve_names(&mut self, stem: &str) {
        if self.name.is_empty() {
            stem.clone_into(&mut self.name);
        }
        let top_level = self.name.clone();
        if let Some(service) = self.service.as_mut()
            && service.name.is_empty()
        {
            service.name = if top_level.is_empty() {
                service.image.replace('/', "_")
            } else {
                top_level
            };
        }
    }

    /// Turns a chain document into the service document graduated from it.
    ///
    /// The identity field is cleared and the originating chain is recorded
    /// under the top-level `chain` key.
    pub fn graduate_from_chain(&mut self, chain: &str) {
        self.rename_to(chain);
        self.extra
            .insert(String::from(GRADUATED_FROM_KEY), Value::String(chain.to_owned()));
    }

    /// Prepares the document for storage under a new name.
    ///
    /// The identity field is cleared so it regenerates on the next load.
    pub fn rename_to(&mut self, new_name: &str) {
        new_name.clone_into(&mut self.name);
        if let Some(service) = self.service.as_mut() {
            service.name.clear();
        }
    }
}
