//! Extension-driven dispatch between the supported definition formats.

use std::fmt;
use std::path::Path;

use super::document::DefinitionDocument;

/// Serialisation formats accepted for definition files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionFormat {
    /// `.json` files.
    Json,
    /// `.toml` files.
    Toml,
    /// `.yaml` and `.yml` files.
    Yaml,
}

/// Extensions tried when resolving a name, in precedence order.
pub const SEARCH_ORDER: [(&str, DefinitionFormat); 4] = [
    ("json", DefinitionFormat::Json),
    ("toml", DefinitionFormat::Toml),
    ("yaml", DefinitionFormat::Yaml),
    ("yml", DefinitionFormat::Yaml),
];

impl DefinitionFormat {
    /// Maps a file extension onto a format.
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        SEARCH_ORDER
            .iter()
            .find(|(candidate, _)| *candidate == extension)
            .map(|(_, format)| *format)
    }

    /// Determines the format implied by a path's extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Parses document text in this format.
    pub(crate) fn parse(self, text: &str) -> Result<DefinitionDocument, String> {
        match self {
            Self::Json => serde_json::from_str(text).map_err(|error| error.to_string()),
            Self::Toml => toml::from_str(text).map_err(|error| error.to_string()),
            Self::Yaml => serde_saphyr::from_str(text).map_err(|error| error.to_string()),
        }
    }

    /// Renders a document in this format.
    pub(crate) fn render(self, document: &DefinitionDocument) -> Result<String, String> {
        match self {
            Self::Json => serde_json::to_string_pretty(document)
                .map(|mut text| {
                    text.push('\n');
                    text
                })
                .map_err(|error| error.to_string()),
            Self::Toml => toml::to_string_pretty(document).map_err(|error| error.to_string()),
            Self::Yaml => serde_saphyr::to_string(document).map_err(|error| error.to_string()),
        }
    }
}

impl fmt::Display for DefinitionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "JSON",
            Self::Toml => "TOML",
            Self::Yaml => "YAML",
        })
    }
}
