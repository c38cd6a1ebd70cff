//! Log record formats understood by the `rig` binary.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Layout used when writing log records to stderr.
///
/// Parsing ignores ASCII case so `JSON`, `Json` and `json` are equivalent on
/// the command line and in environment variables.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Terse single-line records for interactive shells.
    #[default]
    Compact,
    /// One JSON object per record for log shippers.
    Json,
}

impl LogFormat {
    /// Reports whether records are emitted as structured JSON.
    #[must_use]
    pub const fn is_structured(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Error returned when text names no known [`LogFormat`].
pub type LogFormatParseError = strum::ParseError;
