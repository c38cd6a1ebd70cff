//! Container identity derivation and parsing.
//!
//! Every managed container is named `<prefix>_<kind>_<name>_<instance>`. The
//! encoding is the only link between a workload and the containers the
//! runtime reports, so [`ContainerIdentity::parse`] accepts exactly the
//! strings [`ContainerIdentity`]'s `Display` produces and rejects everything
//! else with an [`UnrecognisedName`] reason.

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use rig_config::Config;
use thiserror::Error;

const SEPARATOR: char = '_';

/// Workload categories that own definitions and lifecycle operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WorkloadKind {
    /// Blockchain node workloads.
    Chain,
    /// Auxiliary service workloads.
    Service,
}

impl WorkloadKind {
    /// Segment used in container names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chain => "chain",
            Self::Service => "service",
        }
    }

    /// Plural form used for directories and the command line.
    #[must_use]
    pub const fn plural(self) -> &'static str {
        match self {
            Self::Chain => "chains",
            Self::Service => "services",
        }
    }

    /// Kind segment used for this workload's primary container.
    #[must_use]
    pub const fn container_kind(self) -> ContainerKind {
        match self {
            Self::Chain => ContainerKind::Chain,
            Self::Service => ContainerKind::Service,
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkloadKind {
    type Err = UnrecognisedName;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "chain" | "chains" => Ok(Self::Chain),
            "service" | "services" => Ok(Self::Service),
            other => Err(UnrecognisedName::UnknownKind {
                kind: other.to_owned(),
            }),
        }
    }
}

/// Kind segment of a container name.
///
/// `Data` marks companion data containers, which are never started or stopped
/// on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContainerKind {
    /// Primary container of a chain workload.
    Chain,
    /// Primary container of a service workload.
    Service,
    /// Companion data container.
    Data,
}

impl ContainerKind {
    /// Segment used in container names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chain => "chain",
            Self::Service => "service",
            Self::Data => "data",
        }
    }
}

impl From<WorkloadKind> for ContainerKind {
    fn from(kind: WorkloadKind) -> Self {
        kind.container_kind()
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContainerKind {
    type Err = UnrecognisedName;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "chain" => Ok(Self::Chain),
            "service" => Ok(Self::Service),
            "data" => Ok(Self::Data),
            other => Err(UnrecognisedName::UnknownKind {
                kind: other.to_owned(),
            }),
        }
    }
}

/// Validated logical workload name.
///
/// Names start with an ASCII letter or digit and otherwise contain only ASCII
/// letters, digits, `_`, `.` and `-`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkloadName(String);

impl WorkloadName {
    /// Validates and wraps a logical name.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidName`] when the name is empty or uses
    /// characters outside the allowed set.
    pub fn new(name: impl Into<String>) -> Result<Self, IdentityError> {
        let name = name.into();
        match name_violation(&name) {
            None => Ok(Self(name)),
            Some(reason) => Err(IdentityError::InvalidName { name, reason }),
        }
    }

    /// Borrows the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Consumes the wrapper, returning the owned name.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for WorkloadName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for WorkloadName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for WorkloadName {
    type Err = IdentityError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::new(value)
    }
}

fn name_violation(name: &str) -> Option<&'static str> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Some("names must not be empty");
    };
    if !first.is_ascii_alphanumeric() {
        return Some("names must start with an ASCII letter or digit");
    }
    if chars.any(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))) {
        return Some("names may only contain ASCII letters, digits, '_', '.' and '-'");
    }
    None
}

/// Naming parameters threaded through every store and lifecycle call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Naming {
    prefix: String,
    instance: NonZeroU32,
}

impl Naming {
    /// Builds naming parameters from an explicit prefix and instance.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidPrefix`] when the prefix is empty or
    /// contains the `_` separator.
    pub fn new(prefix: impl Into<String>, instance: NonZeroU32) -> Result<Self, IdentityError> {
        let prefix = prefix.into();
        if prefix.is_empty() || prefix.contains(SEPARATOR) {
            return Err(IdentityError::InvalidPrefix { prefix });
        }
        Ok(Self { prefix, instance })
    }

    /// Builds naming parameters from the resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidPrefix`] when the configured prefix is
    /// unusable.
    pub fn from_config(config: &Config) -> Result<Self, IdentityError> {
        Self::new(config.container_prefix(), config.instance())
    }

    /// Prefix shared by every managed container.
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.prefix.as_str()
    }

    /// Instance number encoded into container names.
    #[must_use]
    pub const fn instance(&self) -> NonZeroU32 {
        self.instance
    }

    /// Identity of the primary container backing a workload.
    #[must_use]
    pub fn primary(&self, kind: WorkloadKind, name: &WorkloadName) -> ContainerIdentity {
        self.identity(kind.container_kind(), name)
    }

    /// Identity of the companion data container backing a workload.
    #[must_use]
    pub fn data(&self, name: &WorkloadName) -> ContainerIdentity {
        self.identity(ContainerKind::Data, name)
    }

    /// Identity for an arbitrary container kind.
    #[must_use]
    pub fn identity(&self, kind: ContainerKind, name: &WorkloadName) -> ContainerIdentity {
        ContainerIdentity {
            prefix: self.prefix.clone(),
            kind,
            name: name.clone(),
            instance: self.instance,
        }
    }

    /// Derives the container name for a workload. Pure formatting.
    #[must_use]
    pub fn container_name(&self, kind: ContainerKind, name: &WorkloadName) -> String {
        self.identity(kind, name).to_string()
    }

    /// Parses a container name and checks it carries this prefix.
    ///
    /// # Errors
    ///
    /// Returns the reason the name is not a managed identity, including
    /// [`UnrecognisedName::ForeignPrefix`] for other prefixes.
    pub fn parse(&self, raw: &str) -> Result<ContainerIdentity, UnrecognisedName> {
        let identity = ContainerIdentity::parse(raw)?;
        if identity.prefix != self.prefix {
            return Err(UnrecognisedName::ForeignPrefix {
                expected: self.prefix.clone(),
                found: identity.prefix,
            });
        }
        Ok(identity)
    }

    /// Derives the companion data container name from a primary name.
    ///
    /// # Errors
    ///
    /// Returns the parse failure when `primary` is not a managed identity.
    pub fn data_container_name(&self, primary: &str) -> Result<String, UnrecognisedName> {
        Ok(self.parse(primary)?.data_companion().to_string())
    }
}

/// Decoded container identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerIdentity {
    prefix: String,
    kind: ContainerKind,
    name: WorkloadName,
    instance: NonZeroU32,
}

impl ContainerIdentity {
    /// Decodes a raw container name.
    ///
    /// A single leading `/`, as reported by the Docker API, is ignored.
    ///
    /// # Errors
    ///
    /// Returns an [`UnrecognisedName`] describing the first violation of the
    /// naming grammar.
    pub fn parse(raw: &str) -> Result<Self, UnrecognisedName> {
        let trimmed = raw.strip_prefix('/').unwrap_or(raw);
        if trimmed.is_empty() {
            return Err(UnrecognisedName::Empty);
        }
        let missing = || UnrecognisedName::MissingSegments {
            raw: raw.to_owned(),
        };
        let (prefix, rest) = trimmed.split_once(SEPARATOR).ok_or_else(missing)?;
        let (kind, rest) = rest.split_once(SEPARATOR).ok_or_else(missing)?;
        let (name, instance) = rest.rsplit_once(SEPARATOR).ok_or_else(missing)?;
        if prefix.is_empty() {
            return Err(UnrecognisedName::EmptyPrefix);
        }
        let kind = kind.parse::<ContainerKind>()?;
        let name = WorkloadName::new(name).map_err(|_| UnrecognisedName::InvalidName {
            name: name.to_owned(),
        })?;
        let instance = parse_instance(instance)?;
        Ok(Self {
            prefix: prefix.to_owned(),
            kind,
            name,
            instance,
        })
    }

    /// Naming prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.prefix.as_str()
    }

    /// Kind segment.
    #[must_use]
    pub const fn kind(&self) -> ContainerKind {
        self.kind
    }

    /// Logical workload name.
    #[must_use]
    pub const fn name(&self) -> &WorkloadName {
        &self.name
    }

    /// Instance number.
    #[must_use]
    pub const fn instance(&self) -> NonZeroU32 {
        self.instance
    }

    /// Identity of the companion data container for this identity.
    #[must_use]
    pub fn data_companion(&self) -> Self {
        Self {
            kind: ContainerKind::Data,
            ..self.clone()
        }
    }
}

impl fmt::Display for ContainerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}",
            self.prefix, self.kind, self.name, self.instance
        )
    }
}

impl FromStr for ContainerIdentity {
    type Err = UnrecognisedName;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

fn parse_instance(segment: &str) -> Result<NonZeroU32, UnrecognisedName> {
    let invalid = || UnrecognisedName::InvalidInstance {
        instance: segment.to_owned(),
    };
    if segment.starts_with('0') || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    segment.parse::<NonZeroU32>().map_err(|_| invalid())
}

/// Reasons a container name is not a managed identity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnrecognisedName {
    /// The name was empty.
    #[error("container name is empty")]
    Empty,
    /// Fewer than four `_`-separated segments were present.
    #[error("container name '{raw}' does not have prefix, kind, name and instance segments")]
    MissingSegments {
        /// Name as reported by the runtime.
        raw: String,
    },
    /// The prefix segment was empty.
    #[error("container name has an empty prefix")]
    EmptyPrefix,
    /// The kind segment is not one of `chain`, `service` or `data`.
    #[error("unknown container kind '{kind}'")]
    UnknownKind {
        /// Kind segment found.
        kind: String,
    },
    /// The logical name segment failed validation.
    #[error("invalid workload name '{name}' in container name")]
    InvalidName {
        /// Name segment found.
        name: String,
    },
    /// The instance segment is not a positive integer without leading zeros.
    #[error("invalid instance '{instance}' in container name")]
    InvalidInstance {
        /// Instance segment found.
        instance: String,
    },
    /// The name belongs to a different prefix.
    #[error("container prefix '{found}' does not match '{expected}'")]
    ForeignPrefix {
        /// Prefix this tool manages.
        expected: String,
        /// Prefix found in the container name.
        found: String,
    },
}

/// Errors raised while validating naming inputs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// A logical workload name failed validation.
    #[error("invalid workload name '{name}': {reason}")]
    InvalidName {
        /// Name that was rejected.
        name: String,
        /// Human-readable rule that was broken.
        reason: &'static str,
    },
    /// The container prefix is empty or contains `_`.
    #[error("invalid container prefix '{prefix}': it must be non-empty and must not contain '_'")]
    InvalidPrefix {
        /// Prefix that was rejected.
        prefix: String,
    },
}
