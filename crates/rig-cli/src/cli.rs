//! CLI argument definitions for `rig`.
//!
//! Every lifecycle verb is available under both workload groups, so the tree
//! is `rig <chains|services> <verb> [args]`. Chains additionally accept
//! `graduate`.

use clap::{Parser, Subcommand};
use rig_core::WorkloadKind;
use rig_core::lifecycle::ALL_FIELDS;

/// Command-line interface for the `rig` workload manager.
#[derive(Parser, Debug)]
#[command(
    name = "rig",
    version,
    about = "Manages chain and service containers from definition files",
    disable_help_subcommand = true
)]
pub(crate) struct Cli {
    /// Workload group the verb applies to.
    #[command(subcommand)]
    pub(crate) group: WorkloadGroup,
}

/// Workload groups.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum WorkloadGroup {
    /// Manages blockchain node workloads.
    Chains {
        /// Lifecycle verb.
        #[command(subcommand)]
        verb: ChainVerb,
    },
    /// Manages auxiliary service workloads.
    Services {
        /// Lifecycle verb.
        #[command(subcommand)]
        verb: Verb,
    },
}

impl WorkloadGroup {
    pub(crate) fn into_action(self) -> Action {
        match self {
            Self::Chains {
                verb: ChainVerb::Common(verb),
            } => Action::Lifecycle(WorkloadKind::Chain, verb),
            Self::Chains {
                verb: ChainVerb::Graduate { name },
            } => Action::Graduate { name },
            Self::Services { verb } => Action::Lifecycle(WorkloadKind::Service, verb),
        }
    }
}

/// Parsed command ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Action {
    /// A verb shared by both groups.
    Lifecycle(WorkloadKind, Verb),
    /// Graduates a chain to a service.
    Graduate { name: String },
}

/// Verbs accepted by the `chains` group.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum ChainVerb {
    /// Verbs shared with services.
    #[command(flatten)]
    Common(Verb),
    /// Lays down a service definition from the chain's definition.
    Graduate {
        /// Chain name.
        name: String,
    },
}

/// Lifecycle verbs shared by chains and services.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum Verb {
    /// Lists workloads that have a definition file.
    Known,
    /// Lists workloads that have a container, running or not.
    Ls,
    /// Lists workloads whose container is running.
    Ps,
    /// Creates the container if needed and starts it.
    Start {
        /// Workload name.
        name: String,
        /// Publishes every exposed port when the container is created.
        #[arg(short, long)]
        publish: bool,
    },
    /// Stops a running container.
    Stop {
        /// Workload name.
        name: String,
        /// Removes the container after stopping it.
        #[arg(short, long = "rm")]
        rm: bool,
        /// Removes the companion data container too.
        #[arg(short = 'x', long)]
        data: bool,
    },
    /// Streams the container's logs.
    Logs {
        /// Workload name.
        name: String,
        /// Keeps streaming new output.
        #[arg(short, long)]
        follow: bool,
        /// Number of trailing lines to show.
        #[arg(short, long, value_name = "N")]
        tail: Option<usize>,
    },
    /// Runs a command inside the container.
    Exec {
        /// Attaches a terminal and keeps stdin open.
        #[arg(short, long)]
        interactive: bool,
        /// Workload name.
        name: String,
        /// Command and arguments; a single argument is split on whitespace.
        #[arg(
            value_name = "ARG",
            num_args = 0..,
            trailing_var_arg = true,
            allow_hyphen_values = true
        )]
        args: Vec<String>,
    },
    /// Prints the runtime's description of the container, or one field.
    Inspect {
        /// Workload name.
        name: String,
        /// Dotted field path such as `host_config.binds`, or `all`.
        #[arg(default_value = ALL_FIELDS)]
        field: String,
    },
    /// Renames the workload, its containers and its definition file.
    Rename {
        /// Current name.
        old: String,
        /// New name.
        new: String,
    },
    /// Recreates the container from its definition.
    Update {
        /// Workload name.
        name: String,
        /// Pulls a fresh image first.
        #[arg(short, long)]
        pull: bool,
    },
    /// Removes the container, and optionally the definition file.
    Rm {
        /// Workload name.
        name: String,
        /// Deletes the definition file as well.
        #[arg(short, long)]
        file: bool,
        /// Removes the companion data container too.
        #[arg(short = 'x', long)]
        data: bool,
    },
    /// Prints the definition file.
    Cat {
        /// Workload name.
        name: String,
    },
    /// Opens the definition file in the configured editor.
    Edit {
        /// Workload name.
        name: String,
    },
}
