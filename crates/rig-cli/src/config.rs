//! Configuration loading helpers for the CLI.
//!
//! Configuration flags precede the workload group. They are split off and
//! handed to `ortho_config`, while the remaining tokens go to the command
//! parser.

use std::ffi::{OsStr, OsString};

use ortho_config::OrthoConfig;
use rig_config::Config;

use crate::AppError;

/// CLI flags recognised by the configuration loader.
///
/// Must list every field of [`Config`] as `ortho_config` spells it.
pub(crate) const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--root-dir",
    "--container-prefix",
    "--instance",
    "--docker-binary",
    "--runtime-timeout-secs",
    "--runtime-retries",
    "--data-image",
    "--log-filter",
    "--log-format",
    "--editor",
];

pub(crate) trait ConfigLoader {
    /// Loads configuration for the CLI.
    ///
    /// # Flag Ordering
    ///
    /// Configuration flags must appear before the workload group. Flags that
    /// follow it are parsed as part of the command.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Skip,
}

fn process_config_flag(argument: &OsStr) -> FlagAction {
    let argument_text = argument.to_string_lossy();
    if !argument_text.starts_with("--") {
        return FlagAction::Skip;
    }
    let (flag, has_inline_value) = match argument_text.split_once('=') {
        Some((flag, _)) => (flag, true),
        None => (&*argument_text, false),
    };
    if CONFIG_CLI_FLAGS.contains(&flag) {
        FlagAction::Include {
            needs_value: !has_inline_value,
        }
    } else {
        FlagAction::Skip
    }
}

/// Arguments partitioned between the configuration loader and the command
/// parser. Both keep the program name first.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ConfigArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) command_arguments: Vec<OsString>,
}

pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let mut remaining = args.iter();
    let Some(program) = remaining.next() else {
        return ConfigArgumentSplit {
            config_arguments: Vec::new(),
            command_arguments: Vec::new(),
        };
    };

    let mut config_arguments = vec![program.clone()];
    let mut command_arguments = vec![program.clone()];
    let mut pending_value = false;
    for argument in remaining.by_ref() {
        if pending_value {
            config_arguments.push(argument.clone());
            pending_value = false;
            continue;
        }
        match process_config_flag(argument) {
            FlagAction::Include { needs_value } => {
                config_arguments.push(argument.clone());
                pending_value = needs_value;
            }
            FlagAction::Skip => {
                command_arguments.push(argument.clone());
                break;
            }
        }
    }
    command_arguments.extend(remaining.cloned());

    ConfigArgumentSplit {
        config_arguments,
        command_arguments,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn os_args(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[rstest]
    #[case("--log-filter=debug", FlagAction::Include { needs_value: false })]
    #[case("--root-dir", FlagAction::Include { needs_value: true })]
    #[case("chains", FlagAction::Skip)]
    #[case("--unknown", FlagAction::Skip)]
    fn classifies_flags(#[case] argument: &str, #[case] expected: FlagAction) {
        assert_eq!(process_config_flag(OsStr::new(argument)), expected);
    }

    #[test]
    fn config_flags_before_group_are_split_off() {
        let args = os_args(&[
            "rig",
            "--root-dir",
            "/srv/rig",
            "--log-format=json",
            "chains",
            "exec",
            "alpha",
            "--instance",
            "2",
        ]);
        let split = split_config_arguments(&args);
        assert_eq!(
            split.config_arguments,
            os_args(&["rig", "--root-dir", "/srv/rig", "--log-format=json"])
        );
        assert_eq!(
            split.command_arguments,
            os_args(&["rig", "chains", "exec", "alpha", "--instance", "2"])
        );
    }

    #[test]
    fn empty_arguments_split_to_nothing() {
        let split = split_config_arguments(&[]);
        assert!(split.config_arguments.is_empty());
        assert!(split.command_arguments.is_empty());
    }
}
