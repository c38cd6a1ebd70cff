//! Command-line interface runtime for `rig`.
//!
//! The module owns argument parsing, configuration bootstrapping, telemetry
//! installation and the mapping from verbs onto [`Lifecycle`] operations. The
//! runtime can be exercised from the binary entrypoint or from tests, which
//! substitute the configuration loader, the container runtime and the IO
//! streams.
//!
//! Exit status is `0` on success and for informational notices, the
//! container's own status for `exec` and `logs`, `2` for usage errors and
//! `1` for every other failure.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use rig_config::Config;
use rig_core::{
    CommandEditor, ContainerRuntime, DefinitionEditor, DockerCli, Lifecycle, LogsOptions, Notice,
    Outcome, RemoveOptions, StartOptions, StopOptions, UpdateOptions, WorkloadKind,
};
use serde_json::Value;
use tracing::debug;

mod cli;
mod config;
mod errors;
mod telemetry;

use cli::{Action, Cli, Verb};
use config::split_config_arguments;
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
pub(crate) use errors::AppError;

const CLI_TARGET: &str = "rig_cli";

/// Bundles the IO streams provided to the CLI runtime.
pub(crate) struct IoStreams<'a, W: Write, E: Write> {
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
}

impl<'a, W: Write, E: Write> IoStreams<'a, W, E> {
    pub(crate) const fn new(stdout: &'a mut W, stderr: &'a mut E) -> Self {
        Self { stdout, stderr }
    }
}

struct CliRunner<'a, W: Write, E: Write, L: ConfigLoader> {
    io: &'a mut IoStreams<'a, W, E>,
    loader: &'a L,
}

impl<'a, W, E, L> CliRunner<'a, W, E, L>
where
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    const fn new(io: &'a mut IoStreams<'a, W, E>, loader: &'a L) -> Self {
        Self { io, loader }
    }

    fn run_with_runtime<I, R, F>(&mut self, args: I, connect: F) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
        R: ContainerRuntime,
        F: FnOnce(&Config) -> R,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&args);

        let result = Cli::try_parse_from(&split.command_arguments)
            .map_err(AppError::CliUsage)
            .and_then(|cli| {
                let config = self.loader.load(&split.config_arguments)?;
                telemetry::initialise(&config)?;
                let lifecycle = Lifecycle::from_config(&config, connect(&config))?;
                let action = cli.group.into_action();
                debug!(target: CLI_TARGET, ?action, "dispatching command");
                match action {
                    Action::Lifecycle(kind, verb) => {
                        let editor = CommandEditor::from_config(&config);
                        dispatch(&lifecycle, &editor, kind, verb, self.io)
                    }
                    Action::Graduate { name } => {
                        let path = lifecycle.graduate(&name)?;
                        writeln!(self.io.stdout, "{}", path.display())?;
                        self.io.stdout.flush()?;
                        Ok(ExitCode::SUCCESS)
                    }
                }
            });

        match result {
            Ok(exit_code) => exit_code,
            Err(AppError::CliUsage(error)) => {
                let status = error.exit_code();
                let rendered = error.render().to_string();
                let written = if error.use_stderr() {
                    self.io.stderr.write_all(rendered.as_bytes())
                } else {
                    self.io.stdout.write_all(rendered.as_bytes())
                };
                if written.is_err() {
                    return ExitCode::FAILURE;
                }
                exit_code_from_status(status)
            }
            Err(error) => {
                writeln!(self.io.stderr, "rig: {error}").unwrap_or_default();
                ExitCode::FAILURE
            }
        }
    }
}

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let mut io = IoStreams::new(stdout, stderr);
    run_with(args, &mut io, &OrthoConfigLoader, DockerCli::from_config)
}

/// Runs the CLI with a custom configuration loader and runtime constructor.
#[must_use]
pub(crate) fn run_with<'a, I, W, E, L, R, F>(
    args: I,
    io: &'a mut IoStreams<'a, W, E>,
    loader: &'a L,
    connect: F,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
    R: ContainerRuntime,
    F: FnOnce(&Config) -> R,
{
    CliRunner::new(io, loader).run_with_runtime(args, connect)
}

fn dispatch<R, D, W, E>(
    lifecycle: &Lifecycle<R>,
    editor: &D,
    kind: WorkloadKind,
    verb: Verb,
    io: &mut IoStreams<'_, W, E>,
) -> Result<ExitCode, AppError>
where
    R: ContainerRuntime,
    D: DefinitionEditor,
    W: Write,
    E: Write,
{
    match verb {
        Verb::Known => write_names(io, lifecycle.list_known(kind)?),
        Verb::Ls => write_names(io, lifecycle.list_existing(kind)?),
        Verb::Ps => write_names(io, lifecycle.list_running(kind)?),
        Verb::Start { name, publish } => {
            let options = StartOptions {
                publish_all_ports: publish,
            };
            finish(io, lifecycle.start(kind, &name, options)?)
        }
        Verb::Stop { name, rm, data } => {
            let options = StopOptions {
                remove_container: rm,
                remove_data: data,
            };
            finish(io, lifecycle.stop(kind, &name, options)?)
        }
        Verb::Logs { name, follow, tail } => {
            let options = LogsOptions { follow, tail };
            match lifecycle.logs(kind, &name, options)? {
                Outcome::Done(status) => Ok(exit_code_from_status(status)),
                Outcome::Skipped(notice) => notify(io, &notice),
            }
        }
        Verb::Exec {
            interactive,
            name,
            args,
        } => {
            let argv = exec_argv(args, interactive)?;
            match lifecycle.exec(kind, &name, argv, interactive)? {
                Outcome::Done(status) => Ok(exit_code_from_status(status)),
                Outcome::Skipped(notice) => notify(io, &notice),
            }
        }
        Verb::Inspect { name, field } => match lifecycle.inspect(kind, &name, &field)? {
            Outcome::Done(value) => write_value(io, &value),
            Outcome::Skipped(notice) => notify(io, &notice),
        },
        Verb::Rename { old, new } => finish(io, lifecycle.rename(kind, &old, &new)?),
        Verb::Update { name, pull } => {
            finish(io, lifecycle.update(kind, &name, UpdateOptions { pull })?)
        }
        Verb::Rm { name, file, data } => {
            let options = RemoveOptions {
                remove_data: data,
                force: file,
            };
            finish(io, lifecycle.remove(kind, &name, options)?)
        }
        Verb::Cat { name } => {
            let text = lifecycle.cat(kind, &name)?;
            io.stdout.write_all(text.as_bytes())?;
            if !text.ends_with('\n') {
                io.stdout.write_all(b"\n")?;
            }
            io.stdout.flush()?;
            Ok(ExitCode::SUCCESS)
        }
        Verb::Edit { name } => {
            lifecycle.edit(kind, &name, editor)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Builds the argument vector for `exec`.
///
/// A lone argument is split on whitespace so quoted command lines work.
fn exec_argv(args: Vec<String>, interactive: bool) -> Result<Vec<String>, AppError> {
    if args.is_empty() && !interactive {
        return Err(AppError::MissingExecCommand);
    }
    match <[String; 1]>::try_from(args) {
        Ok([single]) => Ok(single.split_whitespace().map(str::to_owned).collect()),
        Err(args) => Ok(args),
    }
}

fn finish<W: Write, E: Write>(
    io: &mut IoStreams<'_, W, E>,
    outcome: Outcome,
) -> Result<ExitCode, AppError> {
    match outcome {
        Outcome::Done(()) => Ok(ExitCode::SUCCESS),
        Outcome::Skipped(notice) => notify(io, &notice),
    }
}

fn notify<W: Write, E: Write>(
    io: &mut IoStreams<'_, W, E>,
    notice: &Notice,
) -> Result<ExitCode, AppError> {
    writeln!(io.stderr, "{notice}")?;
    io.stderr.flush()?;
    Ok(ExitCode::SUCCESS)
}

fn write_names<W: Write, E: Write>(
    io: &mut IoStreams<'_, W, E>,
    names: impl IntoIterator<Item = String>,
) -> Result<ExitCode, AppError> {
    for name in names {
        writeln!(io.stdout, "{name}")?;
    }
    io.stdout.flush()?;
    Ok(ExitCode::SUCCESS)
}

fn write_value<W: Write, E: Write>(
    io: &mut IoStreams<'_, W, E>,
    value: &Value,
) -> Result<ExitCode, AppError> {
    if let Value::String(text) = value {
        writeln!(io.stdout, "{text}")?;
    } else {
        serde_json::to_writer_pretty(&mut *io.stdout, value).map_err(AppError::RenderInspect)?;
        io.stdout.write_all(b"\n")?;
    }
    io.stdout.flush()?;
    Ok(ExitCode::SUCCESS)
}

fn exit_code_from_status(status: i32) -> ExitCode {
    u8::try_from(status).map_or(ExitCode::FAILURE, ExitCode::from)
}
