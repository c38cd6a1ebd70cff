//! CLI entrypoint for the `rig` workload manager.
//!
//! The binary delegates to [`rig_cli::run`], which loads configuration,
//! installs telemetry, parses the `rig <chains|services> <verb>` command and
//! drives the workload lifecycle against the configured container runtime.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    rig_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
