//! Error types for the CLI runtime.

use std::io;
use std::sync::Arc;

use rig_core::LifecycleError;
use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("exec needs a command unless --interactive is given")]
    MissingExecCommand,
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error("failed to render inspect output: {0}")]
    RenderInspect(serde_json::Error),
    #[error("failed to write output: {0}")]
    WriteOutput(#[from] io::Error),
}
