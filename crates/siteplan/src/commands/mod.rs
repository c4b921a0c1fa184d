//! Command dispatch: bridges CLI args -> core operations -> output formatting.

pub mod config_cmd;
pub mod params;
pub mod predict;
pub mod result;
pub mod status;

use std::sync::Arc;

use siteplan_core::{JobOrchestrator, PlannerConfig};

use crate::cli::{Command, GlobalOpts};
use crate::config::Session;
use crate::decode::decode_geotiff;
use crate::error::CliError;

/// Dispatch a service-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    session: &Session,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Predict(args) => predict::handle(args, session, global).await,
        Command::Status(args) => status::handle(args, session, global).await,
        Command::Result(args) => result::handle(args, session, global).await,
        // Resolved before a session exists.
        Command::Params(_) | Command::Config(_) | Command::Completions(_) => Err(
            CliError::Internal("command does not talk to the prediction service".into()),
        ),
    }
}

/// Orchestrator wired to the GeoTIFF decoder, cancelled on Ctrl-C.
pub(crate) fn orchestrator(config: &PlannerConfig) -> Result<JobOrchestrator, CliError> {
    let orchestrator = JobOrchestrator::new(config, Arc::new(decode_geotiff))?;

    let token = orchestrator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling");
            token.cancel();
        }
    });

    Ok(orchestrator)
}
