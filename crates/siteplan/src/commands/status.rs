//! `siteplan status`: one status check for a submitted task.

use serde::Serialize;

use siteplan_core::{JobId, JobState, PollOutcome};

use crate::cli::{GlobalOpts, StatusArgs};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct StatusView {
    task_id: String,
    state: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub async fn handle(
    args: StatusArgs,
    session: &Session,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let orchestrator = super::orchestrator(&session.planner_config()?)?;
    let mut handle = orchestrator.attach(JobId::from(args.task_id), session.parameters());

    let outcome = orchestrator.poll(&mut handle).await?;
    let view = StatusView {
        task_id: handle.id().to_string(),
        state: handle.state(),
        error: match outcome {
            PollOutcome::Failed { message } => message,
            PollOutcome::StillRunning | PollOutcome::Completed => None,
        },
    };

    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &view,
        |v| {
            let mut pairs = vec![
                ("Task", v.task_id.clone()),
                ("State", output::paint_state(&v.state.to_string(), color)),
            ];
            if let Some(ref e) = v.error {
                pairs.push(("Error", e.clone()));
            }
            output::detail_lines(&pairs)
        },
        |v| v.state.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
