//! `siteplan result`: download a finished task's raster to a file.

use std::path::PathBuf;

use bytesize::ByteSize;
use serde::Serialize;

use siteplan_core::{JobId, PollOutcome};

use crate::cli::{GlobalOpts, ResultArgs};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct ResultView {
    task_id: String,
    file: PathBuf,
    media_type: String,
    size_bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<(u32, u32)>,
}

pub async fn handle(
    args: ResultArgs,
    session: &Session,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let orchestrator = super::orchestrator(&session.planner_config()?)?;
    let mut handle = orchestrator.attach(JobId::from(args.task_id), session.parameters());

    // The first check surfaces unknown task ids before any waiting.
    match orchestrator.poll(&mut handle).await {
        Ok(PollOutcome::StillRunning) if !args.wait => {
            return Err(CliError::NotReady {
                message: format!("Task '{}' is still running", handle.id()),
            });
        }
        Ok(_) => {}
        Err(e) if args.wait && e.is_transient() => {
            tracing::warn!(error = %e, "status check failed, waiting anyway");
        }
        Err(e) => return Err(e.into()),
    }

    let result = orchestrator.collect(handle).await?;

    if let Some(parent) = args.output_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&args.output_file, result.raster.payload())?;

    let view = ResultView {
        task_id: result.job_id.to_string(),
        file: args.output_file,
        media_type: result.raster.media_type().to_owned(),
        size_bytes: result.raster.len(),
        dimensions: result.raster.dimensions(),
    };

    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &view,
        |v| {
            let size = ByteSize::b(u64::try_from(v.size_bytes).unwrap_or(u64::MAX));
            let mut line = format!("{} → {} ({size}", v.task_id, v.file.display());
            if let Some((w, h)) = v.dimensions {
                line.push_str(&format!(", {w}×{h}"));
            }
            line.push(')');
            output::success(&line, color)
        },
        |v| v.file.display().to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
