//! `siteplan predict`: run predictions and write their overlays.

use std::path::PathBuf;
use std::time::Duration;

use bytesize::ByteSize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tabled::Tabled;
use tokio::sync::watch;

use siteplan_core::{
    CoreError, JobOrchestrator, JobState, PlannerConfig, SimulationParameters, Site, SitePlanner,
};

use crate::cli::{GlobalOpts, PredictArgs};
use crate::config::{self, Session};
use crate::error::CliError;
use crate::output;
use crate::surface::DirectorySurface;

// ── Views ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct SiteView {
    index: usize,
    name: String,
    task_id: String,
    latitude: f64,
    longitude: f64,
    frequency_mhz: f64,
    extent_km: f64,
    size_bytes: usize,
    width: Option<u32>,
    height: Option<u32>,
    file: Option<PathBuf>,
    created_at: String,
}

impl SiteView {
    fn new(index: usize, site: &Site, file: Option<PathBuf>) -> Self {
        let tx = &site.params.transmitter;
        let dims = site.raster.dimensions();
        Self {
            index,
            name: site.name().to_owned(),
            task_id: site.job_id.to_string(),
            latitude: tx.latitude,
            longitude: tx.longitude,
            frequency_mhz: tx.frequency_mhz,
            extent_km: site.params.simulation.extent_km,
            size_bytes: site.raster.len(),
            width: dims.map(|(w, _)| w),
            height: dims.map(|(_, h)| h),
            file,
            created_at: site.created_at.to_rfc3339(),
        }
    }
}

#[derive(Tabled)]
struct SiteRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Site")]
    name: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "MHz")]
    frequency: String,
    #[tabled(rename = "Raster")]
    raster: String,
    #[tabled(rename = "File")]
    file: String,
}

impl From<&SiteView> for SiteRow {
    fn from(v: &SiteView) -> Self {
        let size = ByteSize::b(u64::try_from(v.size_bytes).unwrap_or(u64::MAX));
        let raster = match (v.width, v.height) {
            (Some(w), Some(h)) => format!("{w}×{h}, {size}"),
            _ => size.to_string(),
        };
        Self {
            index: v.index,
            name: v.name.clone(),
            location: format!("{:.5}, {:.5}", v.latitude, v.longitude),
            frequency: format!("{}", v.frequency_mhz),
            raster,
            file: v
                .file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SubmittedView {
    name: String,
    task_id: String,
}

#[derive(Tabled)]
struct SubmittedRow {
    #[tabled(rename = "Site")]
    name: String,
    #[tabled(rename = "Task")]
    task_id: String,
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    args: PredictArgs,
    session: &Session,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut planner_config = session.planner_config()?;
    apply_poll_overrides(&mut planner_config, &args)?;

    let sets = config::build_parameters(&session.parameters(), &args.overrides)?;
    for params in &sets {
        params.validate()?;
    }

    let orchestrator = super::orchestrator(&planner_config)?;

    if args.no_wait {
        return submit_only(&orchestrator, &sets, global).await;
    }

    let out_dir = session.out_dir(args.out_dir.as_deref());
    let surface = DirectorySurface::create(&out_dir).map_err(CoreError::from)?;
    let planner = SitePlanner::new(orchestrator.clone(), surface);

    let spinner = spinner(global.quiet);
    let watcher = tokio::spawn(follow_state(orchestrator.state(), spinner.clone()));

    let outcome = run_all(&planner, &sets, &spinner).await;
    watcher.abort();
    spinner.finish_and_clear();
    outcome?;

    let color = output::should_color(&global.color);
    if !global.quiet {
        eprintln!(
            "{}",
            output::success(
                &format!("{} overlay(s) written to {}", sets.len(), out_dir.display()),
                color,
            )
        );
    }

    let sites = planner.sites().await;
    let files = planner.inspect(|_, surface| surface.files().to_vec()).await;
    let views: Vec<SiteView> = sites
        .iter()
        .enumerate()
        .map(|(i, site)| SiteView::new(i, site, files.get(i).cloned()))
        .collect();

    let out = output::render_list(&global.output, &views, |v| SiteRow::from(v), |v| {
        v.file
            .as_ref()
            .map_or_else(|| v.task_id.clone(), |p| p.display().to_string())
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

async fn run_all(
    planner: &SitePlanner<DirectorySurface>,
    sets: &[SimulationParameters],
    spinner: &ProgressBar,
) -> Result<(), CliError> {
    let total = sets.len();
    for (i, params) in sets.iter().enumerate() {
        spinner.set_prefix(format!("[{}/{total}] {}", i + 1, params.transmitter.name));
        let site = planner.simulate(params).await?;
        spinner.suspend(|| {
            tracing::info!(site = %site.name(), task_id = %site.job_id, "site ready");
        });
    }
    Ok(())
}

async fn submit_only(
    orchestrator: &JobOrchestrator,
    sets: &[SimulationParameters],
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut submitted = Vec::with_capacity(sets.len());
    for params in sets {
        let handle = orchestrator.submit(params).await?;
        submitted.push(SubmittedView {
            name: params.transmitter.name.clone(),
            task_id: handle.id().to_string(),
        });
    }

    let out = output::render_list(
        &global.output,
        &submitted,
        |s| SubmittedRow {
            name: s.name.clone(),
            task_id: s.task_id.clone(),
        },
        |s| s.task_id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// `--poll-interval`, `--max-attempts` and `--deadline` win over the profile.
fn apply_poll_overrides(config: &mut PlannerConfig, args: &PredictArgs) -> Result<(), CliError> {
    if let Some(interval) = args.poll_interval {
        let interval: Duration = interval.into();
        if interval.is_zero() {
            return Err(CliError::Validation {
                field: "poll-interval".into(),
                reason: "must be greater than 0".into(),
            });
        }
        config.poll.interval = interval;
    }
    if let Some(max) = args.max_attempts {
        config.poll.max_attempts = Some(max);
    }
    if let Some(deadline) = args.deadline {
        config.poll.deadline = Some(deadline.into());
    }
    Ok(())
}

// ── Progress ────────────────────────────────────────────────────────

fn spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold} {msg} ({elapsed})")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    bar.set_style(style);
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

async fn follow_state(mut state: watch::Receiver<JobState>, bar: ProgressBar) {
    loop {
        let current = *state.borrow_and_update();
        bar.set_message(match current {
            JobState::Idle => "waiting",
            JobState::Submitting => "submitting",
            JobState::Running => "simulating",
            JobState::Completed => "downloading",
            JobState::Failed => "failed",
        });
        if state.changed().await.is_err() {
            break;
        }
    }
}
