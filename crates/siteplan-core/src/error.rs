// ── Core error types ──
//
// User-facing errors from siteplan-core. Consumers never see raw HTTP
// status codes; the orchestrator classifies each `siteplan_api::Error`
// by the lifecycle phase it happened in (submission, polling, result
// retrieval), since the same transport failure means different things
// in each.

use thiserror::Error;

use crate::job::JobId;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Input errors ─────────────────────────────────────────────────
    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    // ── Job lifecycle errors ─────────────────────────────────────────
    /// The service refused the job (`status` set), or the request never
    /// reached it. No job exists.
    #[error("Failed to start prediction: {message}")]
    Submission {
        status: Option<u16>,
        message: String,
    },

    /// A single status check failed. Transient failures (transport,
    /// 429, 5xx) are retried by
    /// [`JobOrchestrator::wait`](crate::JobOrchestrator::wait); anything
    /// else (unknown task, unreadable body) ends the wait.
    #[error("Status check for job {job_id} failed: {message}")]
    Poll {
        job_id: JobId,
        status: Option<u16>,
        message: String,
        transient: bool,
    },

    /// The retry budget ran out before the job reached a terminal state.
    #[error(
        "Gave up on job {job_id} after {attempts} status checks{}",
        last_error_suffix(.last_error.as_deref())
    )]
    PollBudgetExhausted {
        job_id: JobId,
        attempts: u32,
        last_error: Option<String>,
    },

    #[error("Polling for job {job_id} was cancelled")]
    Cancelled { job_id: JobId },

    /// The service ran the job and reported it failed.
    #[error("Simulation {job_id} failed{}", message_suffix(.message.as_deref()))]
    ServiceFailure {
        job_id: JobId,
        message: Option<String>,
    },

    #[error("Failed to fetch result for job {job_id}: {message}")]
    Fetch { job_id: JobId, message: String },

    #[error("Failed to decode result for job {job_id}: {message}")]
    Decode { job_id: JobId, message: String },

    /// `fetch_result` called before completion or more than once.
    #[error("Result for job {job_id} is not available: {reason}")]
    ResultUnavailable { job_id: JobId, reason: String },

    // ── Catalog / surface errors ─────────────────────────────────────
    #[error("Site index {index} out of bounds (catalog has {len} sites)")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Overlay surface error: {0}")]
    Surface(#[from] crate::overlay::SurfaceError),

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// The job this error belongs to, if it happened after submission.
    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            Self::Poll { job_id, .. }
            | Self::PollBudgetExhausted { job_id, .. }
            | Self::Cancelled { job_id }
            | Self::ServiceFailure { job_id, .. }
            | Self::Fetch { job_id, .. }
            | Self::Decode { job_id, .. }
            | Self::ResultUnavailable { job_id, .. } => Some(job_id),
            _ => None,
        }
    }

    /// Returns `true` for failures the polling loop absorbs and retries.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Poll {
                transient: true,
                ..
            }
        )
    }
}

fn message_suffix(message: Option<&str>) -> String {
    message.map(|m| format!(": {m}")).unwrap_or_default()
}

fn last_error_suffix(last_error: Option<&str>) -> String {
    last_error
        .map(|e| format!(" (last error: {e})"))
        .unwrap_or_default()
}
