// ── Job lifecycle types ──
//
// A `JobHandle` tracks one submitted prediction from the moment the
// service accepts it until it is folded into a Site or reported failed.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::model::{DecodedRaster, SimulationParameters};

/// Service-issued task identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// Orchestrator lifecycle state observable by consumers.
///
/// `Idle → Submitting → Running → {Completed, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobState {
    Idle,
    Submitting,
    Running,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Result of one status check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    StillRunning,
    /// The service finished; the result is ready to fetch.
    Completed,
    /// The service reported the job failed, or the result could not be
    /// retrieved or decoded afterwards.
    Failed { message: Option<String> },
}

impl PollOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::StillRunning)
    }
}

/// One submitted job.
///
/// Created by [`JobOrchestrator::submit`](crate::JobOrchestrator::submit)
/// with a frozen copy of the parameters, and advanced only by the
/// orchestrator. Once terminal, the outcome is cached and every further
/// poll returns it unchanged.
#[derive(Debug, Clone)]
pub struct JobHandle {
    id: JobId,
    params: SimulationParameters,
    state: JobState,
    outcome: Option<PollOutcome>,
    attempts: u32,
    result_fetched: bool,
}

impl JobHandle {
    pub(crate) fn new(id: JobId, params: SimulationParameters) -> Self {
        Self {
            id,
            params,
            state: JobState::Running,
            outcome: None,
            attempts: 0,
            result_fetched: false,
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// Parameters as they were at submission time.
    pub fn params(&self) -> &SimulationParameters {
        &self.params
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Number of status checks issued so far, failed ones included.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// The cached terminal outcome, once there is one.
    pub fn outcome(&self) -> Option<&PollOutcome> {
        self.outcome.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn result_fetched(&self) -> bool {
        self.result_fetched
    }

    // ── Transitions (orchestrator only) ──────────────────────────────

    pub(crate) fn count_attempt(&mut self) {
        self.attempts = self.attempts.saturating_add(1);
    }

    /// Record a status check result. Terminal outcomes are cached.
    pub(crate) fn record(&mut self, outcome: &PollOutcome) {
        if self.is_terminal() {
            return;
        }
        match outcome {
            PollOutcome::StillRunning => {}
            PollOutcome::Completed => {
                self.state = JobState::Completed;
                self.outcome = Some(outcome.clone());
            }
            PollOutcome::Failed { .. } => {
                self.state = JobState::Failed;
                self.outcome = Some(outcome.clone());
            }
        }
    }

    pub(crate) fn mark_fetched(&mut self) {
        self.result_fetched = true;
    }

    /// Fail a job after the service reported completion (fetch or
    /// decode went wrong).
    pub(crate) fn fail(&mut self, message: String) {
        self.state = JobState::Failed;
        self.outcome = Some(PollOutcome::Failed {
            message: Some(message),
        });
    }

    pub(crate) fn into_result(self, raster: DecodedRaster) -> JobResult {
        JobResult {
            job_id: self.id,
            params: self.params,
            raster,
        }
    }
}

/// A successfully completed and decoded job, ready to become a Site.
#[derive(Debug, Clone, PartialEq)]
pub struct JobResult {
    pub job_id: JobId,
    pub params: SimulationParameters,
    pub raster: DecodedRaster,
}
