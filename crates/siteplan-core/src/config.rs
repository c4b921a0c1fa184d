// ── Runtime planner configuration ──
//
// These types describe *how* to reach the prediction service and how
// patiently to wait for it. They never touch disk; the CLI (via
// siteplan-config) constructs a `PlannerConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

/// Reference polling interval of the prediction service's own frontend.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-hosted services with self-signed certs).
    DangerAcceptInvalid,
}

/// How the orchestrator waits for a running job.
///
/// The loop checks status every `interval`. `max_attempts` bounds the
/// number of status checks (successful or not) and `deadline` bounds the
/// wall-clock time spent waiting; either being reached ends the wait with
/// [`CoreError::PollBudgetExhausted`](crate::CoreError::PollBudgetExhausted).
/// With both unset the loop runs until the job is terminal or the
/// orchestrator is cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: Option<u32>,
    pub deadline: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
            deadline: None,
        }
    }
}

impl PollPolicy {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Whether the budget is spent after `attempts` checks and `elapsed` time.
    pub(crate) fn exhausted(&self, attempts: u32, elapsed: Duration) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
            || self.deadline.is_some_and(|deadline| elapsed >= deadline)
    }
}

/// Configuration for talking to one prediction service.
///
/// Built by the CLI, passed to [`JobOrchestrator::new`](crate::JobOrchestrator::new).
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Service base URL (e.g., `http://localhost:8080`).
    pub service_url: Url,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Polling behaviour while a job runs.
    pub poll: PollPolicy,
}

impl PlannerConfig {
    pub fn new(service_url: Url) -> Self {
        Self {
            service_url,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            poll: PollPolicy::default(),
        }
    }
}
