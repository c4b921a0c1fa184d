// ── Job orchestrator ──
//
// Turns a parameter set into a submitted prediction, waits for it to
// finish, and retrieves and decodes the result. The current lifecycle
// state is published over a `watch` channel for UIs to observe.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use siteplan_api::transport::{TlsMode, TransportConfig};
use siteplan_api::{PredictRequest, PredictionClient, TaskStatus};

use crate::config::{PlannerConfig, PollPolicy, TlsVerification};
use crate::error::CoreError;
use crate::job::{JobHandle, JobId, JobResult, JobState, PollOutcome};
use crate::model::{DecodedRaster, RasterDecoder, SimulationParameters};

// ── JobOrchestrator ──────────────────────────────────────────────

/// Drives prediction jobs against one service.
///
/// Cheaply cloneable via `Arc<OrchestratorInner>`. Holds no jobs itself:
/// every job lives in the [`JobHandle`] returned by [`submit`](Self::submit),
/// and each operation advances exactly the handle it is given.
#[derive(Clone)]
pub struct JobOrchestrator {
    inner: Arc<OrchestratorInner>,
}

struct OrchestratorInner {
    client: PredictionClient,
    decoder: Arc<dyn RasterDecoder>,
    policy: PollPolicy,
    state: watch::Sender<JobState>,
    cancel: CancellationToken,
}

impl JobOrchestrator {
    /// Create an orchestrator for the service described by `config`.
    pub fn new(config: &PlannerConfig, decoder: Arc<dyn RasterDecoder>) -> Result<Self, CoreError> {
        let client = PredictionClient::new(config.service_url.clone(), &build_transport(config))
            .map_err(|e| CoreError::Config {
                message: e.to_string(),
            })?;
        Ok(Self::with_client(client, config.poll.clone(), decoder))
    }

    /// Create an orchestrator around an existing client.
    pub fn with_client(
        client: PredictionClient,
        policy: PollPolicy,
        decoder: Arc<dyn RasterDecoder>,
    ) -> Self {
        let (state, _) = watch::channel(JobState::Idle);
        Self {
            inner: Arc::new(OrchestratorInner {
                client,
                decoder,
                policy,
                state,
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.inner.policy
    }

    pub fn client(&self) -> &PredictionClient {
        &self.inner.client
    }

    /// Subscribe to lifecycle state changes.
    pub fn state(&self) -> watch::Receiver<JobState> {
        self.inner.state.subscribe()
    }

    pub fn current_state(&self) -> JobState {
        *self.inner.state.borrow()
    }

    /// Stop every current and future [`wait`](Self::wait) on this
    /// orchestrator. Use [`wait_with_cancel`](Self::wait_with_cancel) to
    /// cancel a single wait instead.
    pub fn cancel(&self) {
        self.inner.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    // ── Submission ───────────────────────────────────────────────

    /// Validate `params` and submit them as a new prediction.
    ///
    /// On rejection no job exists and the state returns to `Idle`. The
    /// returned handle carries a frozen copy of `params`.
    pub async fn submit(&self, params: &SimulationParameters) -> Result<JobHandle, CoreError> {
        params.validate()?;

        self.set_state(JobState::Submitting);
        let request = PredictRequest::from(params);

        match self.inner.client.predict(&request).await {
            Ok(response) => {
                let id = JobId::from(response.task_id);
                info!(job_id = %id, site = %params.transmitter.name, "prediction submitted");
                self.set_state(JobState::Running);
                Ok(JobHandle::new(id, params.clone()))
            }
            Err(e) => {
                warn!(error = %e, "prediction submission rejected");
                self.set_state(JobState::Idle);
                Err(CoreError::Submission {
                    status: e.status(),
                    message: e.detail(),
                })
            }
        }
    }

    /// Rebuild a handle for a task submitted elsewhere, so it can be
    /// polled and collected.
    pub fn attach(&self, job_id: JobId, params: SimulationParameters) -> JobHandle {
        debug!(job_id = %job_id, "attached to existing task");
        JobHandle::new(job_id, params)
    }

    // ── Polling ──────────────────────────────────────────────────

    /// Issue one status check.
    ///
    /// A terminal handle returns its cached outcome without touching the
    /// network. Transport failures and non-2xx responses are
    /// [`CoreError::Poll`] and leave the handle running; the error says
    /// whether a retry can help.
    pub async fn poll(&self, handle: &mut JobHandle) -> Result<PollOutcome, CoreError> {
        if let Some(outcome) = handle.outcome() {
            return Ok(outcome.clone());
        }

        handle.count_attempt();
        let response = self
            .inner
            .client
            .status(handle.id().as_str())
            .await
            .map_err(|e| CoreError::Poll {
                job_id: handle.id().clone(),
                status: e.status(),
                message: e.detail(),
                transient: e.is_transient(),
            })?;

        let outcome = match response.status {
            TaskStatus::Running => PollOutcome::StillRunning,
            TaskStatus::Completed => PollOutcome::Completed,
            TaskStatus::Failed => PollOutcome::Failed {
                message: response.error,
            },
        };
        debug!(job_id = %handle.id(), attempt = handle.attempts(), ?outcome, "status checked");

        handle.record(&outcome);
        match &outcome {
            PollOutcome::StillRunning => {}
            PollOutcome::Completed => {
                info!(job_id = %handle.id(), "prediction completed");
                self.set_state(JobState::Completed);
            }
            PollOutcome::Failed { message } => {
                warn!(job_id = %handle.id(), error = ?message, "prediction failed");
                self.set_state(JobState::Failed);
            }
        }
        Ok(outcome)
    }

    /// Poll until the job is terminal, the budget runs out, a status check
    /// fails in a way retrying cannot fix, or the orchestrator is cancelled.
    pub async fn wait(&self, handle: &mut JobHandle) -> Result<PollOutcome, CoreError> {
        self.wait_with_cancel(handle, &self.inner.cancel).await
    }

    /// Like [`wait`](Self::wait), additionally stopping when `cancel` fires.
    pub async fn wait_with_cancel(
        &self,
        handle: &mut JobHandle,
        cancel: &CancellationToken,
    ) -> Result<PollOutcome, CoreError> {
        let policy = &self.inner.policy;
        let started = Instant::now();
        let mut last_error: Option<String> = None;

        loop {
            if let Some(outcome) = handle.outcome() {
                return Ok(outcome.clone());
            }
            if self.inner.cancel.is_cancelled() || cancel.is_cancelled() {
                return Err(self.cancelled(handle));
            }

            match self.poll(handle).await {
                Ok(outcome) if outcome.is_terminal() => return Ok(outcome),
                Ok(_) => {}
                Err(e) if e.is_transient() => {
                    warn!(
                        job_id = %handle.id(),
                        attempt = handle.attempts(),
                        error = %e,
                        "status check failed, will retry"
                    );
                    last_error = Some(e.to_string());
                }
                Err(e) => {
                    warn!(job_id = %handle.id(), error = %e, "status check failed permanently");
                    self.set_state(JobState::Failed);
                    return Err(e);
                }
            }

            if policy.exhausted(handle.attempts(), started.elapsed()) {
                warn!(job_id = %handle.id(), attempts = handle.attempts(), "poll budget exhausted");
                self.set_state(JobState::Failed);
                return Err(CoreError::PollBudgetExhausted {
                    job_id: handle.id().clone(),
                    attempts: handle.attempts(),
                    last_error,
                });
            }

            tokio::select! {
                biased;
                () = self.inner.cancel.cancelled() => return Err(self.cancelled(handle)),
                () = cancel.cancelled() => return Err(self.cancelled(handle)),
                () = tokio::time::sleep(policy.interval) => {}
            }
        }
    }

    // ── Result retrieval ─────────────────────────────────────────

    /// Download the raw result of a completed job. Allowed once per handle.
    ///
    /// A failed download is terminal: the handle becomes `Failed`.
    pub async fn fetch_result(&self, handle: &mut JobHandle) -> Result<Bytes, CoreError> {
        if handle.state() != JobState::Completed {
            return Err(CoreError::ResultUnavailable {
                job_id: handle.id().clone(),
                reason: format!("job is {}", handle.state()),
            });
        }
        if handle.result_fetched() {
            return Err(CoreError::ResultUnavailable {
                job_id: handle.id().clone(),
                reason: "result was already fetched".into(),
            });
        }

        handle.mark_fetched();
        match self.inner.client.result(handle.id().as_str()).await {
            Ok(bytes) => {
                debug!(job_id = %handle.id(), bytes = bytes.len(), "result fetched");
                Ok(bytes)
            }
            Err(e) => {
                let message = e.detail();
                warn!(job_id = %handle.id(), error = %e, "result fetch failed");
                handle.fail(message.clone());
                self.set_state(JobState::Failed);
                Err(CoreError::Fetch {
                    job_id: handle.id().clone(),
                    message,
                })
            }
        }
    }

    /// Decode a fetched payload with the configured decoder.
    ///
    /// A decode failure is terminal: the handle becomes `Failed`.
    pub fn decode(&self, handle: &mut JobHandle, bytes: Bytes) -> Result<DecodedRaster, CoreError> {
        self.inner.decoder.decode(bytes).map_err(|e| {
            let message = e.to_string();
            warn!(job_id = %handle.id(), error = %message, "result decode failed");
            handle.fail(message.clone());
            self.set_state(JobState::Failed);
            CoreError::Decode {
                job_id: handle.id().clone(),
                message,
            }
        })
    }

    // ── Composite flows ──────────────────────────────────────────

    /// Submit, wait, fetch and decode in one go.
    pub async fn run(&self, params: &SimulationParameters) -> Result<JobResult, CoreError> {
        let handle = self.submit(params).await?;
        self.collect(handle).await
    }

    /// Wait for a submitted job and turn it into a [`JobResult`].
    ///
    /// A job the service reports failed ends as
    /// [`CoreError::ServiceFailure`] carrying the service's message.
    pub async fn collect(&self, mut handle: JobHandle) -> Result<JobResult, CoreError> {
        match self.wait(&mut handle).await? {
            PollOutcome::Completed => {}
            PollOutcome::Failed { message } => {
                return Err(CoreError::ServiceFailure {
                    job_id: handle.id().clone(),
                    message,
                });
            }
            PollOutcome::StillRunning => {
                return Err(CoreError::Internal(format!(
                    "wait returned for job {} while still running",
                    handle.id()
                )));
            }
        }

        let bytes = self.fetch_result(&mut handle).await?;
        let raster = self.decode(&mut handle, bytes)?;
        Ok(handle.into_result(raster))
    }

    // ── Internals ────────────────────────────────────────────────

    fn set_state(&self, state: JobState) {
        self.inner.state.send_replace(state);
    }

    fn cancelled(&self, handle: &JobHandle) -> CoreError {
        info!(job_id = %handle.id(), "polling cancelled");
        self.set_state(JobState::Idle);
        CoreError::Cancelled {
            job_id: handle.id().clone(),
        }
    }
}

impl std::fmt::Debug for JobOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobOrchestrator")
            .field("service", &self.inner.client.base_url().as_str())
            .field("state", &self.current_state())
            .field("policy", &self.inner.policy)
            .finish_non_exhaustive()
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn build_transport(config: &PlannerConfig) -> TransportConfig {
    TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
