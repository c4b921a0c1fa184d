//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use siteplan_config::ConfigError;
use siteplan_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const SERVICE: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const INTERRUPTED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the prediction service")]
    #[diagnostic(
        code(siteplan::connection_failed),
        help(
            "Check that the service is running and the URL is right.\n\
             Self-signed certificate? Try --insecure (-k) or set ca_cert in your profile."
        )
    )]
    ServiceUnreachable { detail: String },

    // ── Service ──────────────────────────────────────────────────────
    #[error("Prediction service rejected the request ({status}): {message}")]
    #[diagnostic(
        code(siteplan::rejected),
        help("Check the parameters with: siteplan params --validate")
    )]
    Rejected { status: u16, message: String },

    #[error("{message}")]
    #[diagnostic(code(siteplan::simulation_failed))]
    SimulationFailed { message: String },

    #[error("Task '{task_id}' not found")]
    #[diagnostic(
        code(siteplan::not_found),
        help("Task ids come from: siteplan predict --no-wait")
    )]
    TaskNotFound { task_id: String },

    // ── Waiting ──────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(
        code(siteplan::timeout),
        help(
            "Raise --max-attempts or --deadline, or pick the task up later with:\n  \
             siteplan result {task_id} --wait -f coverage.tif"
        )
    )]
    Timeout { task_id: String, message: String },

    #[error("Interrupted while waiting for task '{task_id}'")]
    #[diagnostic(
        code(siteplan::interrupted),
        help(
            "The task keeps running on the service. Collect it with:\n  \
             siteplan result {task_id} --wait -f coverage.tif"
        )
    )]
    Interrupted { task_id: String },

    #[error("{message}")]
    #[diagnostic(
        code(siteplan::not_ready),
        help("Pass --wait to block until the task finishes.")
    )]
    NotReady { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(siteplan::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(siteplan::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: siteplan config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No prediction service configured")]
    #[diagnostic(
        code(siteplan::no_config),
        help(
            "Create a profile with: siteplan config init\n\
             Or pass --service <URL> (SITEPLAN_SERVICE).\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(siteplan::config))]
    Config(ConfigError),

    // ── Overlays ─────────────────────────────────────────────────────
    #[error("Could not write overlay: {message}")]
    #[diagnostic(code(siteplan::overlay))]
    Overlay { message: String },

    #[error("{0}")]
    #[diagnostic(code(siteplan::internal))]
    Internal(String),

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(
        code(siteplan::json),
        help("Check the JSON file contents and try again.")
    )]
    Json(#[from] serde_json::Error),

    #[error("Could not render YAML: {0}")]
    #[diagnostic(code(siteplan::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ServiceUnreachable { .. } => exit_code::CONNECTION,
            Self::Rejected { .. } | Self::SimulationFailed { .. } => exit_code::SERVICE,
            Self::TaskNotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Interrupted { .. } => exit_code::INTERRUPTED,
            Self::Validation { .. } | Self::ProfileNotFound { .. } | Self::NoConfig { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let rendered = err.to_string();
        match err {
            CoreError::Validation { field, reason } => CliError::Validation { field, reason },

            CoreError::Submission {
                status: Some(status),
                message,
            } => CliError::Rejected { status, message },
            CoreError::Submission {
                status: None,
                message,
            } => CliError::ServiceUnreachable { detail: message },

            CoreError::Poll {
                job_id,
                status: Some(404),
                ..
            } => CliError::TaskNotFound {
                task_id: job_id.to_string(),
            },
            CoreError::Poll { .. } => CliError::ServiceUnreachable { detail: rendered },

            CoreError::PollBudgetExhausted { job_id, .. } => CliError::Timeout {
                task_id: job_id.to_string(),
                message: rendered,
            },

            CoreError::Cancelled { job_id } => CliError::Interrupted {
                task_id: job_id.to_string(),
            },

            CoreError::ServiceFailure { .. }
            | CoreError::Fetch { .. }
            | CoreError::Decode { .. } => CliError::SimulationFailed { message: rendered },

            CoreError::ResultUnavailable { .. } => CliError::NotReady { message: rendered },

            CoreError::IndexOutOfBounds { index, len } => CliError::Validation {
                field: "index".into(),
                reason: format!("{index} is out of bounds for {len} sites"),
            },

            CoreError::Surface(e) => CliError::Overlay {
                message: e.to_string(),
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ProfileNotFound { name, available } => {
                CliError::ProfileNotFound { name, available }
            }
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siteplan_core::JobId;

    #[test]
    fn submission_without_status_is_a_connection_error() {
        let err = CliError::from(CoreError::Submission {
            status: None,
            message: "connection refused".into(),
        });
        assert_eq!(err.exit_code(), exit_code::CONNECTION);
    }

    #[test]
    fn rejected_submission_keeps_service_message() {
        let err = CliError::from(CoreError::Submission {
            status: Some(422),
            message: "lat out of range".into(),
        });
        assert_eq!(err.exit_code(), exit_code::SERVICE);
        assert!(err.to_string().contains("lat out of range"));
    }

    #[test]
    fn unknown_task_maps_to_not_found() {
        let err = CliError::from(CoreError::Poll {
            job_id: JobId::from("nope"),
            status: Some(404),
            message: "not found".into(),
            transient: false,
        });
        assert!(matches!(err, CliError::TaskNotFound { ref task_id } if task_id == "nope"));
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
    }

    #[test]
    fn lifecycle_errors_have_distinct_codes() {
        let timeout = CliError::from(CoreError::PollBudgetExhausted {
            job_id: JobId::from("t"),
            attempts: 3,
            last_error: None,
        });
        let cancelled = CliError::from(CoreError::Cancelled {
            job_id: JobId::from("t"),
        });
        let failed = CliError::from(CoreError::ServiceFailure {
            job_id: JobId::from("t"),
            message: Some("terrain tiles missing".into()),
        });

        assert_eq!(timeout.exit_code(), exit_code::TIMEOUT);
        assert_eq!(cancelled.exit_code(), exit_code::INTERRUPTED);
        assert_eq!(failed.exit_code(), exit_code::SERVICE);
        assert!(failed.to_string().contains("terrain tiles missing"));
    }

    #[test]
    fn missing_profile_is_a_usage_error() {
        let err = CliError::from(ConfigError::ProfileNotFound {
            name: "lab".into(),
            available: "default".into(),
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }
}
