use thiserror::Error;

/// Top-level error type for the `siteplan-api` crate.
///
/// Covers every failure mode of the prediction service endpoints:
/// transport, URL construction, non-success responses, and body decoding.
/// `siteplan-core` maps these into phase-specific errors (submission,
/// polling, result retrieval).
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Service ─────────────────────────────────────────────────────
    /// The service answered with a non-success status. `body` is the
    /// response body as sent, which the service uses as its error detail.
    #[error("Service error (HTTP {status}): {body}")]
    Service { status: u16, body: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Service { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the service reported the resource as unknown.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Service { status: 404, .. } => true,
            _ => false,
        }
    }

    /// HTTP status of a non-success response. `None` when the request
    /// never got an answer.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Service { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// The detail message the service sent back, if any.
    ///
    /// For [`Error::Service`] this is the response body verbatim; every
    /// other variant falls back to its display form.
    pub fn detail(&self) -> String {
        match self {
            Self::Service { body, .. } if !body.is_empty() => body.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_detail_is_body_verbatim() {
        let err = Error::Service {
            status: 422,
            body: r#"{"detail":"frequency_mhz out of range"}"#.into(),
        };
        assert_eq!(err.detail(), r#"{"detail":"frequency_mhz out of range"}"#);
        assert!(!err.is_transient());
    }

    #[test]
    fn empty_body_falls_back_to_display() {
        let err = Error::Service {
            status: 503,
            body: String::new(),
        };
        assert_eq!(err.detail(), "Service error (HTTP 503): ");
        assert!(err.is_transient());
    }

    #[test]
    fn not_found_is_detected() {
        let err = Error::Service {
            status: 404,
            body: r#"{"error":"Task not found"}"#.into(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.status(), Some(404));
    }
}
