// Prediction service HTTP client
//
// Wraps `reqwest::Client` with endpoint URL construction and response
// classification. Non-success responses are surfaced with their body
// intact because the service puts its error detail there.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::{PredictRequest, PredictResponse, StatusResponse};

/// Raw HTTP client for the coverage prediction service.
///
/// One instance talks to one service base URL. Every method performs
/// exactly one request; retry and polling policy belong to the caller.
#[derive(Debug, Clone)]
pub struct PredictionClient {
    http: reqwest::Client,
    base_url: Url,
}

impl PredictionClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the service root (e.g. `http://localhost:8080` or
    /// `https://planner.example.org/api/`). Endpoints are resolved
    /// relative to it.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, normalize_base(base_url)?))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// Parse `base` and wrap an existing `reqwest::Client`.
    pub fn from_reqwest(base: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = normalize_base(Url::parse(base)?)?;
        Ok(Self::with_client(http, base_url))
    }

    /// The service base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Submit a coverage prediction.
    ///
    /// `POST /predict`
    pub async fn predict(&self, request: &PredictRequest) -> Result<PredictResponse, Error> {
        let url = self.base_url.join("predict")?;
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(Error::Transport)?;

        parse_json(resp).await
    }

    /// Check the status of a submitted task.
    ///
    /// `GET /status/{task_id}`
    pub async fn status(&self, task_id: &str) -> Result<StatusResponse, Error> {
        let url = self.task_url("status", task_id)?;
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;

        parse_json(resp).await
    }

    /// Download the raster produced by a completed task.
    ///
    /// `GET /result/{task_id}`
    ///
    /// Returns the body as-is (a GeoTIFF for the reference service).
    pub async fn result(&self, task_id: &str) -> Result<Bytes, Error> {
        let url = self.task_url("result", task_id)?;
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;
        let resp = ensure_success(resp).await?;

        resp.bytes().await.map_err(Error::Transport)
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/{endpoint}/{task_id}` with the task id percent-encoded
    /// as a single path segment.
    fn task_url(&self, endpoint: &str, task_id: &str) -> Result<Url, Error> {
        let mut url = self.base_url.join(endpoint)?;
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(task_id);
        }
        Ok(url)
    }
}

// ── Response helpers ─────────────────────────────────────────────────

/// Pass through 2xx responses; turn anything else into `Error::Service`
/// carrying the response body.
async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    debug!(status = status.as_u16(), "service returned non-success status");
    Err(Error::Service {
        status: status.as_u16(),
        body,
    })
}

async fn parse_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let resp = ensure_success(resp).await?;
    let body = resp.text().await.map_err(Error::Transport)?;

    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body,
    })
}

/// Ensure the base URL ends in `/` so `Url::join` appends endpoints
/// instead of replacing the last path segment.
fn normalize_base(mut url: Url) -> Result<Url, Error> {
    if url.cannot_be_a_base() {
        return Err(Error::InvalidUrl(
            url::ParseError::RelativeUrlWithCannotBeABaseBase,
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
