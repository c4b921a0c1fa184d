// Wire types for the prediction service.
//
// Field names mirror the service's request model exactly; unit
// conversions (watts to dBm, kilometers to meters) happen before a
// `PredictRequest` is built.

use serde::{Deserialize, Serialize};

/// Body of `POST /predict`.
///
/// Flat on purpose: the service validates each field independently and
/// rejects the request with a 422 body if any is out of range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    // Transmitter
    pub lat: f64,
    pub lon: f64,
    pub tx_height: f64,
    /// Transmit power in dBm.
    pub tx_power: f64,
    pub tx_gain: f64,
    pub frequency_mhz: f64,

    // Receiver
    pub rx_height: f64,
    pub rx_gain: f64,
    pub signal_threshold: f64,
    pub system_loss: f64,

    // Environment
    pub clutter_height: f64,
    pub ground_dielectric: f64,
    pub ground_conductivity: f64,
    pub atmosphere_bending: f64,
    pub radio_climate: String,
    pub polarization: String,

    // Model settings
    /// Model range in meters.
    pub radius: f64,
    pub situation_fraction: f64,
    pub time_fraction: f64,
    pub high_resolution: bool,

    // Output settings
    pub colormap: String,
    pub min_dbm: f64,
    pub max_dbm: f64,
}

/// Response of `POST /predict`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub task_id: String,
}

/// Task lifecycle as reported by `GET /status/{task_id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Deployed services report `processing` for queued and running tasks.
    #[serde(alias = "processing")]
    Running,
    Completed,
    Failed,
}

/// Response of `GET /status/{task_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub task_id: Option<String>,
    pub status: TaskStatus,
    #[serde(default)]
    pub error: Option<String>,
}
