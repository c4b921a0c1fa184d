// siteplan-api: Async Rust client for the SPLAT! coverage prediction service

pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use client::PredictionClient;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
pub use types::{PredictRequest, PredictResponse, StatusResponse, TaskStatus};
