use chrono::{DateTime, Utc};

use super::params::SimulationParameters;
use super::raster::DecodedRaster;
use crate::job::JobId;

/// A completed prediction kept in the catalog.
///
/// Sites are only ever handed out as `Arc<Site>`, so once created the
/// parameters, job id and raster cannot change.
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub params: SimulationParameters,
    pub job_id: JobId,
    pub raster: DecodedRaster,
    pub created_at: DateTime<Utc>,
}

impl Site {
    pub(crate) fn new(params: SimulationParameters, job_id: JobId, raster: DecodedRaster) -> Self {
        Self {
            params,
            job_id,
            raster,
            created_at: Utc::now(),
        }
    }

    /// The transmitter name the site was simulated under.
    pub fn name(&self) -> &str {
        &self.params.transmitter.name
    }
}
