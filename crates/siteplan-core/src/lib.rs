// siteplan-core: Job orchestration and site catalog between siteplan-api and consumers.

pub mod config;
pub mod convert;
pub mod error;
pub mod job;
pub mod model;
pub mod orchestrator;
pub mod overlay;
pub mod planner;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{PlannerConfig, PollPolicy, TlsVerification};
pub use error::CoreError;
pub use job::{JobHandle, JobId, JobResult, JobState, PollOutcome};
pub use orchestrator::JobOrchestrator;
pub use overlay::{
    MemoryLayer, MemorySurface, NO_DATA_VALUE, OverlayId, OverlayStyle, OverlaySurface,
    SurfaceError, synchronize,
};
pub use planner::SitePlanner;
pub use store::SiteCatalog;
pub use stream::{SiteStream, SiteWatchStream};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    ColorScale, DecodeError, DecodedRaster, DisplaySettings, Environment, Polarization,
    RadioClimate, RasterDecoder, Receiver, SimulationParameters, SimulationSettings, Site,
    Transmitter,
};

// Cancellation is part of the public polling API.
pub use tokio_util::sync::CancellationToken;
