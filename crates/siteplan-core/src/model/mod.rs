// ── Domain model ──
//
// Plain-value types shared by the orchestrator, the catalog, and consumers.

mod params;
mod raster;
mod site;

pub use params::{
    ColorScale, DisplaySettings, Environment, Polarization, RadioClimate, Receiver,
    SimulationParameters, SimulationSettings, Transmitter,
};
pub use raster::{DecodeError, DecodedRaster, RasterDecoder};
pub use site::Site;
