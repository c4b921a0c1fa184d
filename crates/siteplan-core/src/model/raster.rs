// ── Decoded rasters ──
//
// The core never looks inside a raster. It only carries what the
// external decoder produced from the service's result payload.

use bytes::Bytes;
use thiserror::Error;

/// A raster ready to be drawn as an overlay.
///
/// Opaque to the core: a media type, the decoded payload, and the pixel
/// dimensions when the decoder knows them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRaster {
    media_type: String,
    payload: Bytes,
    dimensions: Option<(u32, u32)>,
}

impl DecodedRaster {
    pub fn new(media_type: impl Into<String>, payload: Bytes) -> Self {
        Self {
            media_type: media_type.into(),
            payload,
            dimensions: None,
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.dimensions = Some((width, height));
        self
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// `(width, height)` in pixels, if known.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Raised by a [`RasterDecoder`] on malformed input.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct DecodeError {
    message: String,
}

impl DecodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Turns a raw result payload into a [`DecodedRaster`].
///
/// Implementations must be pure: same bytes in, same raster out.
/// Plain functions and closures with the matching signature implement
/// this trait.
pub trait RasterDecoder: Send + Sync {
    fn decode(&self, bytes: Bytes) -> Result<DecodedRaster, DecodeError>;
}

impl<F> RasterDecoder for F
where
    F: Fn(Bytes) -> Result<DecodedRaster, DecodeError> + Send + Sync,
{
    fn decode(&self, bytes: Bytes) -> Result<DecodedRaster, DecodeError> {
        self(bytes)
    }
}
