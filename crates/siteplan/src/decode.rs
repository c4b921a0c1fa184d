// ── GeoTIFF decoding ──
//
// The service answers `/result/{id}` with a single-band GeoTIFF. The CLI
// keeps the payload as-is for writing to disk; decoding only checks the
// TIFF header and reads the raster size from the first IFD.

use bytes::Bytes;

use siteplan_core::{DecodeError, DecodedRaster};

pub const GEOTIFF_MEDIA_TYPE: &str = "image/tiff";

const TAG_IMAGE_WIDTH: u16 = 256;
const TAG_IMAGE_LENGTH: u16 = 257;
const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;

#[derive(Debug, Clone, Copy)]
enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    fn u16(self, b: [u8; 2]) -> u16 {
        match self {
            Self::Little => u16::from_le_bytes(b),
            Self::Big => u16::from_be_bytes(b),
        }
    }

    fn u32(self, b: [u8; 4]) -> u32 {
        match self {
            Self::Little => u32::from_le_bytes(b),
            Self::Big => u32::from_be_bytes(b),
        }
    }
}

/// Checks for a TIFF (or BigTIFF) header and records the raster size
/// when the first IFD carries it.
pub fn decode_geotiff(bytes: Bytes) -> Result<DecodedRaster, DecodeError> {
    let order = match bytes.get(..2) {
        Some(b"II") => ByteOrder::Little,
        Some(b"MM") => ByteOrder::Big,
        _ => return Err(DecodeError::new("not a TIFF file (bad byte-order mark)")),
    };
    let magic = read_u16(&bytes, 2, order)
        .ok_or_else(|| DecodeError::new("truncated TIFF header"))?;

    match magic {
        42 => {
            let dimensions = classic_dimensions(&bytes, order);
            let raster = DecodedRaster::new(GEOTIFF_MEDIA_TYPE, bytes);
            Ok(match dimensions {
                Some((w, h)) => raster.with_dimensions(w, h),
                None => raster,
            })
        }
        // BigTIFF: 64-bit offsets, size left unread.
        43 => Ok(DecodedRaster::new(GEOTIFF_MEDIA_TYPE, bytes)),
        other => Err(DecodeError::new(format!(
            "not a TIFF file (magic number {other})"
        ))),
    }
}

fn classic_dimensions(bytes: &[u8], order: ByteOrder) -> Option<(u32, u32)> {
    let ifd = usize::try_from(read_u32(bytes, 4, order)?).ok()?;
    let count = usize::from(read_u16(bytes, ifd, order)?);

    let mut width = None;
    let mut height = None;
    for i in 0..count {
        let entry = ifd + 2 + i * 12;
        let tag = read_u16(bytes, entry, order)?;
        if tag != TAG_IMAGE_WIDTH && tag != TAG_IMAGE_LENGTH {
            continue;
        }
        let value = match read_u16(bytes, entry + 2, order)? {
            TYPE_SHORT => u32::from(read_u16(bytes, entry + 8, order)?),
            TYPE_LONG => read_u32(bytes, entry + 8, order)?,
            _ => continue,
        };
        if tag == TAG_IMAGE_WIDTH {
            width = Some(value);
        } else {
            height = Some(value);
        }
    }
    width.zip(height)
}

fn read_u16(bytes: &[u8], at: usize, order: ByteOrder) -> Option<u16> {
    let b = bytes.get(at..at + 2)?;
    Some(order.u16([b[0], b[1]]))
}

fn read_u32(bytes: &[u8], at: usize, order: ByteOrder) -> Option<u32> {
    let b = bytes.get(at..at + 4)?;
    Some(order.u32([b[0], b[1], b[2], b[3]]))
}
