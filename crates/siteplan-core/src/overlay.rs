// ── Overlay synchronization ──
//
// Keeps an external drawing surface consistent with the site catalog.
// The surface may carry layers the core did not create (basemaps,
// annotations); those are never touched.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::{DecodedRaster, Site};
use crate::store::SiteCatalog;

/// No-data sentinel the prediction service writes into result rasters.
pub const NO_DATA_VALUE: f64 = 255.0;

/// How one overlay should be drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    /// `0.0` transparent to `1.0` opaque.
    pub opacity: f64,
    pub no_data: f64,
    /// Human-readable layer name (the site's transmitter name).
    pub label: String,
}

impl OverlayStyle {
    pub fn for_site(site: &Site) -> Self {
        Self {
            opacity: site.params.display.opacity(),
            no_data: NO_DATA_VALUE,
            label: site.name().to_owned(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("Unknown overlay {0}")]
    UnknownOverlay(String),

    #[error("Surface rejected overlay: {0}")]
    Rejected(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A drawing surface that can show raster overlays.
///
/// Implementations must report, via `list_overlays(true)`, exactly the
/// overlays added through `add_overlay` and not yet removed. Overlays
/// added later are drawn above earlier ones.
pub trait OverlaySurface {
    type Handle: Clone + fmt::Debug;

    fn add_overlay(
        &mut self,
        raster: &DecodedRaster,
        style: &OverlayStyle,
    ) -> Result<Self::Handle, SurfaceError>;

    fn remove_overlay(&mut self, handle: &Self::Handle) -> Result<(), SurfaceError>;

    /// Overlays owned (or not owned) by the core, bottom to top.
    fn list_overlays(&self, owned_by_core: bool) -> Vec<Self::Handle>;
}

/// Rebuild the core's overlays from the catalog.
///
/// Removes every core-owned overlay, then adds one per site in catalog
/// order. Returns the number of overlays added. If an add fails, the
/// overlays added by this pass are taken down again before the error is
/// returned.
pub fn synchronize<S: OverlaySurface>(
    catalog: &SiteCatalog,
    surface: &mut S,
) -> Result<usize, CoreError> {
    draw(catalog.iter(), surface)
}

/// [`synchronize`] over any ordered run of sites.
pub(crate) fn draw<'a, S: OverlaySurface>(
    sites: impl IntoIterator<Item = &'a Arc<Site>>,
    surface: &mut S,
) -> Result<usize, CoreError> {
    let stale = surface.list_overlays(true);
    for handle in &stale {
        surface.remove_overlay(handle)?;
    }

    let mut added = Vec::new();
    for site in sites {
        match surface.add_overlay(&site.raster, &OverlayStyle::for_site(site)) {
            Ok(handle) => added.push(handle),
            Err(e) => {
                for handle in added.iter().rev() {
                    if let Err(undo) = surface.remove_overlay(handle) {
                        warn!(?handle, error = %undo, "could not take down partial overlay");
                    }
                }
                return Err(e.into());
            }
        }
    }

    debug!(removed = stale.len(), added = added.len(), "overlays synchronized");
    Ok(added.len())
}

// ── In-memory surface ────────────────────────────────────────────

/// Identifier handed out by [`MemorySurface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlayId(u64);

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "overlay-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryLayer {
    pub id: OverlayId,
    pub owned_by_core: bool,
    pub label: String,
    /// `None` for foreign layers.
    pub raster: Option<DecodedRaster>,
    pub opacity: f64,
    pub no_data: Option<f64>,
}

/// A surface that keeps its layer stack in memory, bottom to top.
///
/// Useful for tests and headless sessions. Foreign layers can be added
/// with [`add_foreign`](Self::add_foreign) to stand in for basemaps.
#[derive(Debug, Default)]
pub struct MemorySurface {
    layers: Vec<MemoryLayer>,
    next_id: u64,
    reject_adds: bool,
    reject_next: bool,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a layer the core does not own.
    pub fn add_foreign(&mut self, label: impl Into<String>) -> OverlayId {
        let id = self.allocate();
        self.layers.push(MemoryLayer {
            id,
            owned_by_core: false,
            label: label.into(),
            raster: None,
            opacity: 1.0,
            no_data: None,
        });
        id
    }

    /// Make subsequent `add_overlay` calls fail until reset.
    pub fn reject_adds(&mut self, reject: bool) {
        self.reject_adds = reject;
    }

    /// Make only the next `add_overlay` call fail.
    pub fn reject_next_add(&mut self) {
        self.reject_next = true;
    }

    pub fn layers(&self) -> &[MemoryLayer] {
        &self.layers
    }

    /// Core-owned rasters, bottom to top.
    pub fn core_rasters(&self) -> Vec<&DecodedRaster> {
        self.layers
            .iter()
            .filter(|l| l.owned_by_core)
            .filter_map(|l| l.raster.as_ref())
            .collect()
    }

    fn allocate(&mut self) -> OverlayId {
        self.next_id += 1;
        OverlayId(self.next_id)
    }
}

impl OverlaySurface for MemorySurface {
    type Handle = OverlayId;

    fn add_overlay(
        &mut self,
        raster: &DecodedRaster,
        style: &OverlayStyle,
    ) -> Result<OverlayId, SurfaceError> {
        if self.reject_adds || std::mem::take(&mut self.reject_next) {
            return Err(SurfaceError::Rejected(style.label.clone()));
        }
        let id = self.allocate();
        self.layers.push(MemoryLayer {
            id,
            owned_by_core: true,
            label: style.label.clone(),
            raster: Some(raster.clone()),
            opacity: style.opacity,
            no_data: Some(style.no_data),
        });
        Ok(id)
    }

    fn remove_overlay(&mut self, handle: &OverlayId) -> Result<(), SurfaceError> {
        let pos = self
            .layers
            .iter()
            .position(|l| l.id == *handle)
            .ok_or_else(|| SurfaceError::UnknownOverlay(handle.to_string()))?;
        self.layers.remove(pos);
        Ok(())
    }

    fn list_overlays(&self, owned_by_core: bool) -> Vec<OverlayId> {
        self.layers
            .iter()
            .filter(|l| l.owned_by_core == owned_by_core)
            .map(|l| l.id)
            .collect()
    }
}
