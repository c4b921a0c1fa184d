// ── Planner session ──
//
// Owns the control flow from a finished job to a drawn overlay: redraw
// the surface with the result appended, then commit it to the catalog.
// Catalog and surface share one lock so nobody sees one without the other.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::CoreError;
use crate::job::JobResult;
use crate::model::{SimulationParameters, Site};
use crate::orchestrator::JobOrchestrator;
use crate::overlay::{OverlaySurface, draw, synchronize};
use crate::store::SiteCatalog;
use crate::stream::SiteStream;

/// A planning session: one orchestrator, one catalog, one surface.
///
/// Every catalog change is all-or-nothing. The surface is redrawn for the
/// new site order first; only when that succeeds does the catalog change
/// and subscribers hear about it. On failure the catalog is untouched,
/// the surface is redrawn from it, and the error is returned.
pub struct SitePlanner<S: OverlaySurface> {
    orchestrator: JobOrchestrator,
    inner: Mutex<PlannerInner<S>>,
}

struct PlannerInner<S> {
    catalog: SiteCatalog,
    surface: S,
}

impl<S: OverlaySurface> SitePlanner<S> {
    pub fn new(orchestrator: JobOrchestrator, surface: S) -> Self {
        Self {
            orchestrator,
            inner: Mutex::new(PlannerInner {
                catalog: SiteCatalog::new(),
                surface,
            }),
        }
    }

    pub fn orchestrator(&self) -> &JobOrchestrator {
        &self.orchestrator
    }

    /// Run a prediction and add it as a site.
    ///
    /// The job runs without holding the session lock; only the final
    /// append-and-sync is serialized.
    pub async fn simulate(&self, params: &SimulationParameters) -> Result<Arc<Site>, CoreError> {
        let result = self.orchestrator.run(params).await?;
        self.add_result(result).await
    }

    /// Append a finished job to the catalog and redraw.
    pub async fn add_result(&self, result: JobResult) -> Result<Arc<Site>, CoreError> {
        let mut inner = self.inner.lock().await;
        let PlannerInner { catalog, surface } = &mut *inner;

        let site = Arc::new(Site::new(result.params, result.job_id, result.raster));
        let staged = catalog.iter().chain(std::iter::once(&site));
        draw(staged, surface).inspect_err(|e| restore(catalog, surface, e))?;

        catalog.push(Arc::clone(&site));
        info!(job_id = %site.job_id, site = %site.name(), sites = catalog.len(), "site added");
        Ok(site)
    }

    /// Remove the site at `index` and redraw.
    pub async fn remove_site(&self, index: usize) -> Result<Arc<Site>, CoreError> {
        let mut inner = self.inner.lock().await;
        let PlannerInner { catalog, surface } = &mut *inner;

        catalog.check_index(index)?;
        let staged = catalog
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, site)| site);
        draw(staged, surface).inspect_err(|e| restore(catalog, surface, e))?;

        let site = catalog.remove_site(index)?;
        info!(job_id = %site.job_id, index, sites = catalog.len(), "site removed");
        Ok(site)
    }

    /// Reorder a site and redraw.
    pub async fn move_site(&self, from: usize, to: usize) -> Result<(), CoreError> {
        let mut inner = self.inner.lock().await;
        let PlannerInner { catalog, surface } = &mut *inner;

        catalog.check_index(from)?;
        catalog.check_index(to)?;
        let mut staged: Vec<&Arc<Site>> = catalog.iter().collect();
        let moved = staged.remove(from);
        staged.insert(to, moved);
        draw(staged, surface).inspect_err(|e| restore(catalog, surface, e))?;

        catalog.move_site(from, to)
    }

    /// Rebuild every core overlay from the catalog.
    ///
    /// Call after anything outside the core disturbed the surface, such
    /// as a base-layer swap.
    pub async fn redraw(&self) -> Result<usize, CoreError> {
        let mut inner = self.inner.lock().await;
        let PlannerInner { catalog, surface } = &mut *inner;
        sync_logged(catalog, surface)
    }

    pub async fn sites(&self) -> Arc<Vec<Arc<Site>>> {
        self.inner.lock().await.catalog.snapshot()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.catalog.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.catalog.is_empty()
    }

    pub async fn subscribe(&self) -> SiteStream {
        self.inner.lock().await.catalog.subscribe()
    }

    /// Read the catalog and surface together under the session lock.
    pub async fn inspect<R>(&self, f: impl FnOnce(&SiteCatalog, &S) -> R) -> R {
        let inner = self.inner.lock().await;
        f(&inner.catalog, &inner.surface)
    }

    /// Take the surface back, ending the session.
    pub fn into_surface(self) -> S {
        self.inner.into_inner().surface
    }
}

fn sync_logged<S: OverlaySurface>(
    catalog: &SiteCatalog,
    surface: &mut S,
) -> Result<usize, CoreError> {
    synchronize(catalog, surface).inspect_err(|e| {
        warn!(error = %e, "overlay synchronization failed");
    })
}

/// Put the surface back in step with the unchanged catalog after a
/// rejected redraw.
fn restore<S: OverlaySurface>(catalog: &SiteCatalog, surface: &mut S, cause: &CoreError) {
    warn!(error = %cause, "overlay redraw failed; catalog unchanged");
    if let Err(e) = synchronize(catalog, surface) {
        warn!(error = %e, "could not restore overlays; call redraw() to retry");
    }
}
