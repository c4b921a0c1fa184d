// ── Ordered site collection ──
//
// Sites live in insertion order, newest last. Every mutation publishes a
// fresh `Arc<Vec<Arc<Site>>>` snapshot over a `watch` channel, so readers
// never observe a half-applied change.

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::CoreError;
use crate::job::JobId;
use crate::model::{DecodedRaster, SimulationParameters, Site};
use crate::stream::SiteStream;

type Snapshot = Arc<Vec<Arc<Site>>>;

/// Ordered collection of completed predictions.
///
/// Identity is positional: index `i` is the i-th surviving site in
/// insertion order. Use [`position_of`](Self::position_of) to find a site
/// by the job that produced it.
pub struct SiteCatalog {
    sites: Vec<Arc<Site>>,
    snapshot: watch::Sender<Snapshot>,
}

impl SiteCatalog {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            sites: Vec::new(),
            snapshot,
        }
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Append a site built from `params` and `raster`.
    ///
    /// The parameters are cloned, so later edits to the caller's value do
    /// not reach the stored site.
    pub fn add_site(
        &mut self,
        params: &SimulationParameters,
        job_id: JobId,
        raster: DecodedRaster,
    ) -> Arc<Site> {
        let site = Arc::new(Site::new(params.clone(), job_id, raster));
        self.push(Arc::clone(&site));
        site
    }

    /// Append an already built site.
    pub(crate) fn push(&mut self, site: Arc<Site>) {
        self.sites.push(site);
        self.publish();
    }

    /// Remove and return the site at `index`.
    pub fn remove_site(&mut self, index: usize) -> Result<Arc<Site>, CoreError> {
        self.check_index(index)?;
        let site = self.sites.remove(index);
        self.publish();
        Ok(site)
    }

    /// Move the site at `from` so it ends up at `to`.
    pub fn move_site(&mut self, from: usize, to: usize) -> Result<(), CoreError> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from == to {
            return Ok(());
        }
        let site = self.sites.remove(from);
        self.sites.insert(to, site);
        self.publish();
        Ok(())
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn get(&self, index: usize) -> Option<Arc<Site>> {
        self.sites.get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Site>> {
        self.sites.iter()
    }

    /// Current index of the site produced by `job_id`.
    pub fn position_of(&self, job_id: &JobId) -> Option<usize> {
        self.sites.iter().position(|s| &s.job_id == job_id)
    }

    /// Point-in-time view of the catalog.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to catalog changes.
    pub fn subscribe(&self) -> SiteStream {
        SiteStream::new(self.snapshot.subscribe())
    }

    // ── Internals ────────────────────────────────────────────────────

    pub(crate) fn check_index(&self, index: usize) -> Result<(), CoreError> {
        if index < self.sites.len() {
            Ok(())
        } else {
            Err(CoreError::IndexOutOfBounds {
                index,
                len: self.sites.len(),
            })
        }
    }

    fn publish(&self) {
        // send_replace: there may be no subscribers, which is fine.
        self.snapshot.send_replace(Arc::new(self.sites.clone()));
    }
}

impl Default for SiteCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SiteCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteCatalog")
            .field("len", &self.sites.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn raster(tag: &'static [u8]) -> DecodedRaster {
        DecodedRaster::new("image/tiff", Bytes::from_static(tag))
    }

    fn named(name: &str) -> SimulationParameters {
        let mut params = SimulationParameters::default();
        params.transmitter.name = name.into();
        params
    }

    fn catalog_of(names: &[&str]) -> SiteCatalog {
        let mut catalog = SiteCatalog::new();
        for name in names {
            catalog.add_site(&named(name), JobId::from(*name), raster(b"II*\0"));
        }
        catalog
    }

    fn names(catalog: &SiteCatalog) -> Vec<String> {
        catalog.iter().map(|s| s.name().to_owned()).collect()
    }

    #[test]
    fn add_appends_in_order() {
        let catalog = catalog_of(&["a", "b", "c"]);
        assert_eq!(catalog.len(), 3);
        assert_eq!(names(&catalog), ["a", "b", "c"]);
        assert_eq!(catalog.position_of(&JobId::from("b")), Some(1));
        assert_eq!(catalog.position_of(&JobId::from("zz")), None);
    }

    #[test]
    fn stored_params_are_isolated_from_caller() {
        let mut catalog = SiteCatalog::new();
        let mut params = named("alpha");
        let site = catalog.add_site(&params, JobId::from("t-1"), raster(b"x"));

        params.transmitter.name = "mutated".into();
        params.transmitter.power_watts = 50.0;

        assert_eq!(site.name(), "alpha");
        assert_eq!(catalog.get(0).unwrap().params.transmitter.power_watts, 0.1);
    }

    #[test]
    fn remove_shifts_later_sites_down() {
        let mut catalog = catalog_of(&["a", "b", "c"]);
        let removed = catalog.remove_site(1).unwrap();
        assert_eq!(removed.name(), "b");
        assert_eq!(names(&catalog), ["a", "c"]);
    }

    #[test]
    fn remove_out_of_bounds_leaves_catalog_unchanged() {
        let mut catalog = catalog_of(&["a", "b"]);

        let err = catalog.remove_site(2).unwrap_err();
        assert!(matches!(err, CoreError::IndexOutOfBounds { index: 2, len: 2 }));
        assert_eq!(names(&catalog), ["a", "b"]);

        let mut empty = SiteCatalog::new();
        assert!(matches!(
            empty.remove_site(0),
            Err(CoreError::IndexOutOfBounds { index: 0, len: 0 })
        ));
    }

    #[test]
    fn move_reorders() {
        let mut catalog = catalog_of(&["a", "b", "c"]);
        catalog.move_site(0, 2).unwrap();
        assert_eq!(names(&catalog), ["b", "c", "a"]);

        assert!(catalog.move_site(0, 3).is_err());
        assert_eq!(names(&catalog), ["b", "c", "a"]);
    }

    #[test]
    fn snapshot_is_point_in_time() {
        let mut catalog = catalog_of(&["a"]);
        let before = catalog.snapshot();
        catalog.add_site(&named("b"), JobId::from("b"), raster(b"y"));

        assert_eq!(before.len(), 1);
        assert_eq!(catalog.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let mut catalog = SiteCatalog::new();
        let mut stream = catalog.subscribe();
        assert!(stream.current().is_empty());

        catalog.add_site(&named("a"), JobId::from("a"), raster(b"z"));
        let snap = stream.changed().await.unwrap();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].name(), "a");
    }
}
