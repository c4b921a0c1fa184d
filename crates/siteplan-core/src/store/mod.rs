// ── Site catalog ──
//
// Ordered storage for completed predictions, with push-based change
// notification to subscribers.

mod catalog;

pub use catalog::SiteCatalog;
