pub mod error;
pub mod model;
pub mod sqlite;

use crate::fingerprint::{ElementHash, ScreenHash};
use crate::scrape::dedup::DedupResolver;
use crate::scrape::model::ScrapedElement;
use crate::screen::screen_model::ScreenContext;

use error::StoreError;
use model::{AppRecord, ElementId, HierarchyEdge, ScreenRecord, ScreenTransition, ScreenUpsert};

// ============================================================================
// Store traits: the operations the scrape pipeline needs from a backend
// ============================================================================

/// Backend for scrape batches.
///
/// Everything that touches identity or edges goes through a [`StoreTx`];
/// dropping a transaction without committing must roll it back.
pub trait ScrapeStore: DedupResolver {
    type Tx<'a>: StoreTx
    where
        Self: 'a;

    fn begin(&mut self) -> Result<Self::Tx<'_>, StoreError>;

    /// Per-screen classification, written outside the batch transaction.
    fn save_screen_context(
        &mut self,
        app_id: &str,
        screen_hash: &ScreenHash,
        context: &ScreenContext,
        classified_at_ms: i64,
    ) -> Result<(), StoreError>;

    fn set_external_id(&mut self, id: ElementId, external_id: &str) -> Result<(), StoreError>;
}

/// Operations that run inside one batch transaction.
pub trait StoreTx {
    /// Create the app row if missing. Counts are left untouched.
    fn ensure_app(&mut self, app_id: &str, now_ms: i64) -> Result<(), StoreError>;

    fn delete_edges_for_app(&mut self, app_id: &str) -> Result<usize, StoreError>;

    /// Insert, or on hash conflict touch `last_seen_ms`; returns the row id.
    /// Existing ids are never reassigned.
    fn upsert_element(
        &mut self,
        app_id: &str,
        screen_hash: &ScreenHash,
        element: &ScrapedElement,
        now_ms: i64,
    ) -> Result<ElementId, StoreError>;

    fn count_elements_with_hashes(
        &mut self,
        app_id: &str,
        hashes: &[&ElementHash],
    ) -> Result<usize, StoreError>;

    fn count_elements_with_ids(&mut self, app_id: &str, ids: &[ElementId]) -> Result<usize, StoreError>;

    fn insert_edges(&mut self, app_id: &str, edges: &[HierarchyEdge]) -> Result<usize, StoreError>;

    /// Insert with `visit_count = 1`, or bump `visit_count` and `last_seen_ms`.
    fn upsert_screen(&mut self, screen: &ScreenUpsert) -> Result<ScreenRecord, StoreError>;

    fn record_transition(
        &mut self,
        app_id: &str,
        from: &ScreenHash,
        to: &ScreenHash,
        seen_at_ms: i64,
        duration_ms: i64,
    ) -> Result<ScreenTransition, StoreError>;

    /// Recount elements and screens for the app.
    fn refresh_app_counts(&mut self, app_id: &str, now_ms: i64) -> Result<AppRecord, StoreError>;

    fn commit(self) -> Result<(), StoreError>
    where
        Self: Sized;
}
