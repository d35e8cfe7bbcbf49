use ui_scrape::fingerprint::{ElementHash, ScreenHash};
use ui_scrape::scrape::dedup::{DedupResolver, Resolution};
use ui_scrape::scrape::model::ScrapedElement;
use ui_scrape::screen::screen_model::ScreenContext;
use ui_scrape::store::error::StoreError;
use ui_scrape::store::model::{
    AppRecord, ElementId, HierarchyEdge, ScreenRecord, ScreenTransition, ScreenUpsert,
};
use ui_scrape::store::sqlite::{SqliteStore, SqliteTx};
use ui_scrape::store::{ScrapeStore, StoreTx};

/// Where the wrapped store misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Fail the element upsert after this many succeeded.
    UpsertElement { after: usize },
    InsertEdges,
    /// Report one edge fewer than were written.
    UndercountEdges,
    UpsertScreen,
    Commit,
    SaveScreenContext,
}

/// SQLite store with an injectable failure point.
pub struct FaultyStore {
    inner: SqliteStore,
    fault: Option<Fault>,
}

impl FaultyStore {
    pub fn new(inner: SqliteStore) -> Self {
        Self { inner, fault: None }
    }

    pub fn in_memory() -> Self {
        Self::new(SqliteStore::in_memory().unwrap())
    }

    pub fn set_fault(&mut self, fault: Option<Fault>) {
        self.fault = fault;
    }

    pub fn inner(&self) -> &SqliteStore {
        &self.inner
    }
}

fn injected(what: &str) -> StoreError {
    StoreError::Unavailable(format!("injected fault: {what}"))
}

impl DedupResolver for FaultyStore {
    fn resolve(&self, app_id: &str, hash: &ElementHash) -> Result<Resolution, StoreError> {
        self.inner.resolve(app_id, hash)
    }
}

impl ScrapeStore for FaultyStore {
    type Tx<'a> = FaultyTx<'a>;

    fn begin(&mut self) -> Result<FaultyTx<'_>, StoreError> {
        Ok(FaultyTx {
            inner: self.inner.begin()?,
            fault: self.fault,
            upserts: 0,
        })
    }

    fn save_screen_context(
        &mut self,
        app_id: &str,
        screen_hash: &ScreenHash,
        context: &ScreenContext,
        classified_at_ms: i64,
    ) -> Result<(), StoreError> {
        if self.fault == Some(Fault::SaveScreenContext) {
            return Err(injected("save_screen_context"));
        }
        self.inner
            .save_screen_context(app_id, screen_hash, context, classified_at_ms)
    }

    fn set_external_id(&mut self, id: ElementId, external_id: &str) -> Result<(), StoreError> {
        self.inner.set_external_id(id, external_id)
    }
}

pub struct FaultyTx<'a> {
    inner: SqliteTx<'a>,
    fault: Option<Fault>,
    upserts: usize,
}

impl StoreTx for FaultyTx<'_> {
    fn ensure_app(&mut self, app_id: &str, now_ms: i64) -> Result<(), StoreError> {
        self.inner.ensure_app(app_id, now_ms)
    }

    fn delete_edges_for_app(&mut self, app_id: &str) -> Result<usize, StoreError> {
        self.inner.delete_edges_for_app(app_id)
    }

    fn upsert_element(
        &mut self,
        app_id: &str,
        screen_hash: &ScreenHash,
        element: &ScrapedElement,
        now_ms: i64,
    ) -> Result<ElementId, StoreError> {
        if let Some(Fault::UpsertElement { after }) = self.fault {
            if self.upserts >= after {
                return Err(injected("upsert_element"));
            }
        }
        self.upserts += 1;
        self.inner.upsert_element(app_id, screen_hash, element, now_ms)
    }

    fn count_elements_with_hashes(
        &mut self,
        app_id: &str,
        hashes: &[&ElementHash],
    ) -> Result<usize, StoreError> {
        self.inner.count_elements_with_hashes(app_id, hashes)
    }

    fn count_elements_with_ids(&mut self, app_id: &str, ids: &[ElementId]) -> Result<usize, StoreError> {
        self.inner.count_elements_with_ids(app_id, ids)
    }

    fn insert_edges(&mut self, app_id: &str, edges: &[HierarchyEdge]) -> Result<usize, StoreError> {
        match self.fault {
            Some(Fault::InsertEdges) => Err(injected("insert_edges")),
            Some(Fault::UndercountEdges) => {
                let written = self.inner.insert_edges(app_id, edges)?;
                Ok(written.saturating_sub(1))
            }
            _ => self.inner.insert_edges(app_id, edges),
        }
    }

    fn upsert_screen(&mut self, screen: &ScreenUpsert) -> Result<ScreenRecord, StoreError> {
        if self.fault == Some(Fault::UpsertScreen) {
            return Err(injected("upsert_screen"));
        }
        self.inner.upsert_screen(screen)
    }

    fn record_transition(
        &mut self,
        app_id: &str,
        from: &ScreenHash,
        to: &ScreenHash,
        seen_at_ms: i64,
        duration_ms: i64,
    ) -> Result<ScreenTransition, StoreError> {
        self.inner
            .record_transition(app_id, from, to, seen_at_ms, duration_ms)
    }

    fn refresh_app_counts(&mut self, app_id: &str, now_ms: i64) -> Result<AppRecord, StoreError> {
        self.inner.refresh_app_counts(app_id, now_ms)
    }

    fn commit(self) -> Result<(), StoreError> {
        if self.fault == Some(Fault::Commit) {
            return Err(injected("commit"));
        }
        self.inner.commit()
    }
}
