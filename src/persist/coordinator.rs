use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::fingerprint::{ElementHash, ScreenHash};
use crate::scrape::model::{NodeRef, WalkOutcome};
use crate::store::error::StoreError;
use crate::store::model::{AppRecord, ElementId, ScreenRecord, ScreenTransition, ScreenUpsert};
use crate::store::{ScrapeStore, StoreTx};

use super::hierarchy::{HierarchyError, build_edges};

// ============================================================================
// Batch state machine
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PersistPhase {
    Collecting,
    ClearingOldEdges,
    InsertingElements,
    Verifying,
    BuildingEdges,
    Committed,
    Failed { at: FailedPhase },
}

/// Phase in which a batch failed (a `Failed` cannot fail again).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailedPhase {
    Collecting,
    ClearingOldEdges,
    InsertingElements,
    Verifying,
    BuildingEdges,
    Committing,
}

impl fmt::Display for PersistPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistPhase::Failed { at } => write!(f, "Failed({:?})", at),
            other => write!(f, "{:?}", other),
        }
    }
}

impl fmt::Display for FailedPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

struct BatchState {
    phase: PersistPhase,
    history: Vec<PersistPhase>,
}

impl BatchState {
    fn new() -> Self {
        Self {
            phase: PersistPhase::Collecting,
            history: vec![PersistPhase::Collecting],
        }
    }

    fn advance(&mut self, next: PersistPhase) {
        debug!(from = %self.phase, to = %next, "persist phase");
        self.phase = next;
        self.history.push(next);
    }

    fn failed_phase(&self) -> FailedPhase {
        match self.phase {
            PersistPhase::Collecting => FailedPhase::Collecting,
            PersistPhase::ClearingOldEdges => FailedPhase::ClearingOldEdges,
            PersistPhase::InsertingElements => FailedPhase::InsertingElements,
            PersistPhase::Verifying => FailedPhase::Verifying,
            PersistPhase::BuildingEdges => FailedPhase::BuildingEdges,
            PersistPhase::Committed | PersistPhase::Failed { .. } => FailedPhase::Committing,
        }
    }
}

// ============================================================================
// Inputs / outputs
// ============================================================================

/// The screen the app session was on before this batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviousScreen {
    pub hash: ScreenHash,
    pub seen_at_ms: i64,
}

/// Everything one batch writes.
#[derive(Debug, Clone)]
pub struct ScrapeBatch<'a> {
    pub outcome: &'a WalkOutcome,
    pub screen: ScreenUpsert,
    pub previous: Option<PreviousScreen>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PersistReport {
    /// Aligned 1:1 with `outcome.elements`.
    pub assigned_ids: Vec<ElementId>,
    pub edges_cleared: usize,
    pub edges_written: usize,
    pub screen: ScreenRecord,
    pub transition: Option<ScreenTransition>,
    pub app: AppRecord,
    pub phases: Vec<PersistPhase>,
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("store failure while {phase}: {source}")]
    Store {
        phase: FailedPhase,
        #[source]
        source: StoreError,
    },

    #[error("store assigned {assigned} distinct ids for {expected} elements")]
    IdCountMismatch { expected: usize, assigned: usize },

    #[error("{persisted} of {expected} batch elements are persisted for '{app_id}'")]
    RowCountMismatch {
        app_id: String,
        expected: usize,
        persisted: usize,
    },

    #[error("{missing} cached parent/child elements no longer exist for '{app_id}'")]
    MissingCacheHits { app_id: String, missing: usize },

    #[error("edge reference error: {0}")]
    Hierarchy(#[from] HierarchyError),

    #[error("inserted {inserted} of {expected} hierarchy edges")]
    EdgeCountMismatch { expected: usize, inserted: usize },
}

impl PersistError {
    pub fn phase(&self) -> FailedPhase {
        match self {
            PersistError::Store { phase, .. } => *phase,
            PersistError::IdCountMismatch { .. }
            | PersistError::RowCountMismatch { .. }
            | PersistError::MissingCacheHits { .. } => FailedPhase::Verifying,
            PersistError::Hierarchy(_) | PersistError::EdgeCountMismatch { .. } => {
                FailedPhase::BuildingEdges
            }
        }
    }

    /// Integrity failures point at a defect rather than a flaky backend.
    pub fn is_integrity(&self) -> bool {
        !matches!(self, PersistError::Store { .. })
    }
}

// ============================================================================
// persist
// ============================================================================

/// Write one batch atomically.
///
/// Old edges go first: once elements are upserted, an edge left over from
/// the previous scrape could point at an id the backend reassigned. Counts
/// on the app row are refreshed last. Any error drops the transaction.
pub fn persist<S: ScrapeStore>(
    store: &mut S,
    batch: &ScrapeBatch<'_>,
) -> Result<PersistReport, PersistError> {
    let mut state = BatchState::new();

    let result = run(store, batch, &mut state);
    if let Err(err) = &result {
        let at = state.failed_phase();
        state.advance(PersistPhase::Failed { at });
        debug!(app_id = %batch.screen.app_id, error = %err, "batch rolled back");
    }
    result
}

fn run<S: ScrapeStore>(
    store: &mut S,
    batch: &ScrapeBatch<'_>,
    state: &mut BatchState,
) -> Result<PersistReport, PersistError> {
    let outcome = batch.outcome;
    let app_id = batch.screen.app_id.as_str();
    let now_ms = batch.screen.seen_at_ms;

    let store_err = |phase: FailedPhase| move |source: StoreError| PersistError::Store { phase, source };

    let mut tx = store.begin().map_err(store_err(state.failed_phase()))?;
    tx.ensure_app(app_id, now_ms).map_err(store_err(state.failed_phase()))?;

    // ---- Clearing old edges ----
    state.advance(PersistPhase::ClearingOldEdges);
    let edges_cleared = tx.delete_edges_for_app(app_id).map_err(store_err(state.failed_phase()))?;

    // ---- Inserting elements ----
    state.advance(PersistPhase::InsertingElements);
    let mut assigned_ids = Vec::with_capacity(outcome.elements.len());
    for element in &outcome.elements {
        let id = tx
            .upsert_element(app_id, &batch.screen.hash, element, now_ms)
            .map_err(store_err(state.failed_phase()))?;
        assigned_ids.push(id);
    }

    // ---- Verifying ----
    state.advance(PersistPhase::Verifying);
    let distinct: BTreeSet<ElementId> = assigned_ids.iter().copied().collect();
    if assigned_ids.len() != outcome.elements.len() || distinct.len() != outcome.elements.len() {
        return Err(PersistError::IdCountMismatch {
            expected: outcome.elements.len(),
            assigned: distinct.len(),
        });
    }

    let hashes: Vec<&ElementHash> = outcome.elements.iter().map(|e| &e.hash).collect();
    let persisted = tx
        .count_elements_with_hashes(app_id, &hashes)
        .map_err(store_err(state.failed_phase()))?;
    if persisted != outcome.elements.len() {
        return Err(PersistError::RowCountMismatch {
            app_id: app_id.to_string(),
            expected: outcome.elements.len(),
            persisted,
        });
    }

    let referenced_hits: Vec<ElementId> = outcome
        .links
        .iter()
        .flat_map(|l| [l.parent, l.child])
        .filter_map(|r| match r {
            NodeRef::StoreId(id) => Some(id),
            NodeRef::ListIndex(_) => None,
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let live = tx
        .count_elements_with_ids(app_id, &referenced_hits)
        .map_err(store_err(state.failed_phase()))?;
    if live != referenced_hits.len() {
        return Err(PersistError::MissingCacheHits {
            app_id: app_id.to_string(),
            missing: referenced_hits.len() - live,
        });
    }

    // ---- Building edges ----
    state.advance(PersistPhase::BuildingEdges);
    let edges = build_edges(&outcome.links, &assigned_ids, &outcome.cache_hits)?;
    let edges_written = tx.insert_edges(app_id, &edges).map_err(store_err(state.failed_phase()))?;
    if edges_written != edges.len() {
        return Err(PersistError::EdgeCountMismatch {
            expected: edges.len(),
            inserted: edges_written,
        });
    }

    let screen = tx.upsert_screen(&batch.screen).map_err(store_err(state.failed_phase()))?;

    let transition = match &batch.previous {
        Some(prev) if prev.hash != batch.screen.hash => {
            let duration_ms = (now_ms - prev.seen_at_ms).max(0);
            Some(
                tx.record_transition(app_id, &prev.hash, &batch.screen.hash, now_ms, duration_ms)
                    .map_err(store_err(state.failed_phase()))?,
            )
        }
        _ => None,
    };

    let app = tx
        .refresh_app_counts(app_id, now_ms)
        .map_err(store_err(state.failed_phase()))?;

    tx.commit().map_err(|source| PersistError::Store {
        phase: FailedPhase::Committing,
        source,
    })?;
    state.advance(PersistPhase::Committed);

    Ok(PersistReport {
        assigned_ids,
        edges_cleared,
        edges_written,
        screen,
        transition,
        app,
        phases: state.history.clone(),
    })
}
