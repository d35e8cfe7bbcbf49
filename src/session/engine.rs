use std::collections::HashMap;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::ScrapeError;
use crate::fingerprint::{
    DEFAULT_TOP_ELEMENTS, ScreenHash, ScreenSignature, fingerprint_screen,
};
use crate::persist::coordinator::{PersistError, ScrapeBatch, persist};
use crate::registrar::{IdentifierRegistrar, RegistrationMetadata, RegistrationStats};
use crate::scrape::cancel::CancelToken;
use crate::scrape::model::{WalkLimits, WalkOutcome, WalkStats};
use crate::scrape::walker::{WalkError, walk};
use crate::screen::classifier::{annotate_elements, classify_screen};
use crate::screen::screen_model::ScreenContext;
use crate::store::ScrapeStore;
use crate::store::model::{AppRecord, ElementId, ScreenRecord, ScreenTransition, ScreenUpsert};
use crate::trace::logger::TraceLogger;
use crate::trace::monitor::IntegrityMonitor;
use crate::trace::trace::{ScrapeTraceEvent, TraceKind};
use crate::tree::node::UiNode;

use super::context::{AppSession, ScreenEvent};

// ============================================================================
// Engine configuration
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub limits: WalkLimits,
    /// Significant elements folded into the screen hash.
    pub top_elements: usize,
    pub integrity_alert_threshold: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            limits: WalkLimits::default(),
            top_elements: DEFAULT_TOP_ELEMENTS,
            integrity_alert_threshold: 3,
        }
    }
}

/// Summary of one committed batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub app_id: String,
    pub screen_hash: ScreenHash,
    pub screen: ScreenRecord,
    pub app: AppRecord,
    pub transition: Option<ScreenTransition>,
    /// Ids of the elements inserted by this batch, in traversal order.
    pub new_element_ids: Vec<ElementId>,
    pub cache_hits: usize,
    pub edges_written: usize,
    pub context: Option<ScreenContext>,
    pub registration: RegistrationStats,
    pub walk: WalkStats,
}

// ============================================================================
// ScrapeEngine
// ============================================================================

/// Runs scrape batches end to end against one store.
///
/// Batches go through `&mut self`, so two batches never overlap.
pub struct ScrapeEngine<S, R> {
    store: S,
    registrar: R,
    config: EngineConfig,
    sessions: HashMap<String, AppSession>,
    monitor: IntegrityMonitor,
    tracer: TraceLogger,
    registration: RegistrationStats,
}

impl<S: ScrapeStore, R: IdentifierRegistrar> ScrapeEngine<S, R> {
    pub fn new(store: S, registrar: R, config: EngineConfig) -> Self {
        Self {
            store,
            registrar,
            monitor: IntegrityMonitor::new(config.integrity_alert_threshold),
            config,
            sessions: HashMap::new(),
            tracer: TraceLogger::disabled(),
            registration: RegistrationStats::default(),
        }
    }

    pub fn with_tracer(mut self, tracer: TraceLogger) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn session(&self, app_id: &str) -> Option<&AppSession> {
        self.sessions.get(app_id)
    }

    pub fn monitor(&self) -> &IntegrityMonitor {
        &self.monitor
    }

    /// Registration outcomes across every batch so far.
    pub fn registration_stats(&self) -> RegistrationStats {
        self.registration
    }

    /// Walk `root` against this engine's store and commit the result.
    pub fn scrape<N: UiNode>(
        &mut self,
        event: &ScreenEvent,
        root: N,
        cancel: &CancelToken,
    ) -> Result<BatchReport, ScrapeError> {
        let outcome = match walk(root, &event.app_id, &self.store, &self.config.limits, cancel) {
            Ok(outcome) => outcome,
            Err(err) => {
                if let WalkError::Cancelled { generation } = &err {
                    self.tracer.log(
                        &ScrapeTraceEvent::now(TraceKind::WalkCancelled, &event.app_id)
                            .with_generation(*generation),
                    );
                }
                return Err(err.into());
            }
        };

        self.commit(event, outcome)
    }

    /// Persist a finished walk, then run the best-effort steps.
    pub fn commit(
        &mut self,
        event: &ScreenEvent,
        mut outcome: WalkOutcome,
    ) -> Result<BatchReport, ScrapeError> {
        if outcome.is_empty() {
            return Err(ScrapeError::EmptyTree);
        }

        annotate_elements(&mut outcome);

        let signature =
            ScreenSignature::new(&event.app_id, &event.activity, event.title.as_deref());
        let screen_hash = fingerprint_screen(&signature, &outcome.observed, self.config.top_elements);

        let session = self
            .sessions
            .entry(event.app_id.clone())
            .or_insert_with(|| AppSession::new(&event.app_id));
        let depth = session.navigation_depth_for(&screen_hash);

        let batch = ScrapeBatch {
            outcome: &outcome,
            screen: ScreenUpsert {
                hash: screen_hash.clone(),
                app_id: event.app_id.clone(),
                activity: event.activity.clone(),
                title: signature.title.clone(),
                navigation_depth: depth,
                element_count: outcome.observed.len() as u32,
                seen_at_ms: event.observed_at_ms,
            },
            previous: session.last_screen().cloned(),
        };

        let report = match persist(&mut self.store, &batch) {
            Ok(report) => report,
            Err(err) => {
                self.on_persist_failure(&event.app_id, &screen_hash, &err);
                return Err(err.into());
            }
        };

        self.monitor.record_success(&event.app_id);
        session.complete(screen_hash.clone(), event.observed_at_ms, depth);

        let context = classify_screen(&signature, &outcome.observed, depth);
        let context = match self.store.save_screen_context(
            &event.app_id,
            &screen_hash,
            &context,
            event.observed_at_ms,
        ) {
            Ok(()) => Some(context),
            Err(err) => {
                warn!(app_id = %event.app_id, screen = %screen_hash, error = %err, "screen context not saved");
                None
            }
        };

        let registration = self.register_new(&outcome, &report.assigned_ids);

        self.tracer.log(
            &ScrapeTraceEvent::now(TraceKind::BatchCommitted, &event.app_id)
                .with_screen(&screen_hash)
                .with_walk(&outcome.stats)
                .with_writes(
                    report.assigned_ids.len(),
                    report.edges_written,
                    report.screen.visit_count,
                )
                .with_registration_ratio(self.registration.success_ratio()),
        );

        info!(
            app_id = %event.app_id,
            screen = %screen_hash,
            new = report.assigned_ids.len(),
            cached = outcome.cache_hits.len(),
            edges = report.edges_written,
            visits = report.screen.visit_count,
            "batch committed"
        );

        Ok(BatchReport {
            app_id: event.app_id.clone(),
            screen_hash,
            screen: report.screen,
            app: report.app,
            transition: report.transition,
            new_element_ids: report.assigned_ids,
            cache_hits: outcome.cache_hits.len(),
            edges_written: report.edges_written,
            context,
            registration,
            walk: outcome.stats,
        })
    }

    fn on_persist_failure(&mut self, app_id: &str, screen_hash: &ScreenHash, err: &PersistError) {
        warn!(app_id, screen = %screen_hash, phase = %err.phase(), error = %err, "batch failed");
        self.tracer.log(
            &ScrapeTraceEvent::now(TraceKind::BatchFailed, app_id)
                .with_screen(screen_hash)
                .with_failure(err.phase(), err),
        );

        if !err.is_integrity() {
            return;
        }

        if let Some(streak) = self.monitor.record_failure(app_id) {
            error!(app_id, streak, error = %err, "repeated integrity failures");
            self.tracer.log(
                &ScrapeTraceEvent::now(TraceKind::IntegrityAlert, app_id)
                    .with_screen(screen_hash)
                    .with_failure(err.phase(), err)
                    .with_consecutive_failures(streak),
            );
        }
    }

    fn register_new(&mut self, outcome: &WalkOutcome, ids: &[ElementId]) -> RegistrationStats {
        let mut stats = RegistrationStats::default();

        for (element, id) in outcome.elements.iter().zip(ids) {
            let metadata = RegistrationMetadata {
                app_id: outcome.app_id.clone(),
                hash: element.hash.clone(),
                class_name: element.class_name.clone(),
                resource_id: element.resource_id.clone(),
                label: element.text.clone().or_else(|| element.description.clone()),
            };

            match self.registrar.register(*id, &metadata) {
                Ok(external) => {
                    stats.record(true);
                    if let Some(external) = external {
                        if let Err(err) = self.store.set_external_id(*id, &external.0) {
                            warn!(element = %id, error = %err, "external id not stored");
                        }
                    }
                }
                Err(err) => {
                    stats.record(false);
                    warn!(element = %id, error = %err, "registration failed");
                }
            }
        }

        self.registration.merge(&stats);
        stats
    }
}
