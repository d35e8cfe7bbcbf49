use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::scrape::model::WalkStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceKind {
    BatchCommitted,
    BatchFailed,
    WalkCancelled,
    IntegrityAlert,
}

/// One line of the scrape trace file.
#[derive(Debug, Serialize)]
pub struct ScrapeTraceEvent {
    pub timestamp_ms: u128,
    pub kind: TraceKind,
    pub app_id: String,

    pub screen_hash: Option<String>,
    pub generation: Option<u64>,
    pub walk: Option<WalkStats>,

    pub new_elements: Option<usize>,
    pub edges_written: Option<usize>,
    pub visit_count: Option<u32>,

    pub failed_phase: Option<String>,
    pub error: Option<String>,
    pub consecutive_failures: Option<u32>,
    pub registration_success_ratio: Option<f64>,
}

impl ScrapeTraceEvent {
    pub fn now(kind: TraceKind, app_id: &str) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default(),
            kind,
            app_id: app_id.to_string(),
            screen_hash: None,
            generation: None,
            walk: None,
            new_elements: None,
            edges_written: None,
            visit_count: None,
            failed_phase: None,
            error: None,
            consecutive_failures: None,
            registration_success_ratio: None,
        }
    }

    pub fn with_screen(mut self, hash: impl ToString) -> Self {
        self.screen_hash = Some(hash.to_string());
        self
    }

    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = Some(generation);
        self
    }

    pub fn with_walk(mut self, stats: &WalkStats) -> Self {
        self.walk = Some(stats.clone());
        self
    }

    pub fn with_writes(mut self, new_elements: usize, edges_written: usize, visit_count: u32) -> Self {
        self.new_elements = Some(new_elements);
        self.edges_written = Some(edges_written);
        self.visit_count = Some(visit_count);
        self
    }

    pub fn with_failure(mut self, phase: impl ToString, error: impl ToString) -> Self {
        self.failed_phase = Some(phase.to_string());
        self.error = Some(error.to_string());
        self
    }

    pub fn with_consecutive_failures(mut self, count: u32) -> Self {
        self.consecutive_failures = Some(count);
        self
    }

    pub fn with_registration_ratio(mut self, ratio: f64) -> Self {
        self.registration_success_ratio = Some(ratio);
        self
    }
}
