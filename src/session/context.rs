use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::fingerprint::ScreenHash;
use crate::persist::coordinator::PreviousScreen;

/// A screen event as delivered by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenEvent {
    pub app_id: String,
    pub activity: String,
    pub title: Option<String>,
    pub observed_at_ms: i64,
}

impl ScreenEvent {
    pub fn new(app_id: impl Into<String>, activity: impl Into<String>, observed_at_ms: i64) -> Self {
        Self {
            app_id: app_id.into(),
            activity: activity.into(),
            title: None,
            observed_at_ms,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Per-app scrape session state. Only committed batches move it forward.
#[derive(Debug, Clone)]
pub struct AppSession {
    app_id: String,
    last_screen: Option<PreviousScreen>,
    depths: HashMap<ScreenHash, u32>,
    batches_committed: u64,
}

impl AppSession {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            last_screen: None,
            depths: HashMap::new(),
            batches_committed: 0,
        }
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn last_screen(&self) -> Option<&PreviousScreen> {
        self.last_screen.as_ref()
    }

    pub fn batches_committed(&self) -> u64 {
        self.batches_committed
    }

    /// Known depth of `hash`, else one below the current screen, else 0.
    pub fn navigation_depth_for(&self, hash: &ScreenHash) -> u32 {
        if let Some(depth) = self.depths.get(hash) {
            return *depth;
        }

        self.last_screen
            .as_ref()
            .and_then(|last| self.depths.get(&last.hash))
            .map(|depth| depth + 1)
            .unwrap_or(0)
    }

    /// Move the session onto `hash` after its batch committed.
    pub fn complete(&mut self, hash: ScreenHash, seen_at_ms: i64, depth: u32) {
        self.depths.entry(hash.clone()).or_insert(depth);
        self.last_screen = Some(PreviousScreen { hash, seen_at_ms });
        self.batches_committed += 1;
    }
}
