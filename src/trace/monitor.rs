use std::collections::HashMap;

/// Counts consecutive integrity failures per app.
///
/// A single failure is retried by the next screen event and stays quiet.
/// Reaching the threshold (and every further multiple of it) raises an
/// alert on the developer channel.
#[derive(Debug, Clone)]
pub struct IntegrityMonitor {
    threshold: u32,
    consecutive: HashMap<String, u32>,
}

impl IntegrityMonitor {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            consecutive: HashMap::new(),
        }
    }

    /// Record a failure; returns the streak length when an alert is due.
    pub fn record_failure(&mut self, app_id: &str) -> Option<u32> {
        let count = self.consecutive.entry(app_id.to_string()).or_insert(0);
        *count += 1;

        if *count % self.threshold == 0 {
            Some(*count)
        } else {
            None
        }
    }

    pub fn record_success(&mut self, app_id: &str) {
        self.consecutive.remove(app_id);
    }

    pub fn consecutive_failures(&self, app_id: &str) -> u32 {
        self.consecutive.get(app_id).copied().unwrap_or(0)
    }
}
