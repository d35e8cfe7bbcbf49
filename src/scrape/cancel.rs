use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counter bumped on every screen event. A walk started under an
/// older generation is abandoned.
#[derive(Debug, Clone, Default)]
pub struct ScrapeGeneration {
    current: Arc<AtomicU64>,
}

impl ScrapeGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation, superseding every outstanding token.
    pub fn begin(&self) -> CancelToken {
        let mine = self.current.fetch_add(1, Ordering::AcqRel) + 1;
        CancelToken {
            current: Arc::clone(&self.current),
            mine,
        }
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone)]
pub struct CancelToken {
    current: Arc<AtomicU64>,
    mine: u64,
}

impl CancelToken {
    /// A token no event can supersede.
    pub fn detached() -> Self {
        Self {
            current: Arc::new(AtomicU64::new(0)),
            mine: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.mine
    }

    pub fn is_cancelled(&self) -> bool {
        self.current.load(Ordering::Acquire) != self.mine
    }
}
