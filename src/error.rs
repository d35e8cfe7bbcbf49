use thiserror::Error;

use crate::persist::coordinator::PersistError;
use crate::scrape::walker::WalkError;
use crate::store::error::StoreError;

/// Top-level failure of one scrape batch. Never shown to end users: the next
/// screen event retries.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Walk(#[from] WalkError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("tree produced no readable nodes")]
    EmptyTree,

    #[error("batch of generation {0} superseded before persistence")]
    Superseded(u64),

    #[error("scrape worker has stopped")]
    WorkerGone,
}

impl ScrapeError {
    /// True when the scrape was dropped on purpose rather than failing.
    pub fn is_abandoned(&self) -> bool {
        matches!(
            self,
            ScrapeError::Walk(WalkError::Cancelled { .. }) | ScrapeError::Superseded(_)
        )
    }
}
