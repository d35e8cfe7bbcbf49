//! UI-tree scraping with content-addressed deduplication and persistent
//! hierarchy reconstruction.
//!
//! A scrape batch walks the live tree ([`scrape::walker`]), fingerprints
//! every node ([`fingerprint`]), persists new elements and rebuilds the
//! app's hierarchy edges in one transaction ([`persist`]), then records
//! screen metadata and registers new elements on a best-effort basis
//! ([`session::engine`]).

pub mod cli;
pub mod error;
pub mod fingerprint;
pub mod persist;
pub mod registrar;
pub mod scrape;
pub mod screen;
pub mod session;
pub mod store;
pub mod trace;
pub mod tree;

pub use error::ScrapeError;
pub use session::context::ScreenEvent;
pub use session::engine::{BatchReport, EngineConfig, ScrapeEngine};
pub use store::sqlite::SqliteStore;
