use std::collections::BTreeSet;

use serde::Serialize;

use crate::fingerprint::ElementHash;
use crate::screen::screen_model::ValidationTag;
use crate::store::model::ElementId;

// ============================================================================
// Walk limits
// ============================================================================

/// Bounds on a single traversal. Nodes past either bound are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkLimits {
    pub max_depth: u32,
    pub max_nodes: usize,
}

impl Default for WalkLimits {
    fn default() -> Self {
        Self {
            max_depth: 50,
            max_nodes: 2000,
        }
    }
}

// ============================================================================
// Batch arena
// ============================================================================

/// Reference to an element from inside a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeRef {
    /// Index into `WalkOutcome::elements`; the id is assigned on persist.
    ListIndex(usize),
    /// Already persisted element (cache hit).
    StoreId(ElementId),
}

/// An element seen for the first time, waiting to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedElement {
    pub hash: ElementHash,
    pub class_name: String,
    pub resource_id: Option<String>,
    pub text: Option<String>,
    pub description: Option<String>,
    pub clickable: bool,
    pub editable: bool,
    pub depth: u32,
    pub traversal_index: u32,
    pub path: String,
    pub form_group: Option<String>,
    pub validation: Option<ValidationTag>,
}

/// A parent-child relation found during the walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub parent: NodeRef,
    pub child: NodeRef,
    /// Position among the parent's children.
    pub order: u32,
    pub parent_depth: u32,
    pub child_depth: u32,
}

/// Every node the walk visited, new or cached, in pre-order.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedNode {
    pub hash: ElementHash,
    pub node_ref: NodeRef,
    pub class_name: String,
    pub resource_id: Option<String>,
    pub text: Option<String>,
    pub description: Option<String>,
    pub clickable: bool,
    pub editable: bool,
    pub depth: u32,
    pub traversal_index: u32,
    /// Index of the parent in `WalkOutcome::observed`.
    pub parent: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WalkStats {
    pub visited: usize,
    pub new_elements: usize,
    pub cache_hits: usize,
    pub batch_duplicates: usize,
    pub skipped_depth: usize,
    pub skipped_budget: usize,
    pub stale_subtrees: usize,
    pub fingerprint_failures: usize,
}

/// Result of one complete traversal.
#[derive(Debug, Clone, Default)]
pub struct WalkOutcome {
    pub app_id: String,
    pub elements: Vec<ScrapedElement>,
    pub links: Vec<Link>,
    pub observed: Vec<ObservedNode>,
    pub cache_hits: BTreeSet<ElementId>,
    pub stats: WalkStats,
}

impl WalkOutcome {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.observed.is_empty()
    }
}
