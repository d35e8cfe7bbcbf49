use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fingerprint::{ElementHash, ScreenHash};
use crate::screen::screen_model::{ScreenContext, ValidationTag};

/// Store-assigned element identity. Never reused, never a sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub i64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppRecord {
    pub app_id: String,
    pub element_count: u64,
    pub screen_count: u64,
    pub first_scraped_ms: i64,
    pub last_scraped_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementRecord {
    pub id: ElementId,
    pub app_id: String,
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
    /// Screen the element was first seen on.
    pub screen_hash: Option<ScreenHash>,
    pub external_id: Option<String>,
    pub form_group: Option<String>,
    pub validation: Option<ValidationTag>,
    pub first_seen_ms: i64,
    pub last_seen_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct HierarchyEdge {
    pub parent_id: ElementId,
    pub child_id: ElementId,
    pub order: u32,
    /// Depth of the child.
    pub depth: u32,
}

/// Screen row as written by a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenUpsert {
    pub hash: ScreenHash,
    pub app_id: String,
    pub activity: String,
    pub title: Option<String>,
    pub navigation_depth: u32,
    pub element_count: u32,
    pub seen_at_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenRecord {
    pub hash: ScreenHash,
    pub app_id: String,
    pub activity: String,
    pub title: Option<String>,
    pub navigation_depth: u32,
    pub element_count: u32,
    pub visit_count: u32,
    pub first_seen_ms: i64,
    pub last_seen_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenTransition {
    pub app_id: String,
    pub from_hash: ScreenHash,
    pub to_hash: ScreenHash,
    pub count: u32,
    pub first_seen_ms: i64,
    pub last_seen_ms: i64,
    pub avg_duration_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenContextRecord {
    pub screen_hash: ScreenHash,
    pub app_id: String,
    pub context: ScreenContext,
    pub classified_at_ms: i64,
}
