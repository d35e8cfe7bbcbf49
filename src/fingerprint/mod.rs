//! Content fingerprints for elements and screens.
//!
//! Hashes are SHA-1 (160 bit) over length-prefixed fields with a per-kind
//! domain prefix. Only semantically stable fields are fed in: bounds,
//! focus and selection state never are, so a re-layout cannot fork a
//! control into a new identity.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::scrape::model::ObservedNode;

pub const DEFAULT_TOP_ELEMENTS: usize = 10;

const ELEMENT_DOMAIN: &[u8] = b"ui-scrape/element/v1";
const SCREEN_DOMAIN: &[u8] = b"ui-scrape/screen/v1";

// ============================================================================
// Hash newtypes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementHash(String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScreenHash(String);

macro_rules! hash_newtype {
    ($name:ident) => {
        impl $name {
            /// Wrap an already computed hex digest (e.g. read back from the store).
            pub fn from_hex(hex: impl Into<String>) -> Self {
                Self(hex.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

hash_newtype!(ElementHash);
hash_newtype!(ScreenHash);

// ============================================================================
// Inputs
// ============================================================================

/// The fields of one element that make up its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSignature {
    pub class_name: String,
    pub resource_id: Option<String>,
    pub text: Option<String>,
    pub description: Option<String>,
    /// Child-index chain from the root, e.g. `/0/2/1`.
    pub path: String,
    pub depth: u32,
}

/// Window-level fields of a screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSignature {
    pub app_id: String,
    pub activity: String,
    pub title: Option<String>,
}

impl ScreenSignature {
    pub fn new(app_id: impl Into<String>, activity: impl Into<String>, title: Option<&str>) -> Self {
        Self {
            app_id: app_id.into(),
            activity: activity.into(),
            title: title.and_then(normalize_text),
        }
    }
}

// ============================================================================
// Hashing
// ============================================================================

struct FieldHasher {
    inner: Sha1,
}

impl FieldHasher {
    fn new(domain: &[u8]) -> Self {
        let mut inner = Sha1::new();
        inner.update(domain);
        Self { inner }
    }

    fn bytes(&mut self, value: &[u8]) {
        self.inner.update((value.len() as u64).to_le_bytes());
        self.inner.update(value);
    }

    fn str(&mut self, value: &str) {
        self.bytes(value.as_bytes());
    }

    fn opt(&mut self, value: Option<&str>) {
        match value {
            Some(v) => {
                self.inner.update([1u8]);
                self.str(v);
            }
            None => self.inner.update([0u8]),
        }
    }

    fn flag(&mut self, value: bool) {
        self.inner.update([value as u8]);
    }

    fn u64(&mut self, value: u64) {
        self.inner.update(value.to_le_bytes());
    }

    fn finish(self) -> String {
        format!("{:x}", self.inner.finalize())
    }
}

/// Hash one element from its stable fields.
pub fn fingerprint_element(sig: &ElementSignature) -> ElementHash {
    let mut h = FieldHasher::new(ELEMENT_DOMAIN);
    h.str(&sig.class_name);
    h.opt(sig.resource_id.as_deref());
    h.opt(sig.text.as_deref());
    h.opt(sig.description.as_deref());
    h.str(&sig.path);
    h.u64(u64::from(sig.depth));
    ElementHash(h.finish())
}

/// Hash a screen from its window fields plus the `top_n` most significant
/// observed nodes, taken in `(depth, traversal index)` order.
pub fn fingerprint_screen(sig: &ScreenSignature, nodes: &[ObservedNode], top_n: usize) -> ScreenHash {
    let top = significant_nodes(nodes, top_n);

    let mut h = FieldHasher::new(SCREEN_DOMAIN);
    h.str(&sig.app_id);
    h.str(&sig.activity);
    h.opt(sig.title.as_deref());
    h.u64(top.len() as u64);

    for node in top {
        h.str(&node.class_name);
        h.opt(node.text.as_deref());
        h.opt(node.description.as_deref());
        h.flag(node.clickable);
    }

    ScreenHash(h.finish())
}

/// The first `limit` nodes that are not pure layout containers, ordered by
/// depth then traversal index.
pub fn significant_nodes(nodes: &[ObservedNode], limit: usize) -> Vec<&ObservedNode> {
    let mut candidates: Vec<&ObservedNode> = nodes
        .iter()
        .filter(|n| !is_pure_layout_container(n))
        .collect();

    candidates.sort_by_key(|n| (n.depth, n.traversal_index));
    candidates.truncate(limit);
    candidates
}

/// A layout class carrying no content and no interaction.
pub fn is_pure_layout_container(node: &ObservedNode) -> bool {
    is_layout_class(&node.class_name)
        && node.text.is_none()
        && node.description.is_none()
        && !node.clickable
        && !node.editable
}

pub fn is_layout_class(class_name: &str) -> bool {
    let simple = simple_class_name(class_name);

    simple.ends_with("Layout")
        || matches!(
            simple,
            "ViewGroup"
                | "View"
                | "ScrollView"
                | "HorizontalScrollView"
                | "NestedScrollView"
                | "RecyclerView"
                | "ListView"
                | "GridView"
                | "ViewPager"
        )
}

/// `android.widget.Button` -> `Button`.
pub fn simple_class_name(class_name: &str) -> &str {
    class_name.rsplit('.').next().unwrap_or(class_name)
}

/// Collapse whitespace; empty means absent.
pub fn normalize_text(raw: &str) -> Option<String> {
    let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}
