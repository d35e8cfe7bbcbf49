use std::ops::{Deref, DerefMut};

use thiserror::Error;

// ============================================================================
// UiNode trait: input boundary over the platform's live UI tree
// ============================================================================

/// Errors raised while reading a live node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    /// The node was recycled or the window changed under us.
    #[error("node is stale")]
    Stale,

    /// A field the fingerprint needs could not be read.
    #[error("field '{0}' is unavailable")]
    FieldUnavailable(&'static str),
}

/// A single node of the platform UI tree.
///
/// Implementations wrap a native handle. Each handle obtained from
/// [`UiNode::child`] must be released exactly once; the walker does that
/// through [`NodeHandle`], never by calling `release` directly.
pub trait UiNode: Sized {
    fn class_name(&self) -> Result<String, NodeError>;
    fn text(&self) -> Result<Option<String>, NodeError>;
    fn content_description(&self) -> Result<Option<String>, NodeError>;
    fn resource_id(&self) -> Result<Option<String>, NodeError>;
    fn is_clickable(&self) -> Result<bool, NodeError>;
    fn is_editable(&self) -> Result<bool, NodeError>;
    fn child_count(&self) -> Result<usize, NodeError>;

    /// Acquire the child at `index`. `Ok(None)` means the slot is empty.
    fn child(&self, index: usize) -> Result<Option<Self>, NodeError>;

    /// Release the native handle.
    fn release(&mut self);
}

// ============================================================================
// Scoped handle
// ============================================================================

/// Owns a node for the duration of one traversal frame and releases it on
/// drop, whichever way the frame exits.
pub struct NodeHandle<N: UiNode> {
    node: N,
}

impl<N: UiNode> NodeHandle<N> {
    pub fn new(node: N) -> Self {
        Self { node }
    }

    /// Acquire a child handle, already wrapped.
    pub fn child(&self, index: usize) -> Result<Option<NodeHandle<N>>, NodeError> {
        Ok(self.node.child(index)?.map(NodeHandle::new))
    }
}

impl<N: UiNode> Deref for NodeHandle<N> {
    type Target = N;

    fn deref(&self) -> &N {
        &self.node
    }
}

impl<N: UiNode> DerefMut for NodeHandle<N> {
    fn deref_mut(&mut self) -> &mut N {
        &mut self.node
    }
}

impl<N: UiNode> Drop for NodeHandle<N> {
    fn drop(&mut self) {
        self.node.release();
    }
}
