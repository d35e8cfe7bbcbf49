use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, warn};

use crate::fingerprint::{ElementHash, ElementSignature, fingerprint_element, normalize_text};
use crate::store::error::StoreError;
use crate::tree::node::{NodeError, NodeHandle, UiNode};

use super::cancel::CancelToken;
use super::dedup::{DedupResolver, Resolution};
use super::model::{Link, NodeRef, ObservedNode, ScrapedElement, WalkLimits, WalkOutcome};

#[derive(Debug, Error)]
pub enum WalkError {
    /// A newer screen event superseded this walk.
    #[error("walk cancelled (generation {generation} superseded)")]
    Cancelled { generation: u64 },

    #[error("dedup lookup failed: {0}")]
    Resolver(#[from] StoreError),
}

/// Walk the tree under `root` depth-first, pre-order.
///
/// New elements are appended to `elements`; cache hits are not, but their
/// persisted id becomes the parent reference for their children. Every
/// handle acquired here, `root` included, is released before returning.
pub fn walk<N, R>(
    root: N,
    app_id: &str,
    resolver: &R,
    limits: &WalkLimits,
    cancel: &CancelToken,
) -> Result<WalkOutcome, WalkError>
where
    N: UiNode,
    R: DedupResolver + ?Sized,
{
    let root = NodeHandle::new(root);
    let mut walker = Walker {
        app_id,
        resolver,
        limits,
        cancel,
        out: WalkOutcome::new(app_id),
        batch_index: HashMap::new(),
    };

    walker.visit(&root, None, 0, 0, "")?;

    debug!(
        app_id,
        visited = walker.out.stats.visited,
        new = walker.out.stats.new_elements,
        cached = walker.out.stats.cache_hits,
        "walk complete"
    );

    Ok(walker.out)
}

#[derive(Debug, Clone, Copy)]
struct ParentContext {
    node_ref: NodeRef,
    depth: u32,
    observed_index: usize,
}

struct NodeFields {
    class_name: String,
    resource_id: Option<String>,
    text: Option<String>,
    description: Option<String>,
    clickable: bool,
    editable: bool,
}

struct Walker<'a, R: ?Sized> {
    app_id: &'a str,
    resolver: &'a R,
    limits: &'a WalkLimits,
    cancel: &'a CancelToken,
    out: WalkOutcome,
    /// Hashes appended during this walk -> list index.
    batch_index: HashMap<ElementHash, usize>,
}

impl<'a, R: DedupResolver + ?Sized> Walker<'a, R> {
    fn visit<N: UiNode>(
        &mut self,
        node: &NodeHandle<N>,
        parent: Option<ParentContext>,
        order: u32,
        depth: u32,
        path: &str,
    ) -> Result<(), WalkError> {
        if self.cancel.is_cancelled() {
            return Err(WalkError::Cancelled {
                generation: self.cancel.generation(),
            });
        }

        if depth > self.limits.max_depth {
            self.out.stats.skipped_depth += 1;
            return Ok(());
        }

        if self.out.stats.visited >= self.limits.max_nodes {
            self.out.stats.skipped_budget += 1;
            return Ok(());
        }

        let fields = match read_fields(&**node) {
            Ok(fields) => fields,
            Err(NodeError::Stale) => {
                self.out.stats.stale_subtrees += 1;
                debug!(path, "stale node, skipping subtree");
                return Ok(());
            }
            Err(NodeError::FieldUnavailable(field)) => {
                self.out.stats.fingerprint_failures += 1;
                warn!(path, field, "cannot fingerprint node, skipping subtree");
                return Ok(());
            }
        };

        let traversal_index = self.out.stats.visited as u32;
        self.out.stats.visited += 1;

        let hash = fingerprint_element(&ElementSignature {
            class_name: fields.class_name.clone(),
            resource_id: fields.resource_id.clone(),
            text: fields.text.clone(),
            description: fields.description.clone(),
            path: path.to_string(),
            depth,
        });

        let node_ref = self.resolve(&hash, &fields, depth, traversal_index, path)?;

        if let Some(parent) = parent {
            self.out.links.push(Link {
                parent: parent.node_ref,
                child: node_ref,
                order,
                parent_depth: parent.depth,
                child_depth: depth,
            });
        }

        let observed_index = self.out.observed.len();
        self.out.observed.push(ObservedNode {
            hash,
            node_ref,
            class_name: fields.class_name,
            resource_id: fields.resource_id,
            text: fields.text,
            description: fields.description,
            clickable: fields.clickable,
            editable: fields.editable,
            depth,
            traversal_index,
            parent: parent.map(|p| p.observed_index),
        });

        let context = ParentContext {
            node_ref,
            depth,
            observed_index,
        };

        let child_count = match node.child_count() {
            Ok(count) => count,
            Err(_) => {
                self.out.stats.stale_subtrees += 1;
                return Ok(());
            }
        };

        for index in 0..child_count {
            let child = match node.child(index) {
                Ok(Some(child)) => child,
                Ok(None) => continue,
                Err(_) => {
                    self.out.stats.stale_subtrees += 1;
                    continue;
                }
            };

            let child_path = format!("{path}/{index}");
            self.visit(&child, Some(context), index as u32, depth + 1, &child_path)?;
        }

        Ok(())
    }

    fn resolve(
        &mut self,
        hash: &ElementHash,
        fields: &NodeFields,
        depth: u32,
        traversal_index: u32,
        path: &str,
    ) -> Result<NodeRef, WalkError> {
        if let Some(&index) = self.batch_index.get(hash) {
            self.out.stats.batch_duplicates += 1;
            return Ok(NodeRef::ListIndex(index));
        }

        match self.resolver.resolve(self.app_id, hash)? {
            Resolution::Found(id) => {
                self.out.stats.cache_hits += 1;
                self.out.cache_hits.insert(id);
                Ok(NodeRef::StoreId(id))
            }
            Resolution::NotFound => {
                let index = self.out.elements.len();
                self.out.elements.push(ScrapedElement {
                    hash: hash.clone(),
                    class_name: fields.class_name.clone(),
                    resource_id: fields.resource_id.clone(),
                    text: fields.text.clone(),
                    description: fields.description.clone(),
                    clickable: fields.clickable,
                    editable: fields.editable,
                    depth,
                    traversal_index,
                    path: path.to_string(),
                    form_group: None,
                    validation: None,
                });
                self.batch_index.insert(hash.clone(), index);
                self.out.stats.new_elements += 1;
                Ok(NodeRef::ListIndex(index))
            }
        }
    }
}

fn read_fields<N: UiNode>(node: &N) -> Result<NodeFields, NodeError> {
    let class_name = node.class_name()?;
    if class_name.trim().is_empty() {
        return Err(NodeError::FieldUnavailable("className"));
    }

    Ok(NodeFields {
        class_name,
        resource_id: node.resource_id()?.as_deref().and_then(normalize_text),
        text: node.text()?.as_deref().and_then(normalize_text),
        description: node.content_description()?.as_deref().and_then(normalize_text),
        clickable: node.is_clickable()?,
        editable: node.is_editable()?,
    })
}
