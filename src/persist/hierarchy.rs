use std::collections::{BTreeSet, HashSet};

use thiserror::Error;

use crate::scrape::model::{Link, NodeRef};
use crate::store::model::{ElementId, HierarchyEdge};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    #[error("link {link} points at list index {index}, but only {assigned} ids were assigned")]
    IndexOutOfRange {
        link: usize,
        index: usize,
        assigned: usize,
    },

    #[error("link {link} references element {id}, which is neither in this batch nor a cache hit")]
    UnknownElement { link: usize, id: ElementId },

    #[error("link {link} goes from depth {parent_depth} to depth {child_depth}")]
    DepthOrder {
        link: usize,
        parent_depth: u32,
        child_depth: u32,
    },

    #[error("link {link} makes element {id} its own parent")]
    SelfEdge { link: usize, id: ElementId },
}

/// Turn walker links into concrete edges.
///
/// `assigned_ids[i]` is the id the store gave `elements[i]`. Every resolved
/// id must belong to this batch or to its cache hits; anything else is an
/// error, never a silent drop. Repeated `(parent, child)` pairs keep the
/// first occurrence.
pub fn build_edges(
    links: &[Link],
    assigned_ids: &[ElementId],
    cache_hits: &BTreeSet<ElementId>,
) -> Result<Vec<HierarchyEdge>, HierarchyError> {
    let batch_ids: HashSet<ElementId> = assigned_ids.iter().copied().collect();
    let mut seen = HashSet::with_capacity(links.len());
    let mut edges = Vec::with_capacity(links.len());

    for (n, link) in links.iter().enumerate() {
        if link.parent_depth >= link.child_depth {
            return Err(HierarchyError::DepthOrder {
                link: n,
                parent_depth: link.parent_depth,
                child_depth: link.child_depth,
            });
        }

        let parent_id = resolve(n, link.parent, assigned_ids, &batch_ids, cache_hits)?;
        let child_id = resolve(n, link.child, assigned_ids, &batch_ids, cache_hits)?;

        if parent_id == child_id {
            return Err(HierarchyError::SelfEdge { link: n, id: parent_id });
        }

        if seen.insert((parent_id, child_id)) {
            edges.push(HierarchyEdge {
                parent_id,
                child_id,
                order: link.order,
                depth: link.child_depth,
            });
        }
    }

    Ok(edges)
}

fn resolve(
    link: usize,
    node: NodeRef,
    assigned_ids: &[ElementId],
    batch_ids: &HashSet<ElementId>,
    cache_hits: &BTreeSet<ElementId>,
) -> Result<ElementId, HierarchyError> {
    let id = match node {
        NodeRef::ListIndex(index) => {
            *assigned_ids
                .get(index)
                .ok_or(HierarchyError::IndexOutOfRange {
                    link,
                    index,
                    assigned: assigned_ids.len(),
                })?
        }
        NodeRef::StoreId(id) => id,
    };

    if batch_ids.contains(&id) || cache_hits.contains(&id) {
        Ok(id)
    } else {
        Err(HierarchyError::UnknownElement { link, id })
    }
}
