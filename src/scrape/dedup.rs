use std::collections::HashMap;

use crate::fingerprint::ElementHash;
use crate::store::error::StoreError;
use crate::store::model::ElementId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    NotFound,
    Found(ElementId),
}

/// Point lookup of a persisted element by content hash.
///
/// Must return the persisted identity: the walker hands it to the children
/// of a cached node as their parent.
pub trait DedupResolver {
    fn resolve(&self, app_id: &str, hash: &ElementHash) -> Result<Resolution, StoreError>;
}

impl<R: DedupResolver + ?Sized> DedupResolver for &R {
    fn resolve(&self, app_id: &str, hash: &ElementHash) -> Result<Resolution, StoreError> {
        (**self).resolve(app_id, hash)
    }
}

/// Hash-map resolver for walks that run without a store.
#[derive(Debug, Clone, Default)]
pub struct MemoryResolver {
    known: HashMap<(String, ElementHash), ElementId>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, app_id: &str, hash: ElementHash, id: ElementId) {
        self.known.insert((app_id.to_string(), hash), id);
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}

impl DedupResolver for MemoryResolver {
    fn resolve(&self, app_id: &str, hash: &ElementHash) -> Result<Resolution, StoreError> {
        Ok(self
            .known
            .get(&(app_id.to_string(), hash.clone()))
            .map(|id| Resolution::Found(*id))
            .unwrap_or(Resolution::NotFound))
    }
}
