//! Best-effort registration of new elements with the external identifier
//! service. Nothing here may fail a scrape.

use serde::Serialize;
use thiserror::Error;

use crate::fingerprint::ElementHash;
use crate::store::model::ElementId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrarError {
    #[error("registrar unavailable: {0}")]
    Unavailable(String),

    #[error("registration rejected: {0}")]
    Rejected(String),
}

/// What the registrar is told about a new element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationMetadata {
    pub app_id: String,
    pub hash: ElementHash,
    pub class_name: String,
    pub resource_id: Option<String>,
    pub label: Option<String>,
}

/// External-facing stable identifier handed back by the registrar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ExternalId(pub String);

pub trait IdentifierRegistrar {
    /// `Ok(None)` means accepted without handing back an id.
    fn register(
        &mut self,
        element_id: ElementId,
        metadata: &RegistrationMetadata,
    ) -> Result<Option<ExternalId>, RegistrarError>;
}

/// Running success ratio, so a registrar that always fails is visible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistrationStats {
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
}

impl RegistrationStats {
    pub fn record(&mut self, ok: bool) {
        self.attempted += 1;
        if ok {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    /// `1.0` before any attempt.
    pub fn success_ratio(&self) -> f64 {
        if self.attempted == 0 {
            1.0
        } else {
            self.succeeded as f64 / self.attempted as f64
        }
    }

    pub fn merge(&mut self, other: &RegistrationStats) {
        self.attempted += other.attempted;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRegistrar;

impl IdentifierRegistrar for NoopRegistrar {
    fn register(
        &mut self,
        _element_id: ElementId,
        _metadata: &RegistrationMetadata,
    ) -> Result<Option<ExternalId>, RegistrarError> {
        Ok(None)
    }
}

/// Deterministic local ids: `<app_id>:<element_id>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrefixRegistrar;

impl IdentifierRegistrar for PrefixRegistrar {
    fn register(
        &mut self,
        element_id: ElementId,
        metadata: &RegistrationMetadata,
    ) -> Result<Option<ExternalId>, RegistrarError> {
        if metadata.app_id.is_empty() {
            return Err(RegistrarError::Rejected("empty app id".into()));
        }
        Ok(Some(ExternalId(format!("{}:{}", metadata.app_id, element_id))))
    }
}
