//! In-memory naming authority
//!
//! Keeps rows in a map and derives names by joining the identity components.
//! Used by tests; failures can be queued per operation to exercise error
//! paths.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tracing::debug;

use crate::domain::{
    details_with_type_name, IdentityComponents, IdentityField, NameLookup, NameRecord,
    NamingAuthority, RecordId, ResourceType,
};
use crate::error::{Result, TransportError, TransportErrorKind};

/// Operation selector for failure injection and call counting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryOp {
    Generate,
    Lookup,
    Retract,
    ResourceTypes,
}

/// Number of calls seen per operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub generate: usize,
    pub lookup: usize,
    pub retract: usize,
    pub resource_types: usize,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i64,
    rows: BTreeMap<RecordId, NameLookup>,
    failures: VecDeque<(MemoryOp, TransportErrorKind)>,
    calls: CallCounts,
}

impl MemoryState {
    fn take_failure(&mut self, op: MemoryOp) -> Option<TransportError> {
        let pos = self.failures.iter().position(|(o, _)| *o == op)?;
        let (_, kind) = self.failures.remove(pos)?;
        Some(TransportError::new(
            kind,
            format!("injected {} failure for {:?}", kind, op),
        ))
    }
}

/// Naming authority backed by process memory
#[derive(Clone)]
pub struct InMemoryAuthority {
    state: Arc<Mutex<MemoryState>>,
    catalogue: Arc<Vec<ResourceType>>,
    retract_supported: bool,
}

impl InMemoryAuthority {
    /// Authority that accepts retraction and knows the default catalogue.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                next_id: 1,
                ..Default::default()
            })),
            catalogue: Arc::new(default_catalogue()),
            retract_supported: true,
        }
    }

    /// Authority whose rows cannot be deleted with the held credentials.
    pub fn without_retract() -> Self {
        Self {
            retract_supported: false,
            ..Self::new()
        }
    }

    pub fn with_catalogue(mut self, catalogue: Vec<ResourceType>) -> Self {
        self.catalogue = Arc::new(catalogue);
        self
    }

    /// Queue a failure for the next call of `op`.
    pub fn fail_next(&self, op: MemoryOp, kind: TransportErrorKind) {
        self.state.lock().failures.push_back((op, kind));
    }

    /// Delete a row out-of-band, as an administrator would.
    pub fn remove_row(&self, record_id: RecordId) -> bool {
        self.state.lock().rows.remove(&record_id).is_some()
    }

    pub fn contains(&self, record_id: RecordId) -> bool {
        self.state.lock().rows.contains_key(&record_id)
    }

    /// Snapshot of every live row, ordered by id.
    pub fn rows(&self) -> Vec<NameLookup> {
        self.state.lock().rows.values().cloned().collect()
    }

    pub fn calls(&self) -> CallCounts {
        self.state.lock().calls
    }

    fn type_name(&self, short_name: &str) -> Option<String> {
        self.catalogue
            .iter()
            .find(|t| t.enabled && t.short_name == short_name)
            .map(|t| t.resource.clone())
    }
}

impl Default for InMemoryAuthority {
    fn default() -> Self {
        Self::new()
    }
}

/// Join the non-empty components with `-` in tuple order.
fn compose_name(identity: &IdentityComponents) -> String {
    IdentityField::ALL
        .iter()
        .map(|field| identity.get(*field))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[async_trait]
impl NamingAuthority for InMemoryAuthority {
    fn authority_name(&self) -> &'static str {
        "memory"
    }

    async fn generate(&self, identity: &IdentityComponents) -> Result<NameRecord> {
        let mut state = self.state.lock();
        state.calls.generate += 1;
        if let Some(err) = state.take_failure(MemoryOp::Generate) {
            return Err(err);
        }

        let type_name = self.type_name(&identity.resource_type).ok_or_else(|| {
            TransportError::not_found(format!(
                "resource type '{}' not found",
                identity.resource_type
            ))
        })?;

        let record_id = RecordId(state.next_id);
        state.next_id += 1;

        let resolved_name = compose_name(identity);
        let details = details_with_type_name(&type_name);
        state.rows.insert(
            record_id,
            NameLookup {
                record_id,
                resolved_name: resolved_name.clone(),
                details: details.clone(),
                created_on: Some(Utc::now()),
            },
        );
        debug!(record_id = %record_id, name = %resolved_name, "memory authority minted row");

        Ok(NameRecord {
            record_id,
            resolved_name,
            success: true,
            message: "Resource name generated successfully".to_string(),
            details,
        })
    }

    async fn lookup(&self, record_id: RecordId) -> Result<NameLookup> {
        let mut state = self.state.lock();
        state.calls.lookup += 1;
        if let Some(err) = state.take_failure(MemoryOp::Lookup) {
            return Err(err);
        }

        state
            .rows
            .get(&record_id)
            .cloned()
            .ok_or_else(|| TransportError::not_found(format!("generated name {} not found", record_id)))
    }

    async fn retract(&self, record_id: RecordId) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.retract += 1;
        if let Some(err) = state.take_failure(MemoryOp::Retract) {
            return Err(err);
        }

        if !self.retract_supported {
            return Err(TransportError::retract_unsupported(
                "deleting generated names requires the admin password",
            ));
        }

        match state.rows.remove(&record_id) {
            Some(_) => Ok(()),
            None => Err(TransportError::not_found(format!(
                "generated name {} not found",
                record_id
            ))),
        }
    }

    async fn resource_types(&self) -> Result<Vec<ResourceType>> {
        let mut state = self.state.lock();
        state.calls.resource_types += 1;
        if let Some(err) = state.take_failure(MemoryOp::ResourceTypes) {
            return Err(err);
        }
        Ok(self.catalogue.as_ref().clone())
    }
}

fn catalogue_entry(id: i64, resource: &str, short_name: &str, length_max: &str) -> ResourceType {
    ResourceType {
        id,
        resource: resource.to_string(),
        short_name: short_name.to_string(),
        scope: "resource group".to_string(),
        length_min: "1".to_string(),
        length_max: length_max.to_string(),
        enabled: true,
        apply_delimiter: true,
        ..Default::default()
    }
}

/// A handful of common Azure resource types.
pub fn default_catalogue() -> Vec<ResourceType> {
    vec![
        catalogue_entry(1, "Storage/storageAccounts", "st", "24"),
        catalogue_entry(2, "Compute/virtualMachines", "vm", "15"),
        catalogue_entry(3, "Web/sites", "app", "60"),
        catalogue_entry(4, "KeyVault/vaults", "kv", "24"),
        catalogue_entry(5, "Resources/resourceGroups", "rg", "90"),
    ]
}
