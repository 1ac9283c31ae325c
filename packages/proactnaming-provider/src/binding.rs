//! Binding state of one declared name
//!
//! ```text
//!   Unbound ──bind──▶ Bound ──orphan──▶ Orphaned
//!      ▲                │                   │
//!      └─vanish/release─┘◀──────release─────┘
//! ```

use chrono::{DateTime, Utc};
use proactnaming_client::{IdentityComponents, NameLookup, NameRecord, RecordId};
use serde::{Deserialize, Serialize};

use crate::error::{ReconcileError, Result};

/// A generated name owned by a declared resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedName {
    pub identity: IdentityComponents,
    pub record: NameRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ManagedName {
    pub fn new(identity: IdentityComponents, record: NameRecord) -> Self {
        let now = Utc::now();
        Self {
            identity,
            record,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn record_id(&self) -> RecordId {
        self.record.record_id
    }

    pub fn resolved_name(&self) -> &str {
        &self.record.resolved_name
    }

    pub fn resource_type_name(&self) -> Option<&str> {
        self.record.resource_type_name()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Binding {
    /// No record exists for the declared resource
    Unbound,
    /// The declared resource owns exactly one authority row
    Bound(ManagedName),
    /// The declared resource let go of a row the authority still holds
    Orphaned(ManagedName),
}

impl Binding {
    pub fn state_name(&self) -> &'static str {
        match self {
            Binding::Unbound => "unbound",
            Binding::Bound(_) => "bound",
            Binding::Orphaned(_) => "orphaned",
        }
    }

    pub fn managed(&self) -> Option<&ManagedName> {
        match self {
            Binding::Unbound => None,
            Binding::Bound(m) | Binding::Orphaned(m) => Some(m),
        }
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.managed().map(ManagedName::record_id)
    }

    pub fn is_bound(&self) -> bool {
        matches!(self, Binding::Bound(_))
    }
}

impl From<Option<ManagedName>> for Binding {
    fn from(stored: Option<ManagedName>) -> Self {
        stored.map_or(Binding::Unbound, Binding::Bound)
    }
}

fn invalid(from: &Binding, to: &str) -> ReconcileError {
    ReconcileError::InvalidStateTransition {
        from: from.state_name().to_string(),
        to: to.to_string(),
    }
}

/// Binding state machine for transitions
pub struct BindingMachine {
    binding: Binding,
}

impl BindingMachine {
    pub fn new(binding: Binding) -> Self {
        Self { binding }
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    pub fn into_binding(self) -> Binding {
        self.binding
    }

    /// Fail unless the current state is `Unbound`.
    pub fn ensure_unbound(&self) -> Result<()> {
        match self.binding {
            Binding::Unbound => Ok(()),
            _ => Err(invalid(&self.binding, "bound")),
        }
    }

    /// Transition: UNBOUND → BOUND
    pub fn bind(&mut self, identity: IdentityComponents, record: NameRecord) -> Result<()> {
        self.ensure_unbound()?;
        self.binding = Binding::Bound(ManagedName::new(identity, record));
        Ok(())
    }

    /// Transition: BOUND → BOUND with the authority's current view.
    ///
    /// Returns whether anything changed; `updated_at` only moves when it did.
    pub fn refreshed(&mut self, current: &NameLookup) -> Result<bool> {
        if let Binding::Bound(managed) = &mut self.binding {
            let record = &mut managed.record;
            let changed =
                record.resolved_name != current.resolved_name || record.details != current.details;
            if changed {
                record.resolved_name = current.resolved_name.clone();
                record.details = current.details.clone();
                managed.updated_at = Utc::now();
            }
            return Ok(changed);
        }
        Err(invalid(&self.binding, "bound"))
    }

    /// Transition: BOUND → UNBOUND after the row disappeared authority-side.
    pub fn vanish(&mut self) -> Result<ManagedName> {
        match std::mem::replace(&mut self.binding, Binding::Unbound) {
            Binding::Bound(managed) => Ok(managed),
            other => {
                let err = invalid(&other, "unbound");
                self.binding = other;
                Err(err)
            }
        }
    }

    /// Transition: BOUND|ORPHANED → ORPHANED
    pub fn orphan(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.binding, Binding::Unbound) {
            Binding::Bound(managed) | Binding::Orphaned(managed) => {
                self.binding = Binding::Orphaned(managed);
                Ok(())
            }
            Binding::Unbound => Err(invalid(&Binding::Unbound, "orphaned")),
        }
    }

    /// Transition: BOUND|ORPHANED → UNBOUND once the record left declared state.
    pub fn release(&mut self) -> Result<ManagedName> {
        match std::mem::replace(&mut self.binding, Binding::Unbound) {
            Binding::Bound(managed) | Binding::Orphaned(managed) => Ok(managed),
            Binding::Unbound => Err(invalid(&Binding::Unbound, "unbound")),
        }
    }
}
