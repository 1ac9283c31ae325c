//! Lifecycle reconciler
//!
//! Owns the apply-time decisions for one declared name:
//!
//! - **create**: only from `Unbound`; one *generate* call, no partial state on failure
//! - **refresh**: *lookup* the stored id; a missing row unbinds the resource,
//!   any other failure leaves the stored state untouched
//! - **update**: never supported, every identity change is a replacement
//! - **destroy**: *retract*; when the authority cannot delete under the held
//!   credentials the record is orphaned and dropped from state with a warning
//!
//! Record ids are minted here and nowhere else.

use proactnaming_client::{RecordId, TransportErrorKind};
use tracing::{debug, error, info, warn};

use crate::binding::{Binding, BindingMachine, ManagedName};
use crate::classify::{classify, Operation};
use crate::declared::DeclaredName;
use crate::diagnostics::Diagnostic;
use crate::error::{ReconcileError, Result};
use crate::policy::{ReplacementDecision, ReplacementPolicy};
use crate::provider::ProviderContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The row still exists; `changed` reports whether the stored view moved
    Current { managed: ManagedName, changed: bool },
    /// The row is gone; the resource must be dropped from state
    Vanished {
        record_id: RecordId,
        diagnostic: Diagnostic,
    },
}

impl RefreshOutcome {
    pub fn into_binding(self) -> Binding {
        match self {
            RefreshOutcome::Current { managed, .. } => Binding::Bound(managed),
            RefreshOutcome::Vanished { .. } => Binding::Unbound,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestroyOutcome {
    Retracted { record_id: RecordId },
    /// The row could not be deleted and stays in the naming tool
    Orphaned {
        managed: ManagedName,
        diagnostic: Diagnostic,
    },
}

impl DestroyOutcome {
    pub fn record_id(&self) -> RecordId {
        match self {
            DestroyOutcome::Retracted { record_id } => *record_id,
            DestroyOutcome::Orphaned { managed, .. } => managed.record_id(),
        }
    }

    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            DestroyOutcome::Retracted { .. } => None,
            DestroyOutcome::Orphaned { diagnostic, .. } => Some(diagnostic),
        }
    }
}

pub struct LifecycleReconciler {
    context: ProviderContext,
}

impl LifecycleReconciler {
    pub fn new(context: ProviderContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &ProviderContext {
        &self.context
    }

    /// Generate a name for an unbound resource.
    pub async fn create(&self, prior: Binding, declared: &DeclaredName) -> Result<Binding> {
        let mut machine = BindingMachine::new(prior);
        machine.ensure_unbound()?;
        let identity = declared.validate()?;
        let authority = self.context.require_authority()?;

        debug!(
            organization = %identity.organization,
            resource_type = %identity.resource_type,
            application = %identity.application,
            function = %identity.function,
            instance = %identity.instance,
            location = %identity.location,
            environment = %identity.environment,
            "generating name"
        );

        let record = authority.generate(&identity).await.map_err(|e| {
            error!(error = %e, resource_type = %identity.resource_type, "generate failed");
            classify(Operation::Generate, e, &identity.resource_type)
        })?;

        info!(
            record_id = %record.record_id,
            name = %record.resolved_name,
            "generated name"
        );
        machine.bind(identity, record)?;
        Ok(machine.into_binding())
    }

    /// Re-read a bound record from the authority.
    ///
    /// Repeated calls without an intervening apply make no authority writes.
    pub async fn refresh(&self, prior: &Binding) -> Result<RefreshOutcome> {
        let record_id = match prior {
            Binding::Bound(managed) => managed.record_id(),
            other => {
                return Err(ReconcileError::InvalidStateTransition {
                    from: other.state_name().to_string(),
                    to: "bound".to_string(),
                })
            }
        };
        let authority = self.context.require_authority()?;
        debug!(record_id = %record_id, "reading generated name");

        let mut machine = BindingMachine::new(prior.clone());
        match authority.lookup(record_id).await {
            Ok(current) => {
                let changed = machine.refreshed(&current)?;
                match machine.into_binding() {
                    Binding::Bound(managed) => Ok(RefreshOutcome::Current { managed, changed }),
                    other => Err(ReconcileError::InvalidStateTransition {
                        from: other.state_name().to_string(),
                        to: "bound".to_string(),
                    }),
                }
            }
            Err(e) if e.is_not_found() => {
                warn!(record_id = %record_id, "generated name not found, removing from state");
                let vanished = machine.vanish()?;
                Ok(RefreshOutcome::Vanished {
                    record_id,
                    diagnostic: Diagnostic::warning(
                        "Generated name not found",
                        format!(
                            "Record {} ({}) no longer exists in the naming tool and was removed from state; \
                             the next apply generates a new name.",
                            record_id,
                            vanished.resolved_name()
                        ),
                    ),
                })
            }
            Err(e) => {
                error!(record_id = %record_id, error = %e, "lookup failed");
                Err(classify(Operation::Lookup, e, &record_id.to_string()))
            }
        }
    }

    /// In-place update is never possible.
    pub async fn update(
        &self,
        address: &str,
        prior: &Binding,
        declared: &DeclaredName,
    ) -> Result<Binding> {
        let fields = prior
            .managed()
            .map(|managed| match ReplacementPolicy::evaluate(&managed.identity, declared) {
                ReplacementDecision::Replace { fields } => fields
                    .iter()
                    .map(|f| f.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                ReplacementDecision::Keep => String::new(),
            })
            .unwrap_or_default();
        error!(address, fields = %fields, "refusing in-place update of generated name");
        Err(ReconcileError::UpdateUnsupported {
            address: address.to_string(),
            fields,
        })
    }

    /// Retract a bound or orphaned record.
    pub async fn destroy(&self, prior: &Binding) -> Result<DestroyOutcome> {
        let record_id = match prior.record_id() {
            Some(id) => id,
            None => {
                return Err(ReconcileError::InvalidStateTransition {
                    from: prior.state_name().to_string(),
                    to: "unbound".to_string(),
                })
            }
        };
        let authority = self.context.require_authority()?;

        let mut machine = BindingMachine::new(prior.clone());
        match authority.retract(record_id).await {
            Ok(()) => {
                machine.release()?;
                info!(record_id = %record_id, "retracted generated name");
                Ok(DestroyOutcome::Retracted { record_id })
            }
            Err(e) if e.is_not_found() => {
                machine.release()?;
                debug!(record_id = %record_id, "generated name already gone");
                Ok(DestroyOutcome::Retracted { record_id })
            }
            Err(e) if e.kind == TransportErrorKind::RetractUnsupported => {
                machine.orphan()?;
                let managed = machine.release()?;
                warn!(
                    record_id = %record_id,
                    name = %managed.resolved_name(),
                    "naming tool refused deletion; removing from state and leaving the row orphaned"
                );
                let diagnostic = Diagnostic::warning(
                    "Generated name left in naming tool",
                    format!(
                        "Record {} ({}) was removed from state but could not be deleted from the naming \
                         tool: deleting generated names requires the admin password. Remove it manually \
                         if it is no longer needed.",
                        record_id,
                        managed.resolved_name()
                    ),
                );
                Ok(DestroyOutcome::Orphaned {
                    managed,
                    diagnostic,
                })
            }
            Err(e) => {
                error!(record_id = %record_id, error = %e, "retract failed");
                Err(classify(Operation::Retract, e, &record_id.to_string()))
            }
        }
    }
}
