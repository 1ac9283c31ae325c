//! Plan / apply / refresh driver
//!
//! A small declarative engine around the reconciler. It diffs desired
//! resources against the state store, previews names at plan time, and
//! applies changes one resource at a time. Distinct resources are processed
//! concurrently; a single resource is never touched by two operations at once.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use proactnaming_client::{IdentityField, RecordId};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::binding::{Binding, ManagedName};
use crate::declared::DeclaredName;
use crate::diagnostics::Diagnostic;
use crate::error::{ReconcileError, Result};
use crate::policy::{ReplacementDecision, ReplacementPolicy};
use crate::preview::{PlanIntent, PreviewEngine};
use crate::provider::ProviderContext;
use crate::reconciler::{DestroyOutcome, LifecycleReconciler, RefreshOutcome};
use crate::state::StateStore;
use crate::value::Value;

/// One declared resource as the engine receives it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredResource {
    pub address: String,
    pub declared: DeclaredName,
}

impl DesiredResource {
    pub fn new(address: impl Into<String>, declared: DeclaredName) -> Self {
        Self {
            address: address.into(),
            declared,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ChangeAction {
    Create,
    Replace { fields: Vec<IdentityField> },
    NoOp,
    Delete,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Create => "create",
            ChangeAction::Replace { .. } => "replace",
            ChangeAction::NoOp => "no-op",
            ChangeAction::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedChange {
    pub address: String,
    pub action: ChangeAction,
    /// Desired configuration; `None` for deletions
    pub declared: Option<DeclaredName>,
    /// Record the change starts from, used to detect stale plans
    pub prior_record_id: Option<RecordId>,
    pub current_name: Option<String>,
    /// Name to display; never carries a speculative record id
    pub planned_name: Value<String>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub create: usize,
    pub replace: usize,
    pub delete: usize,
    pub unchanged: usize,
}

#[derive(Debug, Clone)]
pub struct Plan {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub changes: Vec<PlannedChange>,
}

impl Plan {
    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary::default();
        for change in &self.changes {
            match change.action {
                ChangeAction::Create => summary.create += 1,
                ChangeAction::Replace { .. } => summary.replace += 1,
                ChangeAction::Delete => summary.delete += 1,
                ChangeAction::NoOp => summary.unchanged += 1,
            }
        }
        summary
    }

    pub fn has_changes(&self) -> bool {
        self.changes.iter().any(|c| c.action != ChangeAction::NoOp)
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.changes.iter().flat_map(|c| c.diagnostics.iter())
    }
}

/// Final state of one applied change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedChange {
    pub address: String,
    pub action: ChangeAction,
    /// Record left bound to the address, if any
    pub record_id: Option<RecordId>,
    pub resolved_name: Option<String>,
}

#[derive(Debug)]
pub struct ResourceFailure {
    pub address: String,
    pub error: ReconcileError,
}

#[derive(Debug, Default)]
pub struct ApplyReport {
    pub applied: Vec<AppliedChange>,
    pub failures: Vec<ResourceFailure>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ApplyReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct RefreshReport {
    /// Addresses still bound, with whether their stored view changed
    pub current: Vec<(String, bool)>,
    /// Addresses dropped because their row vanished
    pub vanished: Vec<String>,
    /// Addresses left untouched because the lookup failed
    pub failures: Vec<ResourceFailure>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct Engine {
    reconciler: LifecycleReconciler,
    preview: PreviewEngine,
    store: Arc<dyn StateStore>,
}

impl Engine {
    pub fn new(context: ProviderContext, store: Arc<dyn StateStore>) -> Self {
        Self {
            reconciler: LifecycleReconciler::new(context.clone()),
            preview: PreviewEngine::new(context),
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    /// Diff `desired` against stored state and preview new names.
    pub async fn plan(&self, desired: &[DesiredResource]) -> Result<Plan> {
        let mut seen = BTreeSet::new();
        let mut problems = Vec::new();
        for resource in desired {
            if !seen.insert(resource.address.as_str()) {
                return Err(ReconcileError::manifest(format!(
                    "duplicate resource address '{}'",
                    resource.address
                )));
            }
            problems.extend(resource.declared.problems(true).into_iter().map(|mut p| {
                p.field = format!("{}.{}", resource.address, p.field);
                p
            }));
        }
        if !problems.is_empty() {
            return Err(ReconcileError::Validation(problems));
        }

        let stored = self.store.list().await?;
        let mut changes: Vec<PlannedChange> = desired
            .iter()
            .map(|resource| diff(resource, stored.get(&resource.address)))
            .collect();
        changes.extend(
            stored
                .iter()
                .filter(|(address, _)| !seen.contains(address.as_str()))
                .map(|(address, managed)| PlannedChange {
                    address: address.clone(),
                    action: ChangeAction::Delete,
                    declared: None,
                    prior_record_id: Some(managed.record_id()),
                    current_name: Some(managed.resolved_name().to_string()),
                    planned_name: Value::Null,
                    diagnostics: Vec::new(),
                }),
        );

        let previews = join_all(changes.iter().map(|change| async move {
            let intent = match change.action {
                ChangeAction::Create => PlanIntent::Create,
                ChangeAction::Replace { .. } => PlanIntent::Replace,
                ChangeAction::Delete => PlanIntent::Destroy,
                ChangeAction::NoOp => return None,
            };
            let declared = change.declared.clone().unwrap_or_default();
            Some(self.preview.preview(&declared, intent).await)
        }))
        .await;

        for (change, preview) in changes.iter_mut().zip(previews) {
            if let Some(preview) = preview {
                change.planned_name = preview.resolved_name;
                change.diagnostics = preview
                    .diagnostics
                    .into_iter()
                    .map(|d| d.at(change.address.clone()))
                    .collect();
            }
        }

        let plan = Plan {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            changes,
        };
        let summary = plan.summary();
        info!(
            plan_id = %plan.id,
            create = summary.create,
            replace = summary.replace,
            delete = summary.delete,
            unchanged = summary.unchanged,
            "plan ready"
        );
        Ok(plan)
    }

    /// Execute every change of `plan`, persisting state after each step.
    pub async fn apply(&self, plan: &Plan) -> Result<ApplyReport> {
        let results = join_all(plan.changes.iter().map(|change| self.apply_change(change))).await;

        let mut report = ApplyReport::default();
        for (change, result) in plan.changes.iter().zip(results) {
            match result {
                Ok((applied, diagnostics)) => {
                    report.applied.push(applied);
                    report.diagnostics.extend(diagnostics);
                }
                Err(error) => {
                    warn!(address = %change.address, error = %error, "change failed");
                    report.failures.push(ResourceFailure {
                        address: change.address.clone(),
                        error,
                    });
                }
            }
        }
        info!(
            plan_id = %plan.id,
            applied = report.applied.len(),
            failed = report.failures.len(),
            "apply finished"
        );
        Ok(report)
    }

    async fn apply_change(&self, change: &PlannedChange) -> Result<(AppliedChange, Vec<Diagnostic>)> {
        let current = self.store.get(&change.address).await?;
        let current_id = current.as_ref().map(ManagedName::record_id);
        if current_id != change.prior_record_id {
            return Err(ReconcileError::StalePlan {
                address: change.address.clone(),
                reason: format!(
                    "planned against record {:?}, state now holds {:?}",
                    change.prior_record_id.map(|id| id.value()),
                    current_id.map(|id| id.value())
                ),
            });
        }

        // A replacement must be creatable before the stored record is retracted.
        let declared = match change.action {
            ChangeAction::Create | ChangeAction::Replace { .. } => {
                let declared = change.declared.as_ref().ok_or_else(|| {
                    ReconcileError::manifest(format!("no declared configuration for {}", change.address))
                })?;
                declared.validate()?;
                self.reconciler.context().require_authority()?;
                Some(declared)
            }
            ChangeAction::NoOp | ChangeAction::Delete => None,
        };

        let mut diagnostics = Vec::new();
        let mut binding = Binding::from(current);

        if matches!(change.action, ChangeAction::Replace { .. } | ChangeAction::Delete) {
            let outcome = self.reconciler.destroy(&binding).await?;
            self.store.remove(&change.address).await?;
            if let DestroyOutcome::Orphaned { diagnostic, .. } = outcome {
                diagnostics.push(diagnostic.at(change.address.clone()));
            }
            binding = Binding::Unbound;
        }

        if let Some(declared) = declared {
            binding = self.reconciler.create(binding, declared).await?;
            if let Binding::Bound(managed) = &binding {
                self.store.put(&change.address, managed.clone()).await?;
            }
        }

        let managed = binding.managed();
        Ok((
            AppliedChange {
                address: change.address.clone(),
                action: change.action.clone(),
                record_id: managed.map(ManagedName::record_id),
                resolved_name: managed.map(|m| m.resolved_name().to_string()),
            },
            diagnostics,
        ))
    }

    /// Refresh every stored resource against the authority.
    pub async fn refresh(&self) -> Result<RefreshReport> {
        let stored = self.store.list().await?;
        let bindings: Vec<(String, Binding)> = stored
            .into_iter()
            .map(|(address, managed)| (address, Binding::Bound(managed)))
            .collect();
        let results = join_all(
            bindings
                .iter()
                .map(|(_, binding)| self.reconciler.refresh(binding)),
        )
        .await;

        let mut report = RefreshReport::default();
        for ((address, _), result) in bindings.into_iter().zip(results) {
            match result {
                Ok(RefreshOutcome::Current { managed, changed }) => {
                    if changed {
                        self.store.put(&address, managed).await?;
                    }
                    report.current.push((address, changed));
                }
                Ok(RefreshOutcome::Vanished { diagnostic, .. }) => {
                    self.store.remove(&address).await?;
                    report.diagnostics.push(diagnostic.at(address.clone()));
                    report.vanished.push(address);
                }
                Err(error) => {
                    warn!(address = %address, error = %error, "refresh failed; keeping stored state");
                    report.failures.push(ResourceFailure { address, error });
                }
            }
        }
        Ok(report)
    }

    /// Plan and apply the deletion of every stored resource.
    pub async fn destroy_all(&self) -> Result<ApplyReport> {
        let plan = self.plan(&[]).await?;
        self.apply(&plan).await
    }

    /// Stored state, keyed by address.
    pub async fn show(&self) -> Result<BTreeMap<String, ManagedName>> {
        self.store.list().await
    }
}

fn diff(resource: &DesiredResource, stored: Option<&ManagedName>) -> PlannedChange {
    let (action, current_name, planned_name) = match stored {
        None => (ChangeAction::Create, None, Value::Unknown),
        Some(managed) => match ReplacementPolicy::evaluate(&managed.identity, &resource.declared) {
            ReplacementDecision::Keep => (
                ChangeAction::NoOp,
                Some(managed.resolved_name().to_string()),
                Value::Known(managed.resolved_name().to_string()),
            ),
            ReplacementDecision::Replace { fields } => (
                ChangeAction::Replace { fields },
                Some(managed.resolved_name().to_string()),
                Value::Unknown,
            ),
        },
    };
    let mut declared = resource.declared.clone();
    declared.resolved_name = Value::Unknown;

    PlannedChange {
        address: resource.address.clone(),
        action,
        declared: Some(declared),
        prior_record_id: stored.map(ManagedName::record_id),
        current_name,
        planned_name,
        diagnostics: Vec::new(),
    }
}
