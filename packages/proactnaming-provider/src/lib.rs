/*
 * proactnaming provider - generated name lifecycle
 *
 * Keeps declared resource names and the naming authority's rows in step.
 *
 * Architecture:
 * - Error taxonomy + classifier over structured transport failures
 * - Binding state machine (Unbound / Bound / Orphaned)
 * - Replacement policy (every identity component forces replacement)
 * - Plan-time preview that never leaves rows behind
 * - Lifecycle reconciler (create / refresh / destroy)
 * - Thin declarative engine (manifest, state store, plan/apply/refresh)
 */

// Public modules
pub mod binding;
pub mod classify;
pub mod config;
pub mod declared;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod listing;
pub mod manifest;
pub mod policy;
pub mod preview;
pub mod provider;
pub mod reconciler;
pub mod state;
pub mod value;

// Re-exports
pub use binding::{Binding, BindingMachine, ManagedName};
pub use classify::{classify, kind_of, Operation};
pub use config::{
    EnvSource, ProcessEnv, ProviderSettings, ResolvedConfig, APIKEY_ENV, DEFAULT_TIMEOUT_SECS,
    HOST_ENV,
};
pub use declared::{DeclaredName, MAX_COMPONENT_LEN};
pub use diagnostics::{Diagnostic, Severity};
pub use engine::{
    AppliedChange, ApplyReport, ChangeAction, DesiredResource, Engine, Plan, PlanSummary,
    PlannedChange, RefreshReport, ResourceFailure,
};
pub use error::{ErrorKind, FieldProblem, ReconcileError, Result};
pub use listing::{generated_name, resource_types, GeneratedNameEntry, GeneratedNameListing};
pub use manifest::{Manifest, RESOURCE_TYPE};
pub use policy::{AttributeRole, AttributeSpec, ReplacementDecision, ReplacementPolicy, ATTRIBUTES};
pub use preview::{PlanIntent, Preview, PreviewEngine, SkipReason};
pub use provider::ProviderContext;
pub use reconciler::{DestroyOutcome, LifecycleReconciler, RefreshOutcome};
pub use state::{FileStateStore, MemoryStateStore, StateStore};
pub use value::Value;
