//! Plan-time name preview
//!
//! Shows the name the authority would assign without leaving a row behind:
//! generate, copy the name into the plan, then retract the row and ignore
//! how the retraction went. The preview never exposes the speculative
//! record id. A preview can only degrade a plan, never fail it.

use proactnaming_client::IdentityField;
use serde::Serialize;
use tracing::{debug, warn};

use crate::classify::{classify, Operation};
use crate::declared::DeclaredName;
use crate::diagnostics::Diagnostic;
use crate::provider::ProviderContext;
use crate::value::Value;

/// What the plan intends to do with the declared resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanIntent {
    Create,
    Replace,
    Destroy,
}

/// Why no preview call was made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    Destroy,
    NoAuthority,
    NameAlreadyKnown,
    IdentityIncomplete { fields: Vec<IdentityField> },
    InvalidIdentity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preview {
    /// Name to display; `Unknown` when it will only be known after apply
    #[serde(skip)]
    pub resolved_name: Value<String>,
    pub skipped: Option<SkipReason>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Preview {
    fn skipped(reason: SkipReason, resolved_name: Value<String>) -> Self {
        Self {
            resolved_name,
            skipped: Some(reason),
            diagnostics: Vec::new(),
        }
    }

    pub fn display_name(&self) -> &str {
        match &self.resolved_name {
            Value::Known(name) => name,
            _ => "(known after apply)",
        }
    }
}

pub struct PreviewEngine {
    context: ProviderContext,
}

impl PreviewEngine {
    pub fn new(context: ProviderContext) -> Self {
        Self { context }
    }

    pub async fn preview(&self, declared: &DeclaredName, intent: PlanIntent) -> Preview {
        if intent == PlanIntent::Destroy {
            return Preview::skipped(SkipReason::Destroy, Value::Null);
        }
        if let Value::Known(name) = &declared.resolved_name {
            return Preview::skipped(SkipReason::NameAlreadyKnown, Value::Known(name.clone()));
        }
        let authority = match self.context.authority() {
            Some(authority) => authority,
            None => {
                debug!("no authority configured; skipping name preview");
                return Preview::skipped(SkipReason::NoAuthority, Value::Unknown);
            }
        };
        let identity = match declared.known_identity() {
            Some(identity) => identity,
            None => {
                let fields = IdentityField::ALL
                    .into_iter()
                    .filter(|f| {
                        let value = declared.component(*f);
                        value.is_unknown() || (value.is_null() && !f.is_optional())
                    })
                    .collect();
                return Preview::skipped(SkipReason::IdentityIncomplete { fields }, Value::Unknown);
            }
        };
        if declared.validate().is_err() {
            return Preview::skipped(SkipReason::InvalidIdentity, Value::Unknown);
        }

        let record = match authority.generate(&identity).await {
            Ok(record) => record,
            Err(e) => {
                let err = classify(Operation::Generate, e, &identity.resource_type);
                warn!(error = %err, "name preview failed; plan continues without it");
                return Preview {
                    resolved_name: Value::Unknown,
                    skipped: None,
                    diagnostics: vec![Diagnostic::warning(
                        "Unable to preview generated name",
                        err.to_string(),
                    )],
                };
            }
        };

        match authority.retract(record.record_id).await {
            Ok(()) => debug!(record_id = %record.record_id, "retracted preview row"),
            Err(e) => warn!(
                record_id = %record.record_id,
                error = %e,
                "could not retract preview row; it stays in the naming tool"
            ),
        }

        Preview {
            resolved_name: Value::Known(record.resolved_name),
            skipped: None,
            diagnostics: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proactnaming_client::{IdentityComponents, InMemoryAuthority, MemoryOp, TransportErrorKind};
    use std::sync::Arc;

    fn scenario() -> IdentityComponents {
        IdentityComponents::new("man", "st", "webapp", "test", "001", "euw", "dev")
    }

    fn engine(authority: &InMemoryAuthority) -> PreviewEngine {
        PreviewEngine::new(ProviderContext::new(Arc::new(authority.clone())))
    }

    #[tokio::test]
    async fn test_preview_leaves_no_row() {
        let authority = InMemoryAuthority::new();
        let preview = engine(&authority)
            .preview(&DeclaredName::from_identity(&scenario()), PlanIntent::Create)
            .await;

        assert_eq!(preview.display_name(), "man-st-webapp-test-001-euw-dev");
        assert!(preview.skipped.is_none());
        assert!(authority.rows().is_empty());
        assert_eq!(authority.calls().retract, 1);
    }

    #[tokio::test]
    async fn test_retract_failure_is_ignored() {
        let authority = InMemoryAuthority::without_retract();
        let preview = engine(&authority)
            .preview(&DeclaredName::from_identity(&scenario()), PlanIntent::Replace)
            .await;

        assert!(preview.resolved_name.is_known());
        assert!(preview.diagnostics.is_empty());
        assert_eq!(authority.rows().len(), 1);
    }

    #[tokio::test]
    async fn test_skips_without_calls() {
        let authority = InMemoryAuthority::new();
        let engine = engine(&authority);
        let declared = DeclaredName::from_identity(&scenario());

        let destroy = engine.preview(&declared, PlanIntent::Destroy).await;
        assert_eq!(destroy.skipped, Some(SkipReason::Destroy));

        let unknown = declared.clone().with(IdentityField::Environment, Value::Unknown);
        let preview = engine.preview(&unknown, PlanIntent::Create).await;
        assert_eq!(
            preview.skipped,
            Some(SkipReason::IdentityIncomplete {
                fields: vec![IdentityField::Environment]
            })
        );
        assert_eq!(preview.display_name(), "(known after apply)");

        let empty = declared.clone().with(IdentityField::Organization, "".into());
        let preview = engine.preview(&empty, PlanIntent::Create).await;
        assert_eq!(preview.skipped, Some(SkipReason::InvalidIdentity));

        let mut named = declared.clone();
        named.resolved_name = Value::Known("already".to_string());
        let preview = engine.preview(&named, PlanIntent::Create).await;
        assert_eq!(preview.skipped, Some(SkipReason::NameAlreadyKnown));

        assert_eq!(authority.calls().generate, 0);
    }

    #[tokio::test]
    async fn test_no_authority_is_skipped() {
        let engine = PreviewEngine::new(ProviderContext::unconfigured());
        let preview = engine
            .preview(&DeclaredName::from_identity(&scenario()), PlanIntent::Create)
            .await;
        assert_eq!(preview.skipped, Some(SkipReason::NoAuthority));
    }

    #[tokio::test]
    async fn test_generate_failure_degrades_to_warning() {
        let authority = InMemoryAuthority::new();
        authority.fail_next(MemoryOp::Generate, TransportErrorKind::Timeout);

        let preview = engine(&authority)
            .preview(&DeclaredName::from_identity(&scenario()), PlanIntent::Create)
            .await;

        assert!(preview.resolved_name.is_unknown());
        assert_eq!(preview.diagnostics.len(), 1);
        assert!(preview.diagnostics[0].detail.contains("Request Timeout"));
        assert_eq!(authority.calls().retract, 0);
    }
}
