//! Declared configuration of one generated name

use proactnaming_client::{IdentityComponents, IdentityField};
use serde::Deserialize;

use crate::error::{FieldProblem, ReconcileError, Result};
use crate::value::Value;

/// Longest value accepted for any identity component.
pub const MAX_COMPONENT_LEN: usize = 64;

fn unknown_name() -> Value<String> {
    Value::Unknown
}

/// Identity components as declared, plus the placeholder for the name the
/// authority will compute.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeclaredName {
    #[serde(default)]
    pub organization: Value<String>,
    #[serde(default)]
    pub resource_type: Value<String>,
    #[serde(default)]
    pub application: Value<String>,
    #[serde(default)]
    pub function: Value<String>,
    #[serde(default)]
    pub instance: Value<String>,
    #[serde(default)]
    pub location: Value<String>,
    #[serde(default)]
    pub environment: Value<String>,
    #[serde(skip, default = "unknown_name")]
    pub resolved_name: Value<String>,
}

impl DeclaredName {
    /// Fully known declaration whose name is still to be computed.
    pub fn from_identity(identity: &IdentityComponents) -> Self {
        let mut declared = Self {
            resolved_name: Value::Unknown,
            ..Default::default()
        };
        for field in IdentityField::ALL {
            *declared.component_mut(field) = Value::Known(identity.get(field).to_string());
        }
        declared
    }

    pub fn component(&self, field: IdentityField) -> &Value<String> {
        match field {
            IdentityField::Organization => &self.organization,
            IdentityField::ResourceType => &self.resource_type,
            IdentityField::Application => &self.application,
            IdentityField::Function => &self.function,
            IdentityField::Instance => &self.instance,
            IdentityField::Location => &self.location,
            IdentityField::Environment => &self.environment,
        }
    }

    pub fn component_mut(&mut self, field: IdentityField) -> &mut Value<String> {
        match field {
            IdentityField::Organization => &mut self.organization,
            IdentityField::ResourceType => &mut self.resource_type,
            IdentityField::Application => &mut self.application,
            IdentityField::Function => &mut self.function,
            IdentityField::Instance => &mut self.instance,
            IdentityField::Location => &mut self.location,
            IdentityField::Environment => &mut self.environment,
        }
    }

    /// Builder-style setter used by tests and embedding engines.
    pub fn with(mut self, field: IdentityField, value: Value<String>) -> Self {
        *self.component_mut(field) = value;
        self
    }

    /// The identity tuple, if every component is known.
    ///
    /// A null `function` counts as the empty segment; any other null or
    /// unknown component yields `None`.
    pub fn known_identity(&self) -> Option<IdentityComponents> {
        let mut identity = IdentityComponents::new("", "", "", "", "", "", "");
        for field in IdentityField::ALL {
            match self.component(field) {
                Value::Known(v) => identity.set(field, v.clone()),
                Value::Null if field.is_optional() => {}
                _ => return None,
            }
        }
        Some(identity)
    }

    /// Fields whose values are not yet known.
    pub fn unknown_fields(&self) -> Vec<IdentityField> {
        IdentityField::ALL
            .into_iter()
            .filter(|f| self.component(*f).is_unknown())
            .collect()
    }

    /// Problems with the declared components. Plan time passes
    /// `allow_unknown` since values may still be pending there.
    pub fn problems(&self, allow_unknown: bool) -> Vec<FieldProblem> {
        IdentityField::ALL
            .into_iter()
            .filter(|field| !(allow_unknown && self.component(*field).is_unknown()))
            .filter_map(|field| check_component(field, self.component(field)))
            .collect()
    }

    /// Check every component and return the identity tuple.
    ///
    /// All offending fields are reported together.
    pub fn validate(&self) -> Result<IdentityComponents> {
        let problems = self.problems(false);
        if !problems.is_empty() {
            return Err(ReconcileError::Validation(problems));
        }
        self.known_identity().ok_or_else(|| {
            ReconcileError::validation(
                "identity",
                "Incomplete identity",
                "every identity component must be known before a name can be generated",
            )
        })
    }
}

fn check_component(field: IdentityField, value: &Value<String>) -> Option<FieldProblem> {
    let name = field.as_str();
    match value {
        Value::Unknown => Some(FieldProblem::new(
            name,
            "Unknown identity component",
            format!("'{}' is not known yet; it must be known before apply", name),
        )),
        Value::Null if field.is_optional() => None,
        Value::Null => Some(FieldProblem::new(
            name,
            "Missing identity component",
            format!("'{}' is required", name),
        )),
        Value::Known(v) if v.trim().is_empty() && !field.is_optional() => Some(FieldProblem::new(
            name,
            "Empty identity component",
            format!("'{}' must not be empty", name),
        )),
        Value::Known(v) if v.chars().count() > MAX_COMPONENT_LEN => Some(FieldProblem::new(
            name,
            "Identity component too long",
            format!(
                "'{}' must be at most {} characters, got {}",
                name,
                MAX_COMPONENT_LEN,
                v.chars().count()
            ),
        )),
        Value::Known(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> IdentityComponents {
        IdentityComponents::new("man", "st", "webapp", "test", "001", "euw", "dev")
    }

    #[test]
    fn test_from_identity_roundtrip() {
        let declared = DeclaredName::from_identity(&scenario());
        assert!(declared.resolved_name.is_unknown());
        assert_eq!(declared.known_identity(), Some(scenario()));
        assert_eq!(declared.validate().unwrap(), scenario());
    }

    #[test]
    fn test_null_function_counts_as_empty() {
        let declared = DeclaredName::from_identity(&scenario()).with(IdentityField::Function, Value::Null);
        let identity = declared.known_identity().unwrap();
        assert_eq!(identity.function, "");
        assert!(declared.validate().is_ok());
    }

    #[test]
    fn test_unknown_or_null_required_component() {
        let unknown =
            DeclaredName::from_identity(&scenario()).with(IdentityField::Location, Value::Unknown);
        assert!(unknown.known_identity().is_none());
        assert_eq!(unknown.unknown_fields(), vec![IdentityField::Location]);

        let null = DeclaredName::from_identity(&scenario()).with(IdentityField::Location, Value::Null);
        assert!(null.known_identity().is_none());
    }

    #[test]
    fn test_validate_reports_every_field() {
        let declared = DeclaredName::from_identity(&scenario())
            .with(IdentityField::Organization, "  ".into())
            .with(IdentityField::Instance, "x".repeat(MAX_COMPONENT_LEN + 1).into())
            .with(IdentityField::Environment, Value::Null);

        match declared.validate() {
            Err(ReconcileError::Validation(problems)) => {
                let fields: Vec<_> = problems.iter().map(|p| p.field.as_str()).collect();
                assert_eq!(fields, vec!["organization", "instance", "environment"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_problems_can_allow_unknown() {
        let declared =
            DeclaredName::from_identity(&scenario()).with(IdentityField::Location, Value::Unknown);
        assert!(declared.problems(true).is_empty());
        assert_eq!(declared.problems(false).len(), 1);
    }

    #[test]
    fn test_empty_function_is_allowed() {
        let declared = DeclaredName::from_identity(&scenario()).with(IdentityField::Function, "".into());
        assert!(declared.validate().is_ok());
    }

    #[test]
    fn test_deserialize_missing_function() {
        let yaml = "organization: man\nresource_type: st\napplication: webapp\ninstance: \"001\"\nlocation: euw\nenvironment: dev\n";
        let declared: DeclaredName = serde_yaml::from_str(yaml).unwrap();
        assert!(declared.function.is_null());
        assert!(declared.resolved_name.is_unknown());
        assert_eq!(declared.validate().unwrap().function, "");
    }

    #[test]
    fn test_deserialize_rejects_unknown_attribute() {
        let yaml = "organization: man\ncolour: blue\n";
        assert!(serde_yaml::from_str::<DeclaredName>(yaml).is_err());
    }
}
