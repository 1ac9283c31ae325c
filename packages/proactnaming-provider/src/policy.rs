//! Replacement policy
//!
//! The authority computes a name once, from the identity tuple, and offers no
//! way to revise a row. Every identity component therefore forces
//! replacement; all other attributes are outputs.

use proactnaming_client::{IdentityComponents, IdentityField};
use serde::Serialize;

use crate::declared::DeclaredName;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeRole {
    /// Declared input; any change destroys and recreates the record
    Identity,
    /// Reported by the authority, never declared
    Computed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttributeSpec {
    pub name: &'static str,
    pub role: AttributeRole,
    pub optional: bool,
    pub description: &'static str,
}

const fn identity(name: &'static str, optional: bool, description: &'static str) -> AttributeSpec {
    AttributeSpec {
        name,
        role: AttributeRole::Identity,
        optional,
        description,
    }
}

const fn computed(name: &'static str, description: &'static str) -> AttributeSpec {
    AttributeSpec {
        name,
        role: AttributeRole::Computed,
        optional: false,
        description,
    }
}

/// Attribute table of the `proactnaming_generate_name` resource.
pub const ATTRIBUTES: &[AttributeSpec] = &[
    identity("organization", false, "Organization component of the name"),
    identity("resource_type", false, "Resource type short name, e.g. `st`"),
    identity("application", false, "Application or project component"),
    identity("function", true, "Function component; may be empty"),
    identity("instance", false, "Instance number, e.g. `001`"),
    identity("location", false, "Location short name, e.g. `euw`"),
    identity("environment", false, "Environment short name, e.g. `dev`"),
    computed("id", "Record id assigned by the naming tool"),
    computed("resource_name", "Generated resource name"),
    computed("resource_type_name", "Full resource type name"),
    computed("message", "Message returned with the generated name"),
    computed("success", "Whether generation succeeded"),
    computed("resource_name_details", "Breakdown reported by the naming tool"),
];

/// Outcome of comparing stored identity with desired identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ReplacementDecision {
    Keep,
    Replace { fields: Vec<IdentityField> },
}

impl ReplacementDecision {
    pub fn requires_replace(&self) -> bool {
        matches!(self, ReplacementDecision::Replace { .. })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReplacementPolicy;

impl ReplacementPolicy {
    pub fn attribute(name: &str) -> Option<&'static AttributeSpec> {
        ATTRIBUTES.iter().find(|a| a.name == name)
    }

    pub fn role(name: &str) -> Option<AttributeRole> {
        Self::attribute(name).map(|a| a.role)
    }

    pub fn requires_replace(field: IdentityField) -> bool {
        Self::role(field.as_str()) == Some(AttributeRole::Identity)
    }

    /// Compare the identity a record was generated from with the desired one.
    ///
    /// An unknown desired component counts as a change; a null component
    /// compares as the empty string.
    pub fn evaluate(stored: &IdentityComponents, desired: &DeclaredName) -> ReplacementDecision {
        let fields: Vec<IdentityField> = IdentityField::ALL
            .into_iter()
            .filter(|field| Self::requires_replace(*field))
            .filter(|field| match desired.component(*field) {
                Value::Known(v) => v != stored.get(*field),
                Value::Null => !stored.get(*field).is_empty(),
                Value::Unknown => true,
            })
            .collect();

        if fields.is_empty() {
            ReplacementDecision::Keep
        } else {
            ReplacementDecision::Replace { fields }
        }
    }
}
