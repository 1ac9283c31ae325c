//! Domain layer for the naming authority port
//!
//! # Domain Models
//!
//! - `IdentityComponents`: the ordered identity tuple a name is derived from
//! - `RecordId`: authority-assigned row identifier
//! - `NameRecord`: one assignment returned by *generate*
//! - `NameLookup`: the current view of a row returned by *lookup*
//! - `ResourceType`: one entry of the authority's resource type catalogue
//!
//! # Port Trait
//!
//! - `NamingAuthority`: the three lifecycle operations plus catalogue listing
//!
//! # Examples
//!
//! ```rust,ignore
//! use proactnaming_client::domain::{IdentityComponents, NamingAuthority};
//!
//! async fn example(authority: impl NamingAuthority) -> Result<()> {
//!     let identity = IdentityComponents::new("man", "st", "webapp", "test", "001", "euw", "dev");
//!     let record = authority.generate(&identity).await?;
//!     let current = authority.lookup(record.record_id).await?;
//!     assert_eq!(current.resolved_name, record.resolved_name);
//!     Ok(())
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Detail key carrying the authority's full resource type name.
pub const DETAIL_RESOURCE_TYPE_NAME: &str = "resource_type_name";

// ═══════════════════════════════════════════════════════════════════════════
// Identity
// ═══════════════════════════════════════════════════════════════════════════

/// One field of the identity tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityField {
    Organization,
    ResourceType,
    Application,
    Function,
    Instance,
    Location,
    Environment,
}

impl IdentityField {
    /// All fields in tuple order.
    pub const ALL: [IdentityField; 7] = [
        IdentityField::Organization,
        IdentityField::ResourceType,
        IdentityField::Application,
        IdentityField::Function,
        IdentityField::Instance,
        IdentityField::Location,
        IdentityField::Environment,
    ];

    /// Attribute name as written in declared configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityField::Organization => "organization",
            IdentityField::ResourceType => "resource_type",
            IdentityField::Application => "application",
            IdentityField::Function => "function",
            IdentityField::Instance => "instance",
            IdentityField::Location => "location",
            IdentityField::Environment => "environment",
        }
    }

    /// `function` is the only component allowed to be empty.
    pub fn is_optional(&self) -> bool {
        matches!(self, IdentityField::Function)
    }
}

impl fmt::Display for IdentityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity tuple a name is generated from
///
/// Immutable once a record exists: the authority computes the name as a pure
/// function of these values at generation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityComponents {
    pub organization: String,
    pub resource_type: String,
    pub application: String,
    /// Empty when the naming convention has no function segment
    #[serde(default)]
    pub function: String,
    pub instance: String,
    pub location: String,
    pub environment: String,
}

impl IdentityComponents {
    pub fn new(
        organization: impl Into<String>,
        resource_type: impl Into<String>,
        application: impl Into<String>,
        function: impl Into<String>,
        instance: impl Into<String>,
        location: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            organization: organization.into(),
            resource_type: resource_type.into(),
            application: application.into(),
            function: function.into(),
            instance: instance.into(),
            location: location.into(),
            environment: environment.into(),
        }
    }

    pub fn get(&self, field: IdentityField) -> &str {
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

    pub fn set(&mut self, field: IdentityField, value: impl Into<String>) {
        let value = value.into();
        match field {
            IdentityField::Organization => self.organization = value,
            IdentityField::ResourceType => self.resource_type = value,
            IdentityField::Application => self.application = value,
            IdentityField::Function => self.function = value,
            IdentityField::Instance => self.instance = value,
            IdentityField::Location => self.location = value,
            IdentityField::Environment => self.environment = value,
        }
    }

    /// Fields whose values differ between `self` and `other`, in tuple order.
    pub fn changed_fields(&self, other: &IdentityComponents) -> Vec<IdentityField> {
        IdentityField::ALL
            .into_iter()
            .filter(|field| self.get(*field) != other.get(*field))
            .collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Records
// ═══════════════════════════════════════════════════════════════════════════

/// Authority-assigned row identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl RecordId {
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One assignment returned by *generate*
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRecord {
    pub record_id: RecordId,
    /// Authority-computed name; never built client-side
    pub resolved_name: String,
    pub success: bool,
    pub message: String,
    /// Authority-reported breakdown, possibly empty
    #[serde(default)]
    pub details: BTreeMap<String, String>,
}

impl NameRecord {
    pub fn resource_type_name(&self) -> Option<&str> {
        self.details.get(DETAIL_RESOURCE_TYPE_NAME).map(String::as_str)
    }
}

/// Current view of an existing row returned by *lookup*
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameLookup {
    pub record_id: RecordId,
    pub resolved_name: String,
    #[serde(default)]
    pub details: BTreeMap<String, String>,
    #[serde(default)]
    pub created_on: Option<DateTime<Utc>>,
}

impl NameLookup {
    pub fn resource_type_name(&self) -> Option<&str> {
        self.details.get(DETAIL_RESOURCE_TYPE_NAME).map(String::as_str)
    }
}

/// Build a detail map, skipping the type name when the authority left it blank.
pub fn details_with_type_name(resource_type_name: &str) -> BTreeMap<String, String> {
    let mut details = BTreeMap::new();
    if !resource_type_name.is_empty() {
        details.insert(
            DETAIL_RESOURCE_TYPE_NAME.to_string(),
            resource_type_name.to_string(),
        );
    }
    details
}

/// One entry of the authority's resource type catalogue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceType {
    pub id: i64,
    pub resource: String,
    pub optional: String,
    pub exclude: String,
    pub property: String,
    pub short_name: String,
    pub scope: String,
    pub length_min: String,
    pub length_max: String,
    pub valid_text: String,
    pub invalid_text: String,
    pub invalid_characters: String,
    pub invalid_characters_start: String,
    pub invalid_characters_end: String,
    pub invalid_characters_consecutive: String,
    pub regx: String,
    pub static_values: String,
    pub enabled: bool,
    pub apply_delimiter: bool,
}

// ═══════════════════════════════════════════════════════════════════════════
// Port Trait
// ═══════════════════════════════════════════════════════════════════════════

/// Naming authority port
///
/// Implementations perform exactly one round-trip per call and never retry;
/// retry policy, if any, belongs inside the adapter's transport.
#[async_trait]
pub trait NamingAuthority: Send + Sync {
    /// Short adapter name for logs
    fn authority_name(&self) -> &'static str;

    /// Request a new name. Every successful call mints a new row.
    async fn generate(&self, identity: &IdentityComponents) -> Result<NameRecord>;

    /// Fetch the current state of a row. Missing rows yield a `NotFound` kind.
    async fn lookup(&self, record_id: RecordId) -> Result<NameLookup>;

    /// Remove a row. Returns a `RetractUnsupported` kind when the held
    /// credentials cannot delete.
    async fn retract(&self, record_id: RecordId) -> Result<()>;

    /// List the authority's resource type catalogue.
    async fn resource_types(&self) -> Result<Vec<ResourceType>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> IdentityComponents {
        IdentityComponents::new("man", "st", "webapp", "test", "001", "euw", "dev")
    }

    #[test]
    fn test_identity_get_set() {
        let mut identity = scenario();
        assert_eq!(identity.get(IdentityField::Instance), "001");

        identity.set(IdentityField::Instance, "999");
        assert_eq!(identity.instance, "999");
    }

    #[test]
    fn test_changed_fields_in_tuple_order() {
        let a = scenario();
        let mut b = scenario();
        b.environment = "prd".to_string();
        b.organization = "acme".to_string();

        assert_eq!(
            a.changed_fields(&b),
            vec![IdentityField::Organization, IdentityField::Environment]
        );
        assert!(a.changed_fields(&a.clone()).is_empty());
    }

    #[test]
    fn test_only_function_is_optional() {
        let optional: Vec<_> = IdentityField::ALL
            .into_iter()
            .filter(|f| f.is_optional())
            .collect();
        assert_eq!(optional, vec![IdentityField::Function]);
    }

    #[test]
    fn test_details_skip_blank_type_name() {
        assert!(details_with_type_name("").is_empty());

        let details = details_with_type_name("Storage Account");
        assert_eq!(
            details.get(DETAIL_RESOURCE_TYPE_NAME).map(String::as_str),
            Some("Storage Account")
        );
    }

    #[test]
    fn test_record_id_serializes_transparently() {
        let json = serde_json::to_string(&RecordId(17)).unwrap();
        assert_eq!(json, "17");
    }
}
