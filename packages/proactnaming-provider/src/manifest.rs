//! Declarative manifest
//!
//! ```yaml
//! version: 1
//! provider:
//!   host: https://naming.example.net
//! resources:
//!   web:
//!     organization: man
//!     resource_type: st
//!     application: webapp
//!     function: test
//!     instance: "001"
//!     location: euw
//!     environment: dev
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::config::ProviderSettings;
use crate::declared::DeclaredName;
use crate::engine::DesiredResource;
use crate::error::{ReconcileError, Result};

pub const MANIFEST_VERSION: u32 = 1;

/// Resource type every manifest entry declares.
pub const RESOURCE_TYPE: &str = "proactnaming_generate_name";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub version: u32,
    #[serde(default)]
    pub provider: ProviderSettings,
    #[serde(default)]
    pub resources: BTreeMap<String, DeclaredName>,
}

pub fn address(name: &str) -> String {
    format!("{}.{}", RESOURCE_TYPE, name)
}

fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl Manifest {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let manifest: Manifest = serde_yaml::from_str(content)?;
        if manifest.version != MANIFEST_VERSION {
            return Err(ReconcileError::manifest(format!(
                "unsupported manifest version {}; supported versions: {}",
                manifest.version, MANIFEST_VERSION
            )));
        }
        if let Some(bad) = manifest.resources.keys().find(|k| !valid_name(k)) {
            return Err(ReconcileError::manifest(format!(
                "invalid resource name '{}': use letters, digits, '_' or '-'",
                bad
            )));
        }
        Ok(manifest)
    }

    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    /// Desired resources keyed by full address.
    pub fn desired(&self) -> Vec<DesiredResource> {
        self.resources
            .iter()
            .map(|(name, declared)| DesiredResource::new(address(name), declared.clone()))
            .collect()
    }
}
