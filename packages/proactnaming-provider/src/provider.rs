//! Provider context
//!
//! The configured authority client is carried in an explicit handle that is
//! passed to every reconciliation; nothing is stored globally.

use std::fmt;
use std::sync::Arc;

use proactnaming_client::{HttpAuthority, NamingAuthority};
use tracing::info;

use crate::config::{EnvSource, ProviderSettings};
use crate::error::{ReconcileError, Result};

#[derive(Clone, Default)]
pub struct ProviderContext {
    authority: Option<Arc<dyn NamingAuthority>>,
}

impl ProviderContext {
    pub fn new(authority: Arc<dyn NamingAuthority>) -> Self {
        Self {
            authority: Some(authority),
        }
    }

    /// A context with no authority; previews are skipped and lifecycle
    /// operations fail with `NotConfigured`.
    pub fn unconfigured() -> Self {
        Self { authority: None }
    }

    /// Resolve `settings` and build the HTTP authority client.
    pub fn configure(settings: &ProviderSettings, env: &impl EnvSource) -> Result<Self> {
        let config = settings.resolve(env)?;
        let client = HttpAuthority::new(&config.host, &config.apikey, config.timeout).map_err(|e| {
            ReconcileError::validation("provider", "Unable to Create proactnaming API Client", e.message)
        })?;
        info!(host = %config.host, "configured proactnaming API client");
        Ok(Self::new(Arc::new(client)))
    }

    pub fn authority(&self) -> Option<&Arc<dyn NamingAuthority>> {
        self.authority.as_ref()
    }

    pub fn require_authority(&self) -> Result<&Arc<dyn NamingAuthority>> {
        self.authority.as_ref().ok_or_else(|| {
            ReconcileError::NotConfigured(
                "no naming authority client; configure the provider before managing names".to_string(),
            )
        })
    }

    pub fn is_configured(&self) -> bool {
        self.authority.is_some()
    }
}

impl fmt::Debug for ProviderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderContext")
            .field(
                "authority",
                &self.authority.as_ref().map(|a| a.authority_name()),
            )
            .finish()
    }
}
