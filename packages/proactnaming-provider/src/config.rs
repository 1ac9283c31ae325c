//! Provider configuration
//!
//! Host and API key come from the `provider` block of the manifest or from
//! the `PROACTNAMING_HOST` / `PROACTNAMING_APIKEY` environment variables.
//! Explicit values win over the environment. Resolution fails before any
//! authority call is made and reports every offending field at once.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use proactnaming_client::parse_host;
use serde::Deserialize;
use tracing::debug;

use crate::error::{FieldProblem, ReconcileError, Result};
use crate::value::Value;

pub const HOST_ENV: &str = "PROACTNAMING_HOST";
pub const APIKEY_ENV: &str = "PROACTNAMING_APIKEY";

/// Default per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Source of environment variables
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Provider settings as declared
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderSettings {
    #[serde(default)]
    pub host: Value<String>,
    #[serde(default)]
    pub apikey: Value<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ProviderSettings {
    pub fn new(host: impl Into<String>, apikey: impl Into<String>) -> Self {
        Self {
            host: Value::Known(host.into()),
            apikey: Value::Known(apikey.into()),
            timeout_secs: None,
        }
    }

    /// Resolve against `env`, validating every field.
    pub fn resolve(&self, env: &impl EnvSource) -> Result<ResolvedConfig> {
        let mut problems = Vec::new();

        if self.host.is_unknown() {
            problems.push(FieldProblem::new(
                "host",
                "Unknown proactnaming API Host",
                format!(
                    "The provider cannot create the proactnaming API client as there is an unknown \
                     configuration value for the proactnaming API host. Either apply the source of \
                     the value first, set the value statically in the configuration, or use the {} \
                     environment variable.",
                    HOST_ENV
                ),
            ));
        }
        if self.apikey.is_unknown() {
            problems.push(FieldProblem::new(
                "apikey",
                "Unknown proactnaming API Key",
                format!(
                    "The provider cannot create the proactnaming API client as there is an unknown \
                     configuration value for the proactnaming API key. Either apply the source of \
                     the value first, set the value statically in the configuration, or use the {} \
                     environment variable.",
                    APIKEY_ENV
                ),
            ));
        }
        if !problems.is_empty() {
            return Err(ReconcileError::Validation(problems));
        }

        let host = pick(&self.host, env.var(HOST_ENV));
        let apikey = pick(&self.apikey, env.var(APIKEY_ENV));

        if host.trim().is_empty() {
            problems.push(FieldProblem::new(
                "host",
                "Missing proactnaming API Host",
                format!(
                    "The provider cannot create the proactnaming API client as there is a missing or \
                     empty value for the proactnaming API host. Set the host value in the \
                     configuration or use the {} environment variable.",
                    HOST_ENV
                ),
            ));
        } else if let Err(e) = parse_host(&host) {
            problems.push(FieldProblem::new(
                "host",
                "Invalid Host Configuration",
                e.message,
            ));
        }

        if apikey.trim().is_empty() {
            problems.push(FieldProblem::new(
                "apikey",
                "Missing proactnaming API Key",
                format!(
                    "The provider cannot create the proactnaming API client as there is a missing or \
                     empty value for the proactnaming API key. Set the apikey value in the \
                     configuration or use the {} environment variable.",
                    APIKEY_ENV
                ),
            ));
        }

        let timeout_secs = self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            problems.push(FieldProblem::new(
                "timeout_secs",
                "Invalid Timeout",
                "timeout_secs must be greater than zero",
            ));
        }

        if !problems.is_empty() {
            return Err(ReconcileError::Validation(problems));
        }

        debug!(host = %host.trim(), timeout_secs, "provider configuration resolved");
        Ok(ResolvedConfig {
            host: host.trim().to_string(),
            apikey,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn pick(explicit: &Value<String>, env: Option<String>) -> String {
    match explicit {
        Value::Known(v) => v.clone(),
        _ => env.unwrap_or_default(),
    }
}

/// Validated settings, ready to build an authority client
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub host: String,
    pub apikey: String,
    pub timeout: Duration,
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let apikey: Value<&str> = match &self.apikey {
            Value::Known(_) => Value::Known("<redacted>"),
            Value::Unknown => Value::Unknown,
            Value::Null => Value::Null,
        };
        f.debug_struct("ProviderSettings")
            .field("host", &self.host)
            .field("apikey", &apikey)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("host", &self.host)
            .field("apikey", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}
