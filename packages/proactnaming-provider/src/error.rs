use std::fmt;

use proactnaming_client::TransportError;
use thiserror::Error;

use crate::classify::Operation;

pub type Result<T> = std::result::Result<T, ReconcileError>;

/// One offending configuration field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldProblem {
    pub field: String,
    pub summary: String,
    pub detail: String,
}

impl FieldProblem {
    pub fn new(
        field: impl Into<String>,
        summary: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            summary: summary.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for FieldProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.summary, self.field, self.detail)
    }
}

fn join_problems(problems: &[FieldProblem]) -> String {
    problems
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Error, Debug)]
pub enum ReconcileError {
    /// An authority call failed and was mapped onto the user-facing taxonomy.
    #[error("{summary}: {detail}")]
    Classified {
        kind: ErrorKind,
        operation: Operation,
        summary: String,
        detail: String,
        #[source]
        source: TransportError,
    },

    #[error("Validation failed: {}", join_problems(.0))]
    Validation(Vec<FieldProblem>),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("In-place update of {address} is not supported: changed identity attributes [{fields}] require replacement")]
    UpdateUnsupported { address: String, fields: String },

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Saved plan is stale for {address}: {reason}")]
    StalePlan { address: String, reason: String },

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("State store error: {0}")]
    State(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReconcileError {
    pub fn validation(
        field: impl Into<String>,
        summary: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::Validation(vec![FieldProblem::new(field, summary, detail)])
    }

    pub fn serialization<E: fmt::Display>(e: E) -> Self {
        Self::Serialization(e.to_string())
    }

    pub fn manifest<E: fmt::Display>(e: E) -> Self {
        Self::Manifest(e.to_string())
    }

    pub fn state<E: fmt::Display>(e: E) -> Self {
        Self::State(e.to_string())
    }

    /// Position of this error in the user-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReconcileError::Classified { kind, .. } => *kind,
            ReconcileError::Validation(_)
            | ReconcileError::NotConfigured(_)
            | ReconcileError::Manifest(_) => ErrorKind::ValidationFailed,
            _ => ErrorKind::Unclassified,
        }
    }

    /// The transport failure behind a classified error.
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            ReconcileError::Classified { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ReconcileError {
    fn from(e: serde_json::Error) -> Self {
        Self::serialization(e)
    }
}

impl From<serde_yaml::Error> for ReconcileError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::manifest(e)
    }
}

/// User-facing error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The API key was rejected
    AuthenticationFailed,
    /// The API key lacks permission for the operation
    AccessForbidden,
    /// The addressed row or resource type does not exist
    NotFound,
    /// The authority did not answer in time
    RequestTimeout,
    /// The authority could not be reached
    ConnectionError,
    /// Required configuration is missing, empty or malformed
    ValidationFailed,
    /// Anything else; messages carry the raw failure text
    Unclassified,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::AuthenticationFailed => "authentication_failed",
            ErrorKind::AccessForbidden => "access_forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::RequestTimeout => "request_timeout",
            ErrorKind::ConnectionError => "connection_error",
            ErrorKind::ValidationFailed => "validation_failed",
            ErrorKind::Unclassified => "unclassified",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "authentication_failed" => Ok(ErrorKind::AuthenticationFailed),
            "access_forbidden" => Ok(ErrorKind::AccessForbidden),
            "not_found" => Ok(ErrorKind::NotFound),
            "request_timeout" => Ok(ErrorKind::RequestTimeout),
            "connection_error" => Ok(ErrorKind::ConnectionError),
            "validation_failed" => Ok(ErrorKind::ValidationFailed),
            "unclassified" => Ok(ErrorKind::Unclassified),
            _ => Err(ReconcileError::serialization(format!(
                "Invalid error kind: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_roundtrip() {
        for kind in &[
            ErrorKind::AuthenticationFailed,
            ErrorKind::AccessForbidden,
            ErrorKind::NotFound,
            ErrorKind::RequestTimeout,
            ErrorKind::ConnectionError,
            ErrorKind::ValidationFailed,
            ErrorKind::Unclassified,
        ] {
            let parsed = ErrorKind::from_str(kind.as_str()).unwrap();
            assert_eq!(*kind, parsed);
        }
    }

    #[test]
    fn test_error_kind_invalid() {
        assert!(ErrorKind::from_str("teapot").is_err());
    }

    #[test]
    fn test_validation_message_lists_every_field() {
        let err = ReconcileError::Validation(vec![
            FieldProblem::new("host", "Missing proactnaming API Host", "set host"),
            FieldProblem::new("apikey", "Missing proactnaming API Key", "set apikey"),
        ]);

        let msg = err.to_string();
        assert!(msg.contains("(host)"));
        assert!(msg.contains("(apikey)"));
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    }

    #[test]
    fn test_unclassified_fallback_kind() {
        let err = ReconcileError::InvalidStateTransition {
            from: "bound".to_string(),
            to: "bound".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Unclassified);
        assert!(err.transport().is_none());
    }
}
