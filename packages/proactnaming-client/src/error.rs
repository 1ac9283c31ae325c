//! Error types for proactnaming-client

use std::fmt;
use thiserror::Error;

/// Transport error kinds
///
/// Adapters report failures with a structured kind so callers never need to
/// inspect message text. `Api` covers any status code without a dedicated kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Credentials were rejected (HTTP 401)
    Unauthorized,
    /// Credentials are valid but lack permission (HTTP 403)
    Forbidden,
    /// The addressed row or resource type does not exist (HTTP 404)
    NotFound,
    /// The request did not complete in time
    Timeout,
    /// The authority could not be reached
    Connection,
    /// Retraction is not possible with the credentials held
    RetractUnsupported,
    /// The authority answered but refused to assign a name
    Rejected,
    /// The response body could not be decoded
    InvalidResponse,
    /// Any other non-success status
    Api,
    /// Client construction failed (bad host, missing key)
    Config,
}

impl TransportErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportErrorKind::Unauthorized => "unauthorized",
            TransportErrorKind::Forbidden => "forbidden",
            TransportErrorKind::NotFound => "not_found",
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Connection => "connection",
            TransportErrorKind::RetractUnsupported => "retract_unsupported",
            TransportErrorKind::Rejected => "rejected",
            TransportErrorKind::InvalidResponse => "invalid_response",
            TransportErrorKind::Api => "api",
            TransportErrorKind::Config => "config",
        }
    }

    /// Map an HTTP status code to a kind.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => TransportErrorKind::Unauthorized,
            403 => TransportErrorKind::Forbidden,
            404 => TransportErrorKind::NotFound,
            408 | 504 => TransportErrorKind::Timeout,
            _ => TransportErrorKind::Api,
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transport error type
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct TransportError {
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub kind: TransportErrorKind,
    /// HTTP status, when the failure came from a response
    pub status: Option<u16>,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Build an error from a non-success HTTP status and its body.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let message = if body.trim().is_empty() {
            format!("status {}", status)
        } else {
            format!("status {}: {}", status, body.trim())
        };
        Self::new(TransportErrorKind::from_status(status), message).with_status(status)
    }

    // Convenience constructors
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::NotFound, message).with_status(404)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connection, message)
    }

    pub fn retract_unsupported(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::RetractUnsupported, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Rejected, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::InvalidResponse, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Config, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == TransportErrorKind::NotFound
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connection
        } else if err.is_decode() {
            TransportErrorKind::InvalidResponse
        } else if let Some(status) = err.status() {
            TransportErrorKind::from_status(status.as_u16())
        } else {
            TransportErrorKind::Api
        };
        let status = err.status().map(|s| s.as_u16());
        let mut out = TransportError::new(kind, err.to_string()).with_source(err);
        out.status = status;
        out
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::invalid_response(format!("JSON error: {}", err)).with_source(err)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, TransportError>;
