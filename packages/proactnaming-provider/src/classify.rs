//! Transport failure classification
//!
//! Maps a `TransportError` onto the user-facing `ErrorKind` taxonomy and
//! produces an actionable summary/detail pair for the operation that failed.
//! Structured transport kinds map directly; only generic API failures fall
//! back to inspecting the status code and message text.

use std::fmt;

use proactnaming_client::{TransportError, TransportErrorKind};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, ReconcileError};

/// The authority operation a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Generate,
    Lookup,
    Retract,
    ListGeneratedName,
    ListResourceTypes,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Generate => "generate",
            Operation::Lookup => "lookup",
            Operation::Retract => "retract",
            Operation::ListGeneratedName => "list_generated_name",
            Operation::ListResourceTypes => "list_resource_types",
        }
    }

    fn fallback_summary(&self) -> &'static str {
        match self {
            Operation::Generate => "Unable to Create generated name",
            Operation::Lookup | Operation::ListGeneratedName => "Unable to Read generated name",
            Operation::Retract => "Unable to Delete generated name",
            Operation::ListResourceTypes => "Unable to Read resource types",
        }
    }

    fn activity(&self) -> &'static str {
        match self {
            Operation::Generate => "generating the name",
            Operation::Lookup | Operation::ListGeneratedName => "reading the resource",
            Operation::Retract => "deleting the resource",
            Operation::ListResourceTypes => "listing resource types",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Map a transport failure onto the taxonomy.
pub fn kind_of(err: &TransportError) -> ErrorKind {
    match err.kind {
        TransportErrorKind::Unauthorized => ErrorKind::AuthenticationFailed,
        TransportErrorKind::Forbidden | TransportErrorKind::RetractUnsupported => {
            ErrorKind::AccessForbidden
        }
        TransportErrorKind::NotFound => ErrorKind::NotFound,
        TransportErrorKind::Timeout => ErrorKind::RequestTimeout,
        TransportErrorKind::Connection => ErrorKind::ConnectionError,
        TransportErrorKind::Config => ErrorKind::ValidationFailed,
        TransportErrorKind::Rejected | TransportErrorKind::InvalidResponse => {
            ErrorKind::Unclassified
        }
        TransportErrorKind::Api => match err.status {
            Some(status) => match kind_of_status(status) {
                ErrorKind::Unclassified => kind_of_keywords(&err.message.to_lowercase()),
                kind => kind,
            },
            None => kind_of_message(&err.message),
        },
    }
}

fn kind_of_status(status: u16) -> ErrorKind {
    match status {
        401 => ErrorKind::AuthenticationFailed,
        403 => ErrorKind::AccessForbidden,
        404 => ErrorKind::NotFound,
        408 | 504 => ErrorKind::RequestTimeout,
        502 | 503 => ErrorKind::ConnectionError,
        _ => ErrorKind::Unclassified,
    }
}

/// Substring fallback for failures that carry no structured signal.
///
/// Status codes only count when written as a status token (`status 401`,
/// `HTTP 404`), never as bare digits inside ids or sizes.
pub fn kind_of_message(message: &str) -> ErrorKind {
    let text = message.to_lowercase();
    match status_token(&text).map(kind_of_status) {
        Some(kind) if kind != ErrorKind::Unclassified => kind,
        _ => kind_of_keywords(&text),
    }
}

fn kind_of_keywords(text: &str) -> ErrorKind {
    if text.contains("unauthorized") {
        ErrorKind::AuthenticationFailed
    } else if text.contains("forbidden") {
        ErrorKind::AccessForbidden
    } else if text.contains("not found") {
        ErrorKind::NotFound
    } else if text.contains("timeout") || text.contains("timed out") {
        ErrorKind::RequestTimeout
    } else if text.contains("connection") {
        ErrorKind::ConnectionError
    } else {
        ErrorKind::Unclassified
    }
}

const STATUS_PREFIXES: [&str; 4] = ["status code ", "status: ", "status ", "http "];

/// First three-digit code following a status prefix in lower-cased `text`.
fn status_token(text: &str) -> Option<u16> {
    STATUS_PREFIXES.iter().find_map(|prefix| {
        text.match_indices(prefix).find_map(|(at, _)| {
            let rest = &text[at + prefix.len()..];
            let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
            if digits == 3 {
                rest[..3].parse().ok()
            } else {
                None
            }
        })
    })
}

/// Classify `err` raised by `operation`.
///
/// `subject` names what the call was about: the resource type for
/// *generate*, the record id for lookups and retraction.
pub fn classify(operation: Operation, err: TransportError, subject: &str) -> ReconcileError {
    let kind = kind_of(&err);
    let (summary, detail) = describe(operation, kind, &err, subject);
    ReconcileError::Classified {
        kind,
        operation,
        summary,
        detail,
        source: err,
    }
}

fn describe(
    operation: Operation,
    kind: ErrorKind,
    err: &TransportError,
    subject: &str,
) -> (String, String) {
    let reading = matches!(operation, Operation::Lookup | Operation::ListGeneratedName);

    match kind {
        ErrorKind::AuthenticationFailed => (
            "Authentication Failed".to_string(),
            if operation == Operation::Generate {
                "Invalid API key or insufficient permissions. Please check your API key configuration \
                 and ensure it has the necessary permissions to generate names."
                    .to_string()
            } else {
                "Invalid API key or insufficient permissions. Please check your API key configuration."
                    .to_string()
            },
        ),
        ErrorKind::AccessForbidden => (
            "Access Forbidden".to_string(),
            if reading {
                "The API key does not have permission to read this resource.".to_string()
            } else {
                "The API key does not have permission to perform this operation. \
                 Please contact your administrator."
                    .to_string()
            },
        ),
        ErrorKind::NotFound => match operation {
            Operation::Generate => (
                "Resource Type Not Found".to_string(),
                format!(
                    "The specified resource type '{}' was not found in the naming tool configuration.",
                    subject
                ),
            ),
            Operation::ListResourceTypes => (
                "Resource Types Not Found".to_string(),
                "The naming tool did not expose a resource type catalogue at the configured host."
                    .to_string(),
            ),
            _ => (
                "Generated Name Not Found".to_string(),
                format!("No generated name with id {} exists in the naming tool.", subject),
            ),
        },
        ErrorKind::RequestTimeout => (
            "Request Timeout".to_string(),
            if operation == Operation::Generate {
                "The request to the naming tool API timed out. Please try again or check the API \
                 endpoint status."
                    .to_string()
            } else {
                "The request to the naming tool API timed out. Please try again.".to_string()
            },
        ),
        ErrorKind::ConnectionError => (
            "Connection Error".to_string(),
            "Unable to connect to the naming tool API. Please check the host configuration and \
             network connectivity."
                .to_string(),
        ),
        ErrorKind::ValidationFailed => (
            "Invalid Configuration".to_string(),
            err.message.clone(),
        ),
        ErrorKind::Unclassified => (
            operation.fallback_summary().to_string(),
            format!(
                "An unexpected error occurred while {}: {}",
                operation.activity(),
                err.message
            ),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classified(operation: Operation, err: TransportError, subject: &str) -> (ErrorKind, String, String) {
        match classify(operation, err, subject) {
            ReconcileError::Classified {
                kind,
                summary,
                detail,
                ..
            } => (kind, summary, detail),
            other => panic!("expected classified error, got {other:?}"),
        }
    }

    #[test]
    fn test_structured_kinds_map_directly() {
        let cases = [
            (TransportErrorKind::Unauthorized, ErrorKind::AuthenticationFailed),
            (TransportErrorKind::Forbidden, ErrorKind::AccessForbidden),
            (TransportErrorKind::NotFound, ErrorKind::NotFound),
            (TransportErrorKind::Timeout, ErrorKind::RequestTimeout),
            (TransportErrorKind::Connection, ErrorKind::ConnectionError),
            (TransportErrorKind::Config, ErrorKind::ValidationFailed),
            (TransportErrorKind::Rejected, ErrorKind::Unclassified),
        ];
        for (transport, expected) in cases {
            let err = TransportError::new(transport, "opaque");
            assert_eq!(kind_of(&err), expected, "{transport}");
        }
    }

    #[test]
    fn test_api_kind_uses_status_then_message() {
        let err = TransportError::new(TransportErrorKind::Api, "whatever").with_status(503);
        assert_eq!(kind_of(&err), ErrorKind::ConnectionError);

        let err = TransportError::new(TransportErrorKind::Api, "upstream said: Unauthorized")
            .with_status(500);
        assert_eq!(kind_of(&err), ErrorKind::AuthenticationFailed);

        let err = TransportError::new(TransportErrorKind::Api, "disk quota exceeded");
        assert_eq!(kind_of(&err), ErrorKind::Unclassified);
    }

    #[test]
    fn test_message_fallback() {
        assert_eq!(kind_of_message("HTTP 401"), ErrorKind::AuthenticationFailed);
        assert_eq!(kind_of_message("Forbidden by policy"), ErrorKind::AccessForbidden);
        assert_eq!(kind_of_message("row not found"), ErrorKind::NotFound);
        assert_eq!(kind_of_message("operation timed out"), ErrorKind::RequestTimeout);
        assert_eq!(kind_of_message("connection reset by peer"), ErrorKind::ConnectionError);
        assert_eq!(kind_of_message("boom"), ErrorKind::Unclassified);
    }

    #[test]
    fn test_bare_digits_do_not_classify() {
        assert_eq!(
            kind_of_message("record 14012 exceeded 4030 bytes"),
            ErrorKind::Unclassified
        );
        assert_eq!(kind_of_message("upstream status 4041"), ErrorKind::Unclassified);
        assert_eq!(kind_of_message("Status code 403 from gateway"), ErrorKind::AccessForbidden);
        assert_eq!(kind_of_message("status: 404"), ErrorKind::NotFound);

        // A structured status wins over digits in the body.
        let err = TransportError::from_status(500, "failed for id 401");
        assert_eq!(kind_of(&err), ErrorKind::Unclassified);
    }

    #[test]
    fn test_generate_not_found_names_resource_type() {
        let (kind, summary, detail) =
            classified(Operation::Generate, TransportError::not_found("404"), "zz");
        assert_eq!(kind, ErrorKind::NotFound);
        assert_eq!(summary, "Resource Type Not Found");
        assert!(detail.contains("'zz'"));
    }

    #[test]
    fn test_read_forbidden_message() {
        let (_, summary, detail) = classified(
            Operation::Lookup,
            TransportError::new(TransportErrorKind::Forbidden, "403"),
            "7",
        );
        assert_eq!(summary, "Access Forbidden");
        assert!(detail.contains("read this resource"));
    }

    #[test]
    fn test_unclassified_includes_raw_text() {
        let (kind, summary, detail) = classified(
            Operation::Generate,
            TransportError::rejected("Resource name already exists"),
            "st",
        );
        assert_eq!(kind, ErrorKind::Unclassified);
        assert_eq!(summary, "Unable to Create generated name");
        assert!(detail.contains("Resource name already exists"));
    }
}
