//! proactnaming-client - Naming Authority Port
//!
//! The naming authority owns naming-policy rules and issues canonical,
//! policy-compliant resource names. This crate defines how the rest of the
//! workspace talks to it:
//!
//! - `domain`: identity tuple, records, and the `NamingAuthority` port trait
//! - `error`: `TransportError` with a structured `TransportErrorKind`
//! - `infrastructure`: the Azure Naming Tool HTTP adapter and an in-memory
//!   authority for tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use proactnaming_client::{HttpAuthority, IdentityComponents, NamingAuthority, DEFAULT_TIMEOUT};
//!
//! let authority = HttpAuthority::new("https://naming.example.net", &api_key, DEFAULT_TIMEOUT)?;
//! let identity = IdentityComponents::new("man", "st", "webapp", "test", "001", "euw", "dev");
//! let record = authority.generate(&identity).await?;
//! println!("{} -> {}", record.record_id, record.resolved_name);
//! ```

pub mod domain;
pub mod error;
pub mod infrastructure;

pub use error::{Result, TransportError, TransportErrorKind};

pub use domain::{
    IdentityComponents, IdentityField, NameLookup, NameRecord, NamingAuthority, RecordId,
    ResourceType, DETAIL_RESOURCE_TYPE_NAME,
};
#[cfg(feature = "http")]
pub use infrastructure::{parse_host, HttpAuthority, DEFAULT_TIMEOUT};
pub use infrastructure::{CallCounts, InMemoryAuthority, MemoryOp};
