//! Naming authority adapters

#[cfg(feature = "http")]
pub mod http;
pub mod memory;

#[cfg(feature = "http")]
pub use http::{parse_host, HttpAuthority, DEFAULT_TIMEOUT};
pub use memory::{default_catalogue, CallCounts, InMemoryAuthority, MemoryOp};
