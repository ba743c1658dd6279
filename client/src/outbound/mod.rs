//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **http**: reqwest-backed [`crate::domain::ports::ApiTransport`]
//! - **session**: in-memory and file-backed session stores
//! - **notify**: tracing-backed notices and login redirect
//!
//! Adapters are thin translators between domain types and infrastructure
//! representations. They contain no business logic.

pub mod http;
pub mod notify;
pub mod session;
