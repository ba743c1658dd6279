//! Typed async client for the blind-box storefront REST API.
//!
//! The [`domain`] module owns entities, validation and the services; the
//! [`outbound`] module adapts them to reqwest and the local filesystem.
//! [`client::StorefrontClient`] wires both from [`settings::ClientSettings`].

pub mod client;
pub mod domain;
pub mod outbound;
pub mod settings;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use client::{ClientError, LoginWatch, StorefrontClient};
pub use settings::ClientSettings;
