//! Modular login utilities shared across Geoportal crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: PKCE generation and authorization URL building
//! - `runtime`: async token exchange client and the storage/exchange traits
//! - `platform`: platform integrations (keychain, settings-file credential
//!   stores)
//! - `observability`: tracing instrumentation (pulled in by `runtime`)
//! - `test-utils`: in-memory mocks for the auth traits

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod auth;

// Platform tier
// -------------------------------------------------------------------
#[cfg(feature = "platform")]
pub mod security;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", test))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use auth::{AuthorizationRequest, PkcePair};
#[cfg(feature = "runtime")]
pub use auth::{CredentialStore, TokenExchange, TokenExchangeClient};
#[cfg(feature = "platform")]
pub use security::{KeychainError, KeychainProvider};
