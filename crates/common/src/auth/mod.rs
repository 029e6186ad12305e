//! OAuth 2.0 + PKCE login primitives
//!
//! Building blocks for the desktop login flow: an Authorization Code grant
//! with PKCE, followed by an exchange of the identity-provider access token
//! for a long-lived catalog API key.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │ AuthSession (infra)  │  Orchestrator + loopback listener
//! └──────────┬───────────┘
//!            │
//!            ├──► PkcePair / AuthorizationRequest   (pure, foundation tier)
//!            ├──► TokenExchange                     (HTTP, runtime tier)
//!            │         └──► TokenExchangeClient
//!            └──► CredentialStore                   (platform tier)
//!                      ├──► KeychainCredentialStore (OS secret manager)
//!                      └──► SettingsCredentialStore (plaintext fallback)
//! ```
//!
//! # Module Organization
//!
//! - **[`pkce`]**: verifier/challenge generation and `state` tokens
//! - **[`authorize`]**: authorization URL assembly
//! - **[`client`]**: token endpoint and API key endpoint calls
//! - **[`traits`]**: `TokenExchange` and `CredentialStore` seams
//! - **[`types`]**: wire formats of the provider and catalog endpoints
//! - **`keychain`** / **`settings`** / **`store`**: credential persistence

pub mod authorize;
pub mod pkce;

#[cfg(feature = "runtime")]
pub mod client;
#[cfg(feature = "runtime")]
pub mod traits;
#[cfg(feature = "runtime")]
pub mod types;

#[cfg(feature = "platform")]
pub mod keychain;
#[cfg(feature = "platform")]
pub mod settings;
#[cfg(feature = "platform")]
pub mod store;

pub use authorize::AuthorizationRequest;
pub use pkce::{generate_code_challenge, generate_code_verifier, generate_state, validate_state};
pub use pkce::PkcePair;

#[cfg(feature = "runtime")]
pub use client::TokenExchangeClient;
#[cfg(feature = "runtime")]
pub use traits::{CredentialStore, TokenExchange};

#[cfg(feature = "platform")]
pub use keychain::KeychainCredentialStore;
#[cfg(feature = "platform")]
pub use settings::SettingsCredentialStore;
#[cfg(feature = "platform")]
pub use store::{default_settings_path, select_credential_store};
