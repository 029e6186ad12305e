//! Testing utilities and helpers
//!
//! - **[`mocks`]**: in-memory implementations of the auth traits
//!
//! ## Usage
//!
//! ```rust
//! # #[cfg(feature = "runtime")]
//! # {
//! use geoportal_common::testing::MockCredentialStore;
//! use geoportal_common::CredentialStore;
//! use geoportal_domain::Credential;
//!
//! let store = MockCredentialStore::new();
//! store.save(&Credential::new("key", Some("refresh".into()))).unwrap();
//! assert_eq!(store.save_count(), 1);
//! # }
//! ```

pub mod mocks;

#[cfg(feature = "platform")]
pub use mocks::MockSecretStore;
#[cfg(feature = "runtime")]
pub use mocks::{MockCredentialStore, MockTokenExchange};
