//! Security primitives
//!
//! Platform secret storage used by the keychain credential store.

pub mod keychain;

pub use keychain::{KeychainError, KeychainProvider, SecretStore};
