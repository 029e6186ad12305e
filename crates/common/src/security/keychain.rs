//! Keychain provider for secure secret storage
//!
//! Thin wrapper over the platform keychain for storing string secrets across
//! macOS (Keychain Access), Windows (Credential Manager), and Linux (Secret
//! Service over D-Bus, fronted by a kernel keyutils cache). Entries persist
//! across reboots on every platform.
//!
//! ## Module Relationships
//!
//! - This module (`security::keychain`): generic secret storage
//! - `auth::keychain`: credential-specific storage built on [`SecretStore`]
//!
//! ## Usage
//!
//! ```no_run
//! use geoportal_common::security::keychain::{KeychainProvider, SecretStore};
//!
//! let keychain = KeychainProvider::new("Geoportal.catalog");
//! keychain.set_secret("api_key.default", "super-secret")?;
//! let secret = keychain.get_secret("api_key.default")?;
//! assert_eq!(secret, "super-secret");
//! # Ok::<(), geoportal_common::security::KeychainError>(())
//! ```

use keyring::Entry;
use thiserror::Error;
use tracing::debug;

/// String secret storage keyed by a logical name
///
/// Implemented by [`KeychainProvider`] and by the in-memory mock in
/// `testing`.
pub trait SecretStore: Send + Sync {
    /// Store a secret, replacing any existing value
    ///
    /// # Errors
    /// Returns `KeychainError::AccessFailed` if the backend rejects the write
    fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError>;

    /// Retrieve a secret
    ///
    /// # Errors
    /// Returns `KeychainError::NotFound` if the secret doesn't exist
    fn get_secret(&self, key: &str) -> Result<String, KeychainError>;

    /// Delete a secret (idempotent)
    ///
    /// # Errors
    /// Returns `KeychainError::AccessFailed` if the backend rejects the delete
    fn delete_secret(&self, key: &str) -> Result<(), KeychainError>;
}

/// Platform keychain provider scoped to one service name
#[derive(Debug, Clone)]
pub struct KeychainProvider {
    service_name: String,
}

impl KeychainProvider {
    /// Create a new keychain provider for a specific service
    ///
    /// # Arguments
    /// * `service_name` - Service identifier (e.g., "Geoportal.catalog")
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into() }
    }

    /// Service identifier entries are filed under
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    fn create_entry(&self, account: &str) -> Result<Entry, KeychainError> {
        Entry::new(&self.service_name, account).map_err(|e| {
            KeychainError::AccessFailed(format!("Failed to create keychain entry: {e}"))
        })
    }
}

impl SecretStore for KeychainProvider {
    fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError> {
        debug!(service = %self.service_name, key = %key, "Storing secret in keychain");

        let entry = self.create_entry(key)?;
        entry.set_password(value).map_err(|e| access_failed("store", key, &e))?;

        debug!(service = %self.service_name, key = %key, "Secret stored successfully");
        Ok(())
    }

    fn get_secret(&self, key: &str) -> Result<String, KeychainError> {
        debug!(service = %self.service_name, key = %key, "Retrieving secret from keychain");

        let entry = self.create_entry(key)?;
        entry.get_password().map_err(|e| match e {
            keyring::Error::NoEntry => KeychainError::NotFound,
            other => access_failed("retrieve", key, &other),
        })
    }

    fn delete_secret(&self, key: &str) -> Result<(), KeychainError> {
        debug!(service = %self.service_name, key = %key, "Deleting secret from keychain");

        let entry = self.create_entry(key)?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(access_failed("delete", key, &e)),
        }
    }
}

fn access_failed(action: &str, key: &str, err: &keyring::Error) -> KeychainError {
    KeychainError::AccessFailed(format!("Failed to {action} secret for {key}: {err}"))
}

/// Keychain error types
#[derive(Debug, Error)]
pub enum KeychainError {
    /// Keychain access failed (permission denied, not available, etc.)
    #[error("Keychain access failed: {0}")]
    AccessFailed(String),

    /// Entry not found in keychain
    #[error("Entry not found")]
    NotFound,
}

impl From<KeychainError> for geoportal_domain::AuthError {
    fn from(err: KeychainError) -> Self {
        Self::storage(err.to_string())
    }
}
