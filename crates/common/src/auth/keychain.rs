//! Credential storage layered on top of the platform keychain.
//!
//! # Module Layering
//!
//! - **`security::keychain`**: generic secret storage via the platform
//!   keychain (macOS Keychain, Windows Credential Manager, Linux Secret
//!   Service)
//! - **`auth::keychain`** (this module): maps a [`Credential`] onto two
//!   keychain entries, `api_key.{account}` and `refresh.{account}`

use std::sync::Arc;

use geoportal_domain::config::StorageConfig;
use geoportal_domain::{Credential, Result, StoreSecurity};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::auth::traits::CredentialStore;
use crate::security::{KeychainError, KeychainProvider, SecretStore};

const API_KEY_PREFIX: &str = "api_key.";
const REFRESH_PREFIX: &str = "refresh.";

/// [`CredentialStore`] backed by the OS secret manager
pub struct KeychainCredentialStore {
    secrets: Arc<dyn SecretStore>,
    account: String,
    /// Readers share; `save`/`clear` are exclusive so a pair is read whole
    entries_lock: RwLock<()>,
}

impl KeychainCredentialStore {
    /// Store over the platform keychain using the configured service and
    /// account names
    #[must_use]
    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(Arc::new(KeychainProvider::new(&config.keychain_service)), &config.account)
    }

    /// Store over any [`SecretStore`] (the mock keychain in tests)
    pub fn new(secrets: Arc<dyn SecretStore>, account: impl Into<String>) -> Self {
        Self { secrets, account: account.into(), entries_lock: RwLock::new(()) }
    }

    fn api_key_entry(&self) -> String {
        format!("{API_KEY_PREFIX}{}", self.account)
    }

    fn refresh_entry(&self) -> String {
        format!("{REFRESH_PREFIX}{}", self.account)
    }

    fn read_optional(&self, key: &str) -> Result<Option<String>> {
        match self.secrets.get_secret(key) {
            Ok(value) => Ok(Some(value)),
            Err(KeychainError::NotFound) => Ok(None),
            Err(other) => Err(other.into()),
        }
    }
}

impl CredentialStore for KeychainCredentialStore {
    fn security(&self) -> StoreSecurity {
        StoreSecurity::PlatformSecretStore
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        let _guard = self.entries_lock.write();
        debug!(account = %self.account, "Storing credential in keychain");

        let api_key_entry = self.api_key_entry();
        self.secrets.set_secret(&api_key_entry, &credential.api_key)?;

        let refresh_result = match &credential.refresh_token {
            Some(refresh) => self.secrets.set_secret(&self.refresh_entry(), refresh),
            None => self.secrets.delete_secret(&self.refresh_entry()),
        };

        if let Err(err) = refresh_result {
            // Roll back so the pair is never half-written
            if let Err(rollback) = self.secrets.delete_secret(&api_key_entry) {
                warn!(account = %self.account, error = %rollback, "Failed to roll back API key entry");
            }
            return Err(err.into());
        }

        debug!(account = %self.account, "Credential stored");
        Ok(())
    }

    fn load(&self) -> Result<Option<Credential>> {
        let _guard = self.entries_lock.read();
        let Some(api_key) = self.read_optional(&self.api_key_entry())? else {
            debug!(account = %self.account, "No credential in keychain");
            return Ok(None);
        };
        let refresh_token = self.read_optional(&self.refresh_entry())?;

        Ok(Some(Credential { api_key, refresh_token }))
    }

    fn clear(&self) -> Result<()> {
        let _guard = self.entries_lock.write();
        debug!(account = %self.account, "Deleting credential from keychain");

        self.secrets.delete_secret(&self.refresh_entry())?;
        self.secrets.delete_secret(&self.api_key_entry())?;
        Ok(())
    }
}
