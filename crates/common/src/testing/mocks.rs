//! Mock implementations of the auth traits
//!
//! Provides in-memory objects for testing purposes.

// Allow missing error/panic docs for test mocks - they are designed to be simple
// and errors are clearly indicated by their return types
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[cfg(feature = "platform")]
use std::collections::HashMap;
#[cfg(feature = "runtime")]
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
#[cfg(feature = "runtime")]
use std::time::Duration;

#[cfg(feature = "runtime")]
use async_trait::async_trait;
#[cfg(feature = "runtime")]
use geoportal_domain::{AuthError, Credential, Result, StoreSecurity, TokenBundle};

#[cfg(feature = "runtime")]
use crate::auth::{CredentialStore, TokenExchange};
#[cfg(feature = "platform")]
use crate::security::{KeychainError, SecretStore};

/// In-memory [`SecretStore`] standing in for the platform keychain
#[cfg(feature = "platform")]
#[derive(Debug, Clone, Default)]
pub struct MockSecretStore {
    storage: Arc<Mutex<HashMap<String, String>>>,
}

#[cfg(feature = "platform")]
impl MockSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Determine whether a secret exists.
    #[must_use]
    pub fn secret_exists(&self, key: &str) -> bool {
        self.storage.lock().unwrap().contains_key(key)
    }

    /// Number of stored secrets
    #[must_use]
    pub fn len(&self) -> usize {
        self.storage.lock().unwrap().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(feature = "platform")]
impl SecretStore for MockSecretStore {
    fn set_secret(&self, key: &str, value: &str) -> std::result::Result<(), KeychainError> {
        self.storage.lock().unwrap().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get_secret(&self, key: &str) -> std::result::Result<String, KeychainError> {
        self.storage.lock().unwrap().get(key).cloned().ok_or(KeychainError::NotFound)
    }

    fn delete_secret(&self, key: &str) -> std::result::Result<(), KeychainError> {
        self.storage.lock().unwrap().remove(key);
        Ok(())
    }
}

/// In-memory [`CredentialStore`] that counts writes
#[cfg(feature = "runtime")]
#[derive(Debug, Clone)]
pub struct MockCredentialStore {
    credential: Arc<Mutex<Option<Credential>>>,
    saves: Arc<AtomicUsize>,
    clears: Arc<AtomicUsize>,
    fail_saves: Arc<Mutex<bool>>,
    security: StoreSecurity,
}

#[cfg(feature = "runtime")]
impl MockCredentialStore {
    /// Empty store reporting `PlatformSecretStore`
    pub fn new() -> Self {
        Self {
            credential: Arc::new(Mutex::new(None)),
            saves: Arc::new(AtomicUsize::new(0)),
            clears: Arc::new(AtomicUsize::new(0)),
            fail_saves: Arc::new(Mutex::new(false)),
            security: StoreSecurity::PlatformSecretStore,
        }
    }

    /// Store pre-populated with a credential (not counted as a save)
    pub fn with_credential(credential: Credential) -> Self {
        let store = Self::new();
        *store.credential.lock().unwrap() = Some(credential);
        store
    }

    /// Override the reported security capability
    #[must_use]
    pub fn with_security(mut self, security: StoreSecurity) -> Self {
        self.security = security;
        self
    }

    /// Make subsequent `save` calls fail with `CredentialStorage`
    pub fn fail_saves(&self, fail: bool) {
        *self.fail_saves.lock().unwrap() = fail;
    }

    /// Currently stored credential
    #[must_use]
    pub fn current(&self) -> Option<Credential> {
        self.credential.lock().unwrap().clone()
    }

    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

#[cfg(feature = "runtime")]
impl Default for MockCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "runtime")]
impl CredentialStore for MockCredentialStore {
    fn security(&self) -> StoreSecurity {
        self.security
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        if *self.fail_saves.lock().unwrap() {
            return Err(AuthError::storage("mock store rejects writes"));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.credential.lock().unwrap() = Some(credential.clone());
        Ok(())
    }

    fn load(&self) -> Result<Option<Credential>> {
        Ok(self.credential.lock().unwrap().clone())
    }

    fn clear(&self) -> Result<()> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        *self.credential.lock().unwrap() = None;
        Ok(())
    }
}

/// Scripted [`TokenExchange`] that records how it was called
///
/// Defaults to success on every call. An optional delay is applied before
/// each response so cancellation paths can be exercised.
#[cfg(feature = "runtime")]
#[derive(Debug, Clone)]
pub struct MockTokenExchange {
    code_result: Arc<Mutex<Result<TokenBundle>>>,
    refresh_result: Arc<Mutex<Result<TokenBundle>>>,
    api_key_result: Arc<Mutex<Result<String>>>,
    delay: Arc<Mutex<Option<Duration>>>,
    code_calls: Arc<AtomicUsize>,
    refresh_calls: Arc<AtomicUsize>,
    api_key_calls: Arc<AtomicUsize>,
    last_code: Arc<Mutex<Option<(String, String, String)>>>,
}

#[cfg(feature = "runtime")]
impl MockTokenExchange {
    /// Exchange that succeeds with `access`/`refresh` tokens and `api_key`
    pub fn new(access_token: &str, refresh_token: &str, api_key: &str) -> Self {
        let bundle = TokenBundle {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            expires_in: 3600,
        };
        Self {
            code_result: Arc::new(Mutex::new(Ok(bundle.clone()))),
            refresh_result: Arc::new(Mutex::new(Ok(bundle))),
            api_key_result: Arc::new(Mutex::new(Ok(api_key.to_string()))),
            delay: Arc::new(Mutex::new(None)),
            code_calls: Arc::new(AtomicUsize::new(0)),
            refresh_calls: Arc::new(AtomicUsize::new(0)),
            api_key_calls: Arc::new(AtomicUsize::new(0)),
            last_code: Arc::new(Mutex::new(None)),
        }
    }

    pub fn set_code_result(&self, result: Result<TokenBundle>) {
        *self.code_result.lock().unwrap() = result;
    }

    pub fn set_refresh_result(&self, result: Result<TokenBundle>) {
        *self.refresh_result.lock().unwrap() = result;
    }

    pub fn set_api_key_result(&self, result: Result<String>) {
        *self.api_key_result.lock().unwrap() = result;
    }

    /// Delay every response; `None` answers immediately
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    #[must_use]
    pub fn code_calls(&self) -> usize {
        self.code_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn api_key_calls(&self) -> usize {
        self.api_key_calls.load(Ordering::SeqCst)
    }

    /// `(code, verifier, redirect_uri)` of the last code exchange
    #[must_use]
    pub fn last_code_exchange(&self) -> Option<(String, String, String)> {
        self.last_code.lock().unwrap().clone()
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(feature = "runtime")]
#[async_trait]
impl TokenExchange for MockTokenExchange {
    async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
    ) -> Result<TokenBundle> {
        self.code_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_code.lock().unwrap() =
            Some((code.to_string(), verifier.to_string(), redirect_uri.to_string()));
        self.pause().await;
        self.code_result.lock().unwrap().clone()
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<TokenBundle> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.refresh_result.lock().unwrap().clone()
    }

    async fn exchange_for_api_key(&self, _access_token: &str) -> Result<String> {
        self.api_key_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.api_key_result.lock().unwrap().clone()
    }
}
