//! Traits for token exchange and credential persistence
//!
//! These traits enable dependency injection and testing by abstracting
//! external dependencies (identity provider, catalog service, system
//! keychain).

use async_trait::async_trait;
use geoportal_domain::{Credential, Result, StoreSecurity, TokenBundle};

/// Trait for the HTTP exchanges of the login flow
///
/// Every call is a single attempt; implementations never retry.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    /// Exchange an authorization code for tokens
    ///
    /// # Arguments
    /// * `code` - Authorization code from the loopback callback
    /// * `verifier` - PKCE verifier of the same attempt
    /// * `redirect_uri` - Redirect URI sent with the authorization request
    ///
    /// # Errors
    /// Returns `TokenExchangeFailed` for provider or parse failures,
    /// `MissingTokenField` when a required field is absent, and
    /// `TransportError` for connection failures.
    async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
    ) -> Result<TokenBundle>;

    /// Obtain fresh tokens from a stored refresh token
    ///
    /// # Errors
    /// Returns `RefreshExpired` for any provider-side rejection and
    /// `TransportError` for connection failures.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenBundle>;

    /// Trade an access token for a catalog API key
    ///
    /// # Errors
    /// Returns `ApiKeyExchangeFailed` or `TransportError`.
    async fn exchange_for_api_key(&self, access_token: &str) -> Result<String>;
}

/// Trait for credential persistence
///
/// Implementations are safe for concurrent reads and serialize writes.
pub trait CredentialStore: Send + Sync {
    /// Whether secrets end up in an OS secret manager or in plaintext
    fn security(&self) -> StoreSecurity;

    /// Persist the credential, replacing any previous one
    ///
    /// # Errors
    /// Returns `CredentialStorage` if the backend rejects the write.
    fn save(&self, credential: &Credential) -> Result<()>;

    /// Load the stored credential; `Ok(None)` when nothing is stored
    ///
    /// # Errors
    /// Returns `CredentialStorage` if the backend cannot be read.
    fn load(&self) -> Result<Option<Credential>>;

    /// Remove the stored credential; succeeds when nothing is stored
    ///
    /// # Errors
    /// Returns `CredentialStorage` if the backend rejects the delete.
    fn clear(&self) -> Result<()>;
}
