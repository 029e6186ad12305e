//! API key authentication for catalog requests

use reqwest::header::AUTHORIZATION;
use reqwest::RequestBuilder;
use tracing::debug;

use crate::login::AuthSession;

/// Trait for providing the catalog API key
///
/// Allows dependency injection and testing with fixed keys.
pub trait ApiKeyProvider: Send + Sync {
    /// Current API key, `None` while logged out
    fn api_key(&self) -> Option<String>;
}

impl ApiKeyProvider for AuthSession {
    fn api_key(&self) -> Option<String> {
        Self::api_key(self)
    }
}

/// `Authorization` header value for an API key
#[must_use]
pub fn authorization_value(api_key: &str) -> String {
    format!("key {api_key}")
}

/// Request-builder extension adding the API key header
pub trait WithApiKey {
    /// Attach `Authorization: key {api_key}` when a key is available
    ///
    /// Without a key the request is returned unchanged and the catalog
    /// answers as for an anonymous caller.
    #[must_use]
    fn with_api_key(self, provider: &dyn ApiKeyProvider) -> Self;
}

impl WithApiKey for RequestBuilder {
    fn with_api_key(self, provider: &dyn ApiKeyProvider) -> Self {
        match provider.api_key() {
            Some(api_key) => self.header(AUTHORIZATION, authorization_value(&api_key)),
            None => {
                debug!("No API key available, sending catalog request unauthenticated");
                self
            }
        }
    }
}
