//! Login configuration structures
//!
//! Deserialized from TOML/JSON files or assembled from environment variables
//! by the infra config loader.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_API_KEY_NAME, DEFAULT_API_KEY_SCOPE, DEFAULT_API_KEY_SITE, DEFAULT_HTTP_TIMEOUT_SECS,
    DEFAULT_KEYCHAIN_ACCOUNT, DEFAULT_KEYCHAIN_SERVICE, DEFAULT_REDIRECT_PATH,
    DEFAULT_REDIRECT_PORT, DEFAULT_SCOPE, LOOPBACK_HOST,
};

/// Complete login configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginConfig {
    /// OAuth client ID registered with the identity provider
    pub client_id: String,

    /// Authorization endpoint (browser-navigated)
    pub authorization_url: String,

    /// Token endpoint (authorization_code and refresh_token grants)
    pub token_url: String,

    /// Catalog endpoint that issues API keys for an access token
    pub api_key_url: String,

    /// Space-separated OAuth scopes
    #[serde(default = "default_scope")]
    pub scope: String,

    #[serde(default)]
    pub redirect: RedirectConfig,

    #[serde(default)]
    pub api_key: ApiKeySettings,

    #[serde(default)]
    pub storage: StorageConfig,

    /// Per-request timeout for token and API key calls
    #[serde(default = "default_http_timeout")]
    pub http_timeout_seconds: u64,
}

impl LoginConfig {
    /// Create a configuration with default redirect, API key, and storage
    /// settings.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        authorization_url: impl Into<String>,
        token_url: impl Into<String>,
        api_key_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            authorization_url: authorization_url.into(),
            token_url: token_url.into(),
            api_key_url: api_key_url.into(),
            scope: default_scope(),
            redirect: RedirectConfig::default(),
            api_key: ApiKeySettings::default(),
            storage: StorageConfig::default(),
            http_timeout_seconds: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }

    /// Redirect URI registered with the provider, e.g. `http://127.0.0.1:8989/`
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        format!("http://{}:{}{}", LOOPBACK_HOST, self.redirect.port, self.redirect.path)
    }
}

/// Loopback redirect listener settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectConfig {
    /// Fixed local port; must match the redirect URI registered with the
    /// provider
    #[serde(default = "default_redirect_port")]
    pub port: u16,

    #[serde(default = "default_redirect_path")]
    pub path: String,

    /// Provider-hosted "you may close this tab" page. When set, a successful
    /// callback answers with a 302 to this URL instead of the local page.
    #[serde(default)]
    pub success_url: Option<String>,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self { port: DEFAULT_REDIRECT_PORT, path: default_redirect_path(), success_url: None }
    }
}

/// Parameters of the API key requested from the catalog service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeySettings {
    pub scope: String,
    pub name: String,
    pub site: String,
}

impl Default for ApiKeySettings {
    fn default() -> Self {
        Self {
            scope: DEFAULT_API_KEY_SCOPE.to_string(),
            name: DEFAULT_API_KEY_NAME.to_string(),
            site: DEFAULT_API_KEY_SITE.to_string(),
        }
    }
}

/// Which credential store implementation to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CredentialBackend {
    /// Pick by platform capability
    #[default]
    Auto,
    Keychain,
    Settings,
}

impl std::str::FromStr for CredentialBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "keychain" => Ok(Self::Keychain),
            "settings" => Ok(Self::Settings),
            other => Err(format!("unknown credential backend: {other}")),
        }
    }
}

/// Credential persistence settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: CredentialBackend,

    #[serde(default = "default_keychain_service")]
    pub keychain_service: String,

    #[serde(default = "default_keychain_account")]
    pub account: String,

    /// Settings file for the plaintext backend; defaults to the user config
    /// directory
    #[serde(default)]
    pub settings_path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: CredentialBackend::Auto,
            keychain_service: default_keychain_service(),
            account: default_keychain_account(),
            settings_path: None,
        }
    }
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}

const fn default_redirect_port() -> u16 {
    DEFAULT_REDIRECT_PORT
}

fn default_redirect_path() -> String {
    DEFAULT_REDIRECT_PATH.to_string()
}

fn default_keychain_service() -> String {
    DEFAULT_KEYCHAIN_SERVICE.to_string()
}

fn default_keychain_account() -> String {
    DEFAULT_KEYCHAIN_ACCOUNT.to_string()
}

const fn default_http_timeout() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_toml_fills_defaults() {
        let config: LoginConfig = toml::from_str(
            r#"
            client_id = "desktop"
            authorization_url = "https://id.example.com/authorize"
            token_url = "https://id.example.com/token"
            api_key_url = "https://catalog.example.com/api/keys"
            "#,
        )
        .unwrap();

        assert_eq!(config.scope, DEFAULT_SCOPE);
        assert_eq!(config.redirect.port, DEFAULT_REDIRECT_PORT);
        assert_eq!(config.storage.backend, CredentialBackend::Auto);
        assert_eq!(config.api_key.site, "*");
        assert_eq!(config.redirect_uri(), "http://127.0.0.1:8989/");
    }

    #[test]
    fn nested_sections_override_defaults() {
        let config: LoginConfig = toml::from_str(
            r#"
            client_id = "desktop"
            authorization_url = "https://id.example.com/authorize"
            token_url = "https://id.example.com/token"
            api_key_url = "https://catalog.example.com/api/keys"

            [redirect]
            port = 9100
            path = "/callback"
            success_url = "https://id.example.com/done"

            [storage]
            backend = "settings"
            "#,
        )
        .unwrap();

        assert_eq!(config.redirect_uri(), "http://127.0.0.1:9100/callback");
        assert_eq!(config.redirect.success_url.as_deref(), Some("https://id.example.com/done"));
        assert_eq!(config.storage.backend, CredentialBackend::Settings);
        assert_eq!(config.storage.account, DEFAULT_KEYCHAIN_ACCOUNT);
    }

    #[test]
    fn backend_parses_case_insensitively() {
        assert_eq!("Keychain".parse::<CredentialBackend>(), Ok(CredentialBackend::Keychain));
        assert!("vault".parse::<CredentialBackend>().is_err());
    }
}
