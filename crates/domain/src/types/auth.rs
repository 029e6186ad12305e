//! Login data model
//!
//! `TokenBundle` only ever lives in memory during the exchange pipeline. The
//! durable entity is `Credential`, owned by a credential store.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::AuthError;

/// Session lifecycle state observed by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    #[default]
    LoggedOut,
    LoggingIn,
    LoggedIn,
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::LoggedOut => "logged_out",
            Self::LoggingIn => "logging_in",
            Self::LoggedIn => "logged_in",
        };
        f.write_str(label)
    }
}

/// Outcome of one loopback listener invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackResult {
    /// The provider redirected back with an authorization code.
    Success { code: String },
    /// The user declined consent, or the listener was cancelled.
    Cancelled,
    /// The redirect could not be trusted (e.g. state mismatch).
    Error { message: String },
}

/// Identity-provider tokens returned by the token endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenBundle {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

impl fmt::Debug for TokenBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenBundle")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Durable at-rest credential: the catalog API key plus the refresh token
/// used for non-interactive renewal.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl Credential {
    #[must_use]
    pub fn new(api_key: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self { api_key: api_key.into(), refresh_token }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("api_key", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Security capability of a credential store.
///
/// Callers can surface this to the user; the plaintext fallback is never
/// selected silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreSecurity {
    /// OS secret manager (Keychain, Credential Manager, Secret Service);
    /// persists across reboots
    PlatformSecretStore,
    /// App-scoped settings file readable by the current user
    PlaintextSettings,
}

/// Notification emitted by the session to its subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// The interactive flow is waiting on the browser at this URL.
    AuthorizationStarted { authorization_url: String },
    LoggedIn { api_key: String },
    LoginFailed { error: AuthError },
    LoginCancelled,
    LoggedOut,
}
