//! Error types used throughout the login subsystem

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Login error taxonomy
///
/// Every variant is terminal for the current login attempt. The only
/// automatic recovery is the refresh -> interactive fallback inside
/// `AuthSession`, which swallows `RefreshExpired`.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuthError {
    #[error("Loopback port {port} is already in use")]
    PortInUse { port: u16 },

    #[error("Authorization was cancelled")]
    AuthorizationCancelled,

    #[error("Authorization failed: {detail}")]
    AuthorizationFailed { detail: String },

    #[error("Token exchange failed: {detail}")]
    TokenExchangeFailed { detail: String },

    #[error("Token response is missing `{field}`")]
    MissingTokenField { field: String },

    #[error("Refresh token is expired or revoked")]
    RefreshExpired,

    #[error("API key exchange failed: {detail}")]
    ApiKeyExchangeFailed { detail: String },

    #[error("Transport error: {detail}")]
    TransportError { detail: String },

    #[error("Credential storage error: {detail}")]
    CredentialStorage { detail: String },

    #[error("Configuration error: {detail}")]
    InvalidConfig { detail: String },

    #[error("Internal error: {detail}")]
    Internal { detail: String },
}

impl AuthError {
    pub fn token_exchange(detail: impl Into<String>) -> Self {
        Self::TokenExchangeFailed { detail: detail.into() }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingTokenField { field: field.into() }
    }

    pub fn api_key_exchange(detail: impl Into<String>) -> Self {
        Self::ApiKeyExchangeFailed { detail: detail.into() }
    }

    pub fn transport(detail: impl Into<String>) -> Self {
        Self::TransportError { detail: detail.into() }
    }

    pub fn storage(detail: impl Into<String>) -> Self {
        Self::CredentialStorage { detail: detail.into() }
    }

    pub fn config(detail: impl Into<String>) -> Self {
        Self::InvalidConfig { detail: detail.into() }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal { detail: detail.into() }
    }

    /// Stable label suitable for structured logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PortInUse { .. } => "port_in_use",
            Self::AuthorizationCancelled => "authorization_cancelled",
            Self::AuthorizationFailed { .. } => "authorization_failed",
            Self::TokenExchangeFailed { .. } => "token_exchange_failed",
            Self::MissingTokenField { .. } => "missing_token_field",
            Self::RefreshExpired => "refresh_expired",
            Self::ApiKeyExchangeFailed { .. } => "api_key_exchange_failed",
            Self::TransportError { .. } => "transport_error",
            Self::CredentialStorage { .. } => "credential_storage",
            Self::InvalidConfig { .. } => "invalid_config",
            Self::Internal { .. } => "internal",
        }
    }

    /// Whether this error means the user (or the caller) abandoned the attempt.
    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::AuthorizationCancelled)
    }
}

/// Result type alias for login operations
pub type Result<T> = std::result::Result<T, AuthError>;
