//! Wire formats of the identity provider and catalog endpoints

use geoportal_domain::{AuthError, Result, TokenBundle};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Token endpoint response body
///
/// Every field is optional so that missing fields can be reported by name
/// instead of as an opaque parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenEndpointResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Seconds; some providers send a numeric string
    #[serde(default)]
    pub expires_in: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl TokenEndpointResponse {
    /// Provider error, formatted as `error: description`
    #[must_use]
    pub fn error_detail(&self) -> Option<String> {
        self.error.as_ref().map(|error| match &self.error_description {
            Some(description) if !description.is_empty() => format!("{error}: {description}"),
            _ => error.clone(),
        })
    }

    /// `expires_in` as whole seconds, if present and numeric
    ///
    /// Fractional values (`3600.0`, `"59.5"`) are truncated; negative or
    /// non-finite values are rejected.
    #[must_use]
    pub fn expires_in_seconds(&self) -> Option<u64> {
        match self.expires_in.as_ref()? {
            Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(whole_seconds)),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<u64>().ok().or_else(|| s.parse::<f64>().ok().and_then(whole_seconds))
            }
            _ => None,
        }
    }

    /// Convert into a bundle, requiring every field
    ///
    /// `fallback_refresh_token` is used when the response omits
    /// `refresh_token` (refresh grants that do not rotate).
    ///
    /// # Errors
    /// Returns `MissingTokenField` naming the first absent field.
    pub fn into_bundle(self, fallback_refresh_token: Option<&str>) -> Result<TokenBundle> {
        let expires_in = self.expires_in_seconds();
        let access_token = self
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AuthError::missing_field("access_token"))?;
        let expires_in = expires_in.ok_or_else(|| AuthError::missing_field("expires_in"))?;
        let refresh_token = self
            .refresh_token
            .filter(|token| !token.is_empty())
            .or_else(|| fallback_refresh_token.map(str::to_string))
            .ok_or_else(|| AuthError::missing_field("refresh_token"))?;

        Ok(TokenBundle { access_token, refresh_token, expires_in })
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_seconds(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0).then(|| value.trunc() as u64)
}

/// API key creation request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiKeyRequest<'a> {
    pub scope: &'a str,
    pub name: &'a str,
    pub site: &'a str,
}

/// API key creation response body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiKeyResponse {
    #[serde(default)]
    pub key: Option<String>,
}
