//! Authorization URL builder
//!
//! Produces the URL the system browser is sent to for the Authorization Code
//! grant. Pure: no I/O and no hidden state.

use geoportal_domain::constants::{RESPONSE_MODE, RESPONSE_TYPE};
use geoportal_domain::{AuthError, Result};
use url::Url;

use super::pkce::PkcePair;

/// Parameters of one authorization request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub client_id: String,
    pub scope: String,
    pub state: String,
    pub code_challenge: String,
    pub code_challenge_method: &'static str,
    pub redirect_uri: String,
}

impl AuthorizationRequest {
    /// Capture the request parameters for a login attempt
    ///
    /// Only the challenge half of `pkce` is kept; the verifier stays with the
    /// caller until the code exchange.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        scope: impl Into<String>,
        state: impl Into<String>,
        pkce: &PkcePair,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            scope: scope.into(),
            state: state.into(),
            code_challenge: pkce.challenge().to_string(),
            code_challenge_method: pkce.challenge_method(),
            redirect_uri: redirect_uri.into(),
        }
    }

    /// Query parameters in the order the provider documents them
    fn params(&self) -> [(&'static str, &str); 8] {
        [
            ("scope", self.scope.as_str()),
            ("response_type", RESPONSE_TYPE),
            ("response_mode", RESPONSE_MODE),
            ("client_id", self.client_id.as_str()),
            ("code_challenge", self.code_challenge.as_str()),
            ("state", self.state.as_str()),
            ("code_challenge_method", self.code_challenge_method),
            ("redirect_uri", self.redirect_uri.as_str()),
        ]
    }

    /// Build the absolute authorization URL
    ///
    /// # Arguments
    /// * `authorization_url` - Provider authorization endpoint. An existing
    ///   query string is preserved and extended.
    ///
    /// # Errors
    /// Returns `AuthError::InvalidConfig` if the endpoint is not an absolute
    /// URL.
    pub fn build_url(&self, authorization_url: &str) -> Result<Url> {
        let base = Url::parse(authorization_url).map_err(|e| {
            AuthError::config(format!("invalid authorization_url `{authorization_url}`: {e}"))
        })?;
        if base.cannot_be_a_base() {
            return Err(AuthError::config(format!(
                "authorization_url `{authorization_url}` is not a hierarchical URL"
            )));
        }

        let query_string = self
            .params()
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let mut url = base;
        let query = match url.query() {
            Some(existing) if !existing.is_empty() => format!("{existing}&{query_string}"),
            _ => query_string,
        };
        url.set_query(Some(&query));
        Ok(url)
    }
}
