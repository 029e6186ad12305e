//! Token endpoint and API key endpoint client
//!
//! Handles the three HTTP exchanges of the login flow:
//! - Authorization code exchange (`grant_type=authorization_code`)
//! - Token refresh (`grant_type=refresh_token`)
//! - Access token to catalog API key exchange
//!
//! Every call is a single attempt. Retrying is the caller's decision.

use std::time::Duration;

use async_trait::async_trait;
use geoportal_domain::config::ApiKeySettings;
use geoportal_domain::{AuthError, LoginConfig, Result, TokenBundle};
use reqwest::{Client, RequestBuilder, StatusCode};
use tracing::{debug, warn};

use super::traits::TokenExchange;
use super::types::{ApiKeyRequest, ApiKeyResponse, TokenEndpointResponse};

/// Environment variable that disables system proxy detection
pub const DISABLE_PROXY_ENV: &str = "GEOPORTAL_DISABLE_PROXY";

/// HTTP client for the identity provider and catalog service
#[derive(Debug, Clone)]
pub struct TokenExchangeClient {
    client: Client,
    client_id: String,
    token_url: String,
    api_key_url: String,
    api_key: ApiKeySettings,
}

impl TokenExchangeClient {
    /// Create a client with its own connection pool
    ///
    /// Uses `http_timeout_seconds` from the configuration as the per-request
    /// timeout. Proxy detection is skipped when `GEOPORTAL_DISABLE_PROXY` is
    /// set.
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the HTTP client cannot be constructed.
    pub fn new(config: &LoginConfig) -> Result<Self> {
        let builder =
            Client::builder().timeout(Duration::from_secs(config.http_timeout_seconds.max(1)));
        let builder = if std::env::var_os(DISABLE_PROXY_ENV).is_some() {
            builder.no_proxy()
        } else {
            builder
        };
        let client = builder
            .build()
            .map_err(|e| AuthError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self::with_http_client(config, client))
    }

    /// Create a client around an existing `reqwest::Client`
    #[must_use]
    pub fn with_http_client(config: &LoginConfig, client: Client) -> Self {
        Self {
            client,
            client_id: config.client_id.clone(),
            token_url: config.token_url.clone(),
            api_key_url: config.api_key_url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// Exchange an authorization code for tokens
    ///
    /// # Arguments
    /// * `code` - Authorization code from the loopback callback
    /// * `verifier` - PKCE verifier generated for the same attempt
    /// * `redirect_uri` - Must equal the one sent in the authorization request
    ///
    /// # Errors
    /// Returns error if:
    /// - The provider answers with a non-2xx status or an `error` body
    ///   (`TokenExchangeFailed`)
    /// - The body is not valid JSON (`TokenExchangeFailed`)
    /// - `access_token`, `expires_in` or `refresh_token` is absent
    ///   (`MissingTokenField`)
    /// - The request cannot be sent (`TransportError`)
    pub async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
    ) -> Result<TokenBundle> {
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.client_id.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("redirect_uri", redirect_uri),
        ];

        let (status, body) =
            send(self.client.post(&self.token_url).form(&params), "authorization_code").await?;

        if !status.is_success() {
            return Err(AuthError::token_exchange(failure_detail(status, &body)));
        }

        let response: TokenEndpointResponse = serde_json::from_str(&body)
            .map_err(|e| AuthError::token_exchange(format!("malformed token response: {e}")))?;

        if let Some(detail) = response.error_detail() {
            return Err(AuthError::token_exchange(detail));
        }

        response.into_bundle(None)
    }

    /// Refresh tokens using a stored refresh token
    ///
    /// A response that omits `refresh_token` keeps the presented one.
    ///
    /// # Errors
    /// Returns `RefreshExpired` for every provider-side failure and
    /// `TransportError` when the request cannot be sent.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenBundle> {
        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.client_id.as_str()),
            ("refresh_token", refresh_token),
        ];

        let (status, body) =
            send(self.client.post(&self.token_url).form(&params), "refresh_token").await?;

        if !status.is_success() {
            debug!(%status, detail = %failure_detail(status, &body), "refresh rejected");
            return Err(AuthError::RefreshExpired);
        }

        let response: TokenEndpointResponse = serde_json::from_str(&body).map_err(|e| {
            debug!(error = %e, "malformed refresh response");
            AuthError::RefreshExpired
        })?;

        if let Some(detail) = response.error_detail() {
            debug!(%detail, "refresh rejected");
            return Err(AuthError::RefreshExpired);
        }

        response.into_bundle(Some(refresh_token)).map_err(|e| {
            debug!(error = %e, "incomplete refresh response");
            AuthError::RefreshExpired
        })
    }

    /// Trade an access token for a catalog API key
    ///
    /// # Errors
    /// Returns `ApiKeyExchangeFailed` for non-2xx responses, malformed bodies
    /// and missing or empty keys; `TransportError` when the request cannot be
    /// sent.
    pub async fn exchange_for_api_key(&self, access_token: &str) -> Result<String> {
        let request = ApiKeyRequest {
            scope: &self.api_key.scope,
            name: &self.api_key.name,
            site: &self.api_key.site,
        };

        let (status, body) = send(
            self.client.post(&self.api_key_url).bearer_auth(access_token).json(&request),
            "api_key",
        )
        .await?;

        if !status.is_success() {
            return Err(AuthError::api_key_exchange(failure_detail(status, &body)));
        }

        let response: ApiKeyResponse = serde_json::from_str(&body)
            .map_err(|e| AuthError::api_key_exchange(format!("malformed API key response: {e}")))?;

        response
            .key
            .filter(|key| !key.is_empty())
            .ok_or_else(|| AuthError::api_key_exchange("response did not contain a key"))
    }
}

#[async_trait]
impl TokenExchange for TokenExchangeClient {
    async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
    ) -> Result<TokenBundle> {
        self.exchange_code(code, verifier, redirect_uri).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenBundle> {
        self.refresh(refresh_token).await
    }

    async fn exchange_for_api_key(&self, access_token: &str) -> Result<String> {
        self.exchange_for_api_key(access_token).await
    }
}

/// Send a request and read the full body
async fn send(builder: RequestBuilder, operation: &'static str) -> Result<(StatusCode, String)> {
    let response = builder.send().await.map_err(|e| {
        warn!(operation, error = %e, "HTTP request failed");
        transport_error(&e)
    })?;

    let status = response.status();
    debug!(operation, url = %response.url(), %status, "received HTTP response");

    let body = response.text().await.map_err(|e| transport_error(&e))?;
    Ok((status, body))
}

fn transport_error(err: &reqwest::Error) -> AuthError {
    if err.is_timeout() {
        AuthError::transport(format!("request timed out: {err}"))
    } else {
        AuthError::transport(err.to_string())
    }
}

/// Body of an error response, or the status line when the body is empty
fn failure_detail(status: StatusCode, body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return status.to_string();
    }
    match serde_json::from_str::<TokenEndpointResponse>(trimmed) {
        Ok(response) => response.error_detail().unwrap_or_else(|| trimmed.to_string()),
        Err(_) => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::client.
    use super::*;

    #[test]
    fn test_failure_detail_prefers_provider_error() {
        let detail = failure_detail(
            StatusCode::BAD_REQUEST,
            r#"{"error":"invalid_grant","error_description":"code expired"}"#,
        );
        assert_eq!(detail, "invalid_grant: code expired");
    }

    #[test]
    fn test_failure_detail_falls_back_to_body_then_status() {
        assert_eq!(failure_detail(StatusCode::BAD_GATEWAY, "upstream down"), "upstream down");
        assert_eq!(failure_detail(StatusCode::BAD_GATEWAY, "  "), "502 Bad Gateway");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let mut config = LoginConfig::new(
            "desktop",
            "https://id.example.com/authorize",
            // Port 9 (discard) on loopback is expected to refuse connections
            "http://127.0.0.1:9/token",
            "http://127.0.0.1:9/keys",
        );
        config.http_timeout_seconds = 2;
        let client = TokenExchangeClient::with_http_client(
            &config,
            Client::builder().no_proxy().timeout(Duration::from_secs(2)).build().unwrap(),
        );

        let err = client.refresh("rt").await.unwrap_err();
        assert_eq!(err.kind(), "transport_error");
    }
}
