//! End-to-end login flow tests
//!
//! Drives `AuthSession` through the loopback listener with a simulated
//! browser. Identity provider and catalog endpoints are either wiremock
//! servers behind the real `TokenExchangeClient` or `MockTokenExchange`.

mod support;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use geoportal_common::auth::{generate_code_challenge, TokenExchangeClient};
use geoportal_common::testing::{MockCredentialStore, MockTokenExchange};
use geoportal_domain::{AuthError, AuthEvent, AuthState, Credential};
use geoportal_infra::AuthSession;
use serde_json::json;
use support::{free_port, http_client, login_config, next_event, Consent, FakeBrowser};
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_api_key(server: &MockServer, access_token: &str, key: &str) {
    Mock::given(method("POST"))
        .and(path("/api/keys"))
        .and(header("authorization", format!("Bearer {access_token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "key": key })))
        .expect(1)
        .mount(server)
        .await;
}

/// Validates the first-time login through the browser.
///
/// # Test Steps
/// 1. Start with an empty credential store
/// 2. Approve consent in the simulated browser
/// 3. Verify the code exchange, the API key exchange, the persisted
///    credential, and the emitted events
#[tokio::test(flavor = "multi_thread")]
async fn test_first_login_through_browser() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code-1"))
        .and(body_string_contains("code_verifier="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_api_key(&server, "access-1", "catalog-key-1").await;

    let config = login_config(&server.uri());
    let exchange = TokenExchangeClient::with_http_client(&config, http_client());
    let store = MockCredentialStore::new();
    let browser = Arc::new(FakeBrowser::new(Consent::Approve("auth-code-1")));
    let session =
        AuthSession::new(config, Arc::new(exchange), Arc::new(store.clone()), browser.clone());
    let mut events = session.subscribe();

    let api_key = session.login().await.wait().await.unwrap();

    assert_eq!(api_key, "catalog-key-1");
    assert_eq!(session.state(), AuthState::LoggedIn);
    assert_eq!(session.api_key().as_deref(), Some("catalog-key-1"));
    assert_eq!(store.current(), Some(Credential::new("catalog-key-1", Some("refresh-1".into()))));
    assert_eq!(store.save_count(), 1);
    assert_eq!(browser.opened().len(), 1);

    match next_event(&mut events).await {
        AuthEvent::AuthorizationStarted { authorization_url } => {
            assert_eq!(authorization_url, browser.opened()[0]);
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(
        next_event(&mut events).await,
        AuthEvent::LoggedIn { api_key: "catalog-key-1".into() }
    );
}

/// Validates that the verifier sent to the token endpoint matches the
/// challenge and redirect URI in the authorization URL.
#[tokio::test(flavor = "multi_thread")]
async fn test_code_exchange_uses_matching_pkce_pair() {
    let exchange = MockTokenExchange::new("access", "refresh", "catalog-key");
    let browser = Arc::new(FakeBrowser::new(Consent::Approve("auth-code-2")));
    let session = AuthSession::new(
        login_config("https://id.example.com"),
        Arc::new(exchange.clone()),
        Arc::new(MockCredentialStore::new()),
        browser.clone(),
    );

    session.login().await.wait().await.unwrap();

    let url = Url::parse(&browser.opened()[0]).unwrap();
    let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
    let (code, verifier, redirect_uri) = exchange.last_code_exchange().unwrap();

    assert_eq!(code, "auth-code-2");
    assert_eq!(params["code_challenge"], generate_code_challenge(&verifier));
    assert_eq!(params["code_challenge_method"], "S256");
    assert_eq!(params["redirect_uri"], redirect_uri);
    assert!(redirect_uri.starts_with("http://127.0.0.1:"));
}

/// Validates returning-user login with a stored refresh token.
///
/// # Test Steps
/// 1. Seed the store with a credential carrying a refresh token
/// 2. Serve a refresh grant and an API key from wiremock
/// 3. Verify login completes without opening a browser and the rotated
///    refresh token is persisted
#[tokio::test(flavor = "multi_thread")]
async fn test_returning_user_signs_in_silently() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-old"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-2",
            "refresh_token": "refresh-new",
            "expires_in": "3600"
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_api_key(&server, "access-2", "catalog-key-2").await;

    let config = login_config(&server.uri());
    let exchange = TokenExchangeClient::with_http_client(&config, http_client());
    let store = MockCredentialStore::with_credential(Credential::new(
        "catalog-key-old",
        Some("refresh-old".into()),
    ));
    let browser = Arc::new(FakeBrowser::new(Consent::Ignore));
    let session =
        AuthSession::new(config, Arc::new(exchange), Arc::new(store.clone()), browser.clone());

    let api_key = session.login().await.wait().await.unwrap();

    assert_eq!(api_key, "catalog-key-2");
    assert_eq!(session.state(), AuthState::LoggedIn);
    assert!(browser.opened().is_empty(), "silent login must not open a browser");
    assert_eq!(
        store.current(),
        Some(Credential::new("catalog-key-2", Some("refresh-new".into())))
    );
}

/// Validates the fallback from a rejected refresh token to the browser.
#[tokio::test(flavor = "multi_thread")]
async fn test_expired_refresh_falls_back_to_browser() {
    let exchange = MockTokenExchange::new("access", "refresh-fresh", "catalog-key");
    exchange.set_refresh_result(Err(AuthError::RefreshExpired));
    let store =
        MockCredentialStore::with_credential(Credential::new("stale", Some("refresh-dead".into())));
    let browser = Arc::new(FakeBrowser::new(Consent::Approve("auth-code-3")));
    let session = AuthSession::new(
        login_config("https://id.example.com"),
        Arc::new(exchange.clone()),
        Arc::new(store.clone()),
        browser.clone(),
    );

    let api_key = session.login().await.wait().await.unwrap();

    assert_eq!(api_key, "catalog-key");
    assert_eq!(exchange.refresh_calls(), 1);
    assert_eq!(exchange.code_calls(), 1);
    assert_eq!(browser.opened().len(), 1);
    assert_eq!(
        store.current(),
        Some(Credential::new("catalog-key", Some("refresh-fresh".into())))
    );
}

/// Validates that an API key failure after a successful code exchange
/// persists nothing.
///
/// # Test Steps
/// 1. Approve consent; the code exchange succeeds
/// 2. Fail the API key exchange
/// 3. Verify the error reaches the handle, the store is untouched, and the
///    session is logged out
#[tokio::test(flavor = "multi_thread")]
async fn test_api_key_failure_after_code_exchange_saves_nothing() {
    let exchange = MockTokenExchange::new("access", "refresh", "catalog-key");
    exchange.set_api_key_result(Err(AuthError::ApiKeyExchangeFailed {
        detail: "quota exceeded".into(),
    }));
    let store = MockCredentialStore::new();
    let session = AuthSession::new(
        login_config("https://id.example.com"),
        Arc::new(exchange.clone()),
        Arc::new(store.clone()),
        Arc::new(FakeBrowser::new(Consent::Approve("auth-code-4"))),
    );

    let err = session.login().await.wait().await.unwrap_err();

    assert_eq!(err, AuthError::ApiKeyExchangeFailed { detail: "quota exceeded".into() });
    assert_eq!(exchange.code_calls(), 1);
    assert_eq!(store.save_count(), 0);
    assert_eq!(store.current(), None);
    assert_eq!(session.state(), AuthState::LoggedOut);
    assert_eq!(session.api_key(), None);
}

/// Validates that an API key failure on the silent path falls back to the
/// browser instead of surfacing.
///
/// # Test Steps
/// 1. Seed a refresh token; the refresh grant succeeds
/// 2. Reject the first API key request, accept the second
/// 3. Verify the browser was opened once and the interactive credential is
///    the one persisted
#[tokio::test(flavor = "multi_thread")]
async fn test_api_key_failure_after_refresh_falls_back_to_browser() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-refreshed",
            "refresh_token": "refresh-rotated",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-interactive",
            "refresh_token": "refresh-interactive",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/keys"))
        .and(header("authorization", "Bearer access-refreshed"))
        .respond_with(ResponseTemplate::new(503).set_body_string("catalog unavailable"))
        .expect(1)
        .mount(&server)
        .await;
    mount_api_key(&server, "access-interactive", "catalog-key-5").await;

    let config = login_config(&server.uri());
    let exchange = TokenExchangeClient::with_http_client(&config, http_client());
    let store = MockCredentialStore::with_credential(Credential::new(
        "catalog-key-old",
        Some("refresh-old".into()),
    ));
    let browser = Arc::new(FakeBrowser::new(Consent::Approve("auth-code-5")));
    let session =
        AuthSession::new(config, Arc::new(exchange), Arc::new(store.clone()), browser.clone());

    let api_key = session.login().await.wait().await.unwrap();

    assert_eq!(api_key, "catalog-key-5");
    assert_eq!(browser.opened().len(), 1);
    assert_eq!(store.save_count(), 1);
    assert_eq!(
        store.current(),
        Some(Credential::new("catalog-key-5", Some("refresh-interactive".into())))
    );
}

/// Validates that declining consent cancels the attempt without touching the
/// store.
#[tokio::test(flavor = "multi_thread")]
async fn test_declined_consent_cancels_login() {
    let exchange = MockTokenExchange::new("access", "refresh", "catalog-key");
    let store = MockCredentialStore::new();
    let session = AuthSession::new(
        login_config("https://id.example.com"),
        Arc::new(exchange.clone()),
        Arc::new(store.clone()),
        Arc::new(FakeBrowser::new(Consent::Deny)),
    );
    let mut events = session.subscribe();

    let err = session.login().await.wait().await.unwrap_err();

    assert_eq!(err, AuthError::AuthorizationCancelled);
    assert_eq!(session.state(), AuthState::LoggedOut);
    assert_eq!(session.api_key(), None);
    assert_eq!(exchange.code_calls(), 0);
    assert_eq!(store.save_count(), 0);
    assert!(matches!(next_event(&mut events).await, AuthEvent::AuthorizationStarted { .. }));
    assert_eq!(next_event(&mut events).await, AuthEvent::LoginCancelled);
}

/// Validates that a failed code exchange surfaces the provider error and
/// leaves the session logged out.
#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_code_fails_login() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "code already used"
        })))
        .mount(&server)
        .await;

    let config = login_config(&server.uri());
    let exchange = TokenExchangeClient::with_http_client(&config, http_client());
    let store = MockCredentialStore::new();
    let session = AuthSession::new(
        config,
        Arc::new(exchange),
        Arc::new(store.clone()),
        Arc::new(FakeBrowser::new(Consent::Approve("reused"))),
    );
    let mut events = session.subscribe();

    let err = session.login().await.wait().await.unwrap_err();

    assert_eq!(err.kind(), "token_exchange_failed");
    assert_eq!(session.state(), AuthState::LoggedOut);
    assert_eq!(store.save_count(), 0);
    assert!(matches!(next_event(&mut events).await, AuthEvent::AuthorizationStarted { .. }));
    assert_eq!(next_event(&mut events).await, AuthEvent::LoginFailed { error: err });
}

/// Validates that cancelling a pending login frees the redirect port.
#[tokio::test(flavor = "multi_thread")]
async fn test_cancel_releases_redirect_port() {
    let port = free_port();
    let mut config = login_config("https://id.example.com");
    config.redirect.port = port;
    let session = AuthSession::new(
        config,
        Arc::new(MockTokenExchange::new("access", "refresh", "key")),
        Arc::new(MockCredentialStore::new()),
        Arc::new(FakeBrowser::new(Consent::Ignore)),
    );
    let mut events = session.subscribe();

    let handle = session.login().await;
    assert!(matches!(next_event(&mut events).await, AuthEvent::AuthorizationStarted { .. }));
    assert_eq!(session.state(), AuthState::LoggingIn);

    tokio::time::timeout(Duration::from_secs(5), session.cancel()).await.unwrap();

    assert_eq!(handle.wait().await.unwrap_err(), AuthError::AuthorizationCancelled);
    assert_eq!(session.state(), AuthState::LoggedOut);
    assert!(
        std::net::TcpListener::bind(("127.0.0.1", port)).is_ok(),
        "redirect port should be released after cancel"
    );
}

/// Validates that a second login supersedes the first.
///
/// # Test Steps
/// 1. Start a login that waits on the browser
/// 2. Start a second login on the same fixed port
/// 3. Verify the first resolves as cancelled without publishing, and the
///    second rebinds the port
#[tokio::test(flavor = "multi_thread")]
async fn test_new_login_supersedes_pending_attempt() {
    let mut config = login_config("https://id.example.com");
    config.redirect.port = free_port();
    let session = AuthSession::new(
        config,
        Arc::new(MockTokenExchange::new("access", "refresh", "key")),
        Arc::new(MockCredentialStore::new()),
        Arc::new(FakeBrowser::new(Consent::Ignore)),
    );
    let mut events = session.subscribe();

    let first = session.login().await;
    assert!(matches!(next_event(&mut events).await, AuthEvent::AuthorizationStarted { .. }));

    let second = session.login().await;
    assert_eq!(first.wait().await.unwrap_err(), AuthError::AuthorizationCancelled);
    assert_eq!(session.state(), AuthState::LoggingIn);
    assert!(
        matches!(next_event(&mut events).await, AuthEvent::AuthorizationStarted { .. }),
        "superseded attempt must not publish LoginCancelled"
    );

    session.cancel().await;
    assert_eq!(second.wait().await.unwrap_err(), AuthError::AuthorizationCancelled);
    assert_eq!(next_event(&mut events).await, AuthEvent::LoginCancelled);
}

/// Validates the error when the redirect port is held by another process.
#[tokio::test(flavor = "multi_thread")]
async fn test_port_in_use_fails_login() {
    let blocker = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = blocker.local_addr().unwrap().port();
    let mut config = login_config("https://id.example.com");
    config.redirect.port = port;
    let browser = Arc::new(FakeBrowser::new(Consent::Ignore));
    let session = AuthSession::new(
        config,
        Arc::new(MockTokenExchange::new("access", "refresh", "key")),
        Arc::new(MockCredentialStore::new()),
        browser.clone(),
    );

    let err = session.login().await.wait().await.unwrap_err();

    assert_eq!(err, AuthError::PortInUse { port });
    assert_eq!(session.state(), AuthState::LoggedOut);
    assert!(browser.opened().is_empty());
}

/// Validates logout after a successful login.
#[tokio::test(flavor = "multi_thread")]
async fn test_logout_clears_credentials() {
    let store =
        MockCredentialStore::with_credential(Credential::new("old", Some("refresh-old".into())));
    let session = AuthSession::new(
        login_config("https://id.example.com"),
        Arc::new(MockTokenExchange::new("access", "refresh-new", "catalog-key")),
        Arc::new(store.clone()),
        Arc::new(FakeBrowser::new(Consent::Ignore)),
    );
    session.login().await.wait().await.unwrap();
    let mut state = session.watch_state();

    session.logout().await;

    assert_eq!(*state.borrow_and_update(), AuthState::LoggedOut);
    assert_eq!(session.api_key(), None);
    assert_eq!(store.current(), None);
    assert_eq!(store.clear_count(), 1);

    session.logout().await;
    assert_eq!(session.state(), AuthState::LoggedOut);
    assert!(!state.has_changed().unwrap(), "second logout must not change state");
}
