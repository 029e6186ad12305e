//! Loopback HTTP listener that receives the OAuth redirect.
//!
//! The listener is bound to `127.0.0.1` on the port registered with the
//! identity provider. It consumes exactly one request on the callback path,
//! answers the browser, shuts down gracefully, and releases the port before
//! [`CallbackServer::run`] returns.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use geoportal_common::auth::validate_state;
use geoportal_domain::config::RedirectConfig;
use geoportal_domain::constants::LOOPBACK_HOST;
use geoportal_domain::{AuthError, CallbackResult, Result};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Time allowed for in-flight responses after the callback is consumed
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Signed In</title></head>
<body><h1>Signed in to Geoportal</h1><p>You can close this window and return to the application.</p></body>
</html>"#;

const CANCELLED_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Sign-in Cancelled</title></head>
<body><h1>Sign-in cancelled</h1><p>No changes were made. You can close this window.</p></body>
</html>"#;

const FAILED_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Sign-in Failed</title></head>
<body><h1>Sign-in failed</h1><p>Invalid or unexpected callback parameters. Please try again from the application.</p></body>
</html>"#;

const CONSUMED_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Sign-in Complete</title></head>
<body><h1>This sign-in link was already used</h1><p>You can close this window.</p></body>
</html>"#;

/// Listener settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackOptions {
    /// Fixed port; `0` picks an ephemeral port (tests only, providers
    /// require an exact redirect URI)
    pub port: u16,
    pub path: String,
    /// Page the browser is redirected to (302) after a successful callback
    pub success_redirect: Option<String>,
}

impl From<&RedirectConfig> for CallbackOptions {
    fn from(config: &RedirectConfig) -> Self {
        Self {
            port: config.port,
            path: config.path.clone(),
            success_redirect: config.success_url.clone(),
        }
    }
}

/// Bound, not yet listening, loopback server
#[derive(Debug)]
pub struct CallbackServer {
    listener: TcpListener,
    port: u16,
    options: CallbackOptions,
}

impl CallbackServer {
    /// Bind `127.0.0.1:{port}`
    ///
    /// # Errors
    /// Returns `AuthError::PortInUse` if another process holds the port and
    /// `AuthError::Internal` for any other bind failure.
    pub async fn bind(options: CallbackOptions) -> Result<Self> {
        let listener = TcpListener::bind((LOOPBACK_HOST, options.port)).await.map_err(|err| {
            if err.kind() == ErrorKind::AddrInUse {
                warn!(port = options.port, "Loopback port already in use");
                AuthError::PortInUse { port: options.port }
            } else {
                AuthError::internal(format!("failed to bind loopback listener: {err}"))
            }
        })?;

        let port = listener
            .local_addr()
            .map_err(|err| AuthError::internal(format!("failed to determine port: {err}")))?
            .port();

        info!(port, path = %options.path, "Loopback listener bound");
        Ok(Self { listener, port, options })
    }

    /// Port actually bound
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Redirect URI for the authorization request, e.g. `http://127.0.0.1:8989/`
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        format!("http://{}:{}{}", LOOPBACK_HOST, self.port, self.options.path)
    }

    /// Serve until the first callback request is handled or `cancel` fires
    ///
    /// # Errors
    /// Returns `AuthError::Internal` if the server task panicked.
    pub async fn run(self, expected_state: &str, cancel: CancellationToken) -> Result<CallbackResult> {
        let Self { listener, port, options } = self;

        let (result_tx, result_rx) = oneshot::channel();
        let state = Arc::new(CallbackState {
            result_tx: Mutex::new(Some(result_tx)),
            expected_state: expected_state.to_string(),
            success_redirect: options.success_redirect,
        });

        let app = Router::new()
            .route(&options.path, get(handle_callback))
            .fallback(handle_not_found)
            .with_state(state);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let mut handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
            {
                error!("Loopback server error: {}", err);
            }
        });

        debug!(port, "Waiting for authorization callback");
        let result = tokio::select! {
            received = result_rx => received.unwrap_or(CallbackResult::Cancelled),
            () = cancel.cancelled() => {
                info!(port, "Loopback listener cancelled");
                CallbackResult::Cancelled
            }
        };

        let _ = shutdown_tx.send(());
        match tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) if err.is_panic() => {
                return Err(AuthError::internal(format!("loopback server panicked: {err}")));
            }
            Ok(Err(_)) => {}
            Err(_) => {
                warn!(port, "Loopback server did not drain in time, aborting");
                handle.abort();
                let _ = handle.await;
            }
        }

        debug!(port, "Loopback listener released");
        Ok(result)
    }
}

struct CallbackState {
    result_tx: Mutex<Option<oneshot::Sender<CallbackResult>>>,
    expected_state: String,
    success_redirect: Option<String>,
}

async fn handle_callback(
    State(state): State<Arc<CallbackState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(result_tx) = state.result_tx.lock().take() else {
        debug!("Ignoring repeated callback request");
        return (StatusCode::GONE, Html(CONSUMED_PAGE)).into_response();
    };

    let code = params.get("code").filter(|code| !code.is_empty());
    let result = match code {
        Some(code) => match params.get("state") {
            Some(received) if validate_state(&state.expected_state, received) => {
                CallbackResult::Success { code: code.clone() }
            }
            Some(_) => CallbackResult::Error { message: "state parameter mismatch".to_string() },
            None => CallbackResult::Error { message: "state parameter missing".to_string() },
        },
        None => {
            let reason = params.get("error").map_or("no authorization code", String::as_str);
            info!(
                reason,
                description = params.get("error_description").map(String::as_str),
                "Authorization declined"
            );
            CallbackResult::Cancelled
        }
    };

    let response = match &result {
        CallbackResult::Success { .. } => match &state.success_redirect {
            Some(url) => (StatusCode::FOUND, [(header::LOCATION, url.clone())]).into_response(),
            None => Html(SUCCESS_PAGE).into_response(),
        },
        CallbackResult::Cancelled => Html(CANCELLED_PAGE).into_response(),
        CallbackResult::Error { message } => {
            warn!(%message, "Rejected authorization callback");
            (StatusCode::BAD_REQUEST, Html(FAILED_PAGE)).into_response()
        }
    };

    let _ = result_tx.send(result);
    response
}

async fn handle_not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
