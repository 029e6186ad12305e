//! Login session orchestration
//!
//! [`AuthSession`] owns the session state machine:
//!
//! ```text
//! LoggedOut --login()--> LoggingIn --success--> LoggedIn --logout()--> LoggedOut
//!                            └----failure / cancel----> LoggedOut
//! ```
//!
//! Each `login()` runs on its own tokio task. The task first tries a silent
//! refresh with the stored refresh token and falls back, once, to the
//! interactive browser flow. At most one attempt is active per session; a new
//! `login()` cancels the previous attempt and waits for its listener to be
//! released before starting.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use geoportal_common::auth::{
    generate_state, select_credential_store, AuthorizationRequest, CredentialStore, PkcePair,
    TokenExchange, TokenExchangeClient,
};
use geoportal_domain::{
    AuthError, AuthEvent, AuthState, CallbackResult, Credential, LoginConfig, Result,
    StoreSecurity,
};
use parking_lot::RwLock;
use tokio::sync::{broadcast, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::callback::{CallbackOptions, CallbackServer};
use crate::platform::{BrowserLauncher, SystemBrowser};

const EVENT_CAPACITY: usize = 16;

/// Login session: state, events, and the in-memory API key
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct AuthSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: LoginConfig,
    exchange: Arc<dyn TokenExchange>,
    store: Arc<dyn CredentialStore>,
    browser: Arc<dyn BrowserLauncher>,
    state: watch::Sender<AuthState>,
    events: broadcast::Sender<AuthEvent>,
    api_key: RwLock<Option<String>>,
    next_attempt: AtomicU64,
    /// Attempt allowed to publish state; `0` when none
    current_attempt: AtomicU64,
    attempt: Mutex<Option<LoginAttempt>>,
}

struct LoginAttempt {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Completion handle for one `login()` call
#[derive(Debug)]
pub struct LoginHandle {
    result_rx: oneshot::Receiver<Result<String>>,
}

impl LoginHandle {
    /// Wait for the attempt to finish
    ///
    /// # Errors
    /// Returns the attempt's `AuthError`; a superseded or abandoned attempt
    /// resolves to `AuthorizationCancelled`.
    pub async fn wait(self) -> Result<String> {
        self.result_rx.await.unwrap_or(Err(AuthError::AuthorizationCancelled))
    }
}

impl AuthSession {
    /// Create a session over injected collaborators
    pub fn new(
        config: LoginConfig,
        exchange: Arc<dyn TokenExchange>,
        store: Arc<dyn CredentialStore>,
        browser: Arc<dyn BrowserLauncher>,
    ) -> Self {
        let (state, _) = watch::channel(AuthState::LoggedOut);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            inner: Arc::new(SessionInner {
                config,
                exchange,
                store,
                browser,
                state,
                events,
                api_key: RwLock::new(None),
                next_attempt: AtomicU64::new(1),
                current_attempt: AtomicU64::new(0),
                attempt: Mutex::new(None),
            }),
        }
    }

    /// Create a session with the default HTTP client, the configured
    /// credential store, and the system browser
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the HTTP client or credential store cannot
    /// be constructed.
    pub fn from_config(config: LoginConfig) -> Result<Self> {
        let exchange = Arc::new(TokenExchangeClient::new(&config)?);
        let store = select_credential_store(&config.storage)?;
        Ok(Self::new(config, exchange, store, Arc::new(SystemBrowser)))
    }

    /// Start a login attempt
    ///
    /// Cancels any attempt still in flight and waits for its teardown. The
    /// attempt itself runs on a background task; observe it through the
    /// returned handle, [`Self::subscribe`], or [`Self::watch_state`].
    pub async fn login(&self) -> LoginHandle {
        let mut slot = self.inner.attempt.lock().await;

        let id = self.inner.next_attempt.fetch_add(1, Ordering::SeqCst);
        self.inner.current_attempt.store(id, Ordering::SeqCst);

        if let Some(previous) = slot.take() {
            debug!(attempt = id, "Superseding previous login attempt");
            previous.cancel.cancel();
            let _ = previous.handle.await;
        }

        self.inner.state.send_replace(AuthState::LoggingIn);
        info!(attempt = id, "Login started");

        let cancel = CancellationToken::new();
        let (result_tx, result_rx) = oneshot::channel();
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(inner.run_attempt(id, cancel.clone(), result_tx));

        *slot = Some(LoginAttempt { cancel, handle });
        LoginHandle { result_rx }
    }

    /// Cancel the in-flight attempt, if any, and wait until it has finished
    ///
    /// The attempt resolves with `AuthorizationCancelled` and the session
    /// returns to `LoggedOut`. No-op when no attempt is running.
    pub async fn cancel(&self) {
        let mut slot = self.inner.attempt.lock().await;
        if let Some(attempt) = slot.take() {
            attempt.cancel.cancel();
            let _ = attempt.handle.await;
        }
    }

    /// Log out: cancel any attempt, clear stored credentials, drop the key
    ///
    /// Idempotent; storage failures are logged, never returned.
    pub async fn logout(&self) {
        {
            let mut slot = self.inner.attempt.lock().await;
            self.inner.current_attempt.store(0, Ordering::SeqCst);
            if let Some(attempt) = slot.take() {
                attempt.cancel.cancel();
                let _ = attempt.handle.await;
            }
        }

        if let Err(err) = self.inner.on_store(|store| store.clear()).await {
            warn!(error = %err, kind = err.kind(), "Failed to clear stored credential");
        }
        *self.inner.api_key.write() = None;

        let changed = self.inner.state.send_if_modified(|state| {
            if *state == AuthState::LoggedOut {
                false
            } else {
                *state = AuthState::LoggedOut;
                true
            }
        });
        if changed {
            info!("Logged out");
            let _ = self.inner.events.send(AuthEvent::LoggedOut);
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> AuthState {
        *self.inner.state.borrow()
    }

    /// Receiver that observes every state change
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    /// Receiver for session events emitted from now on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.inner.events.subscribe()
    }

    /// API key of the logged-in session
    #[must_use]
    pub fn api_key(&self) -> Option<String> {
        self.inner.api_key.read().clone()
    }

    /// Whether the credential store keeps secrets in the OS secret manager
    #[must_use]
    pub fn credential_security(&self) -> StoreSecurity {
        self.inner.store.security()
    }

    /// Configuration the session was built with
    #[must_use]
    pub fn config(&self) -> &LoginConfig {
        &self.inner.config
    }
}

impl SessionInner {
    fn is_current(&self, id: u64) -> bool {
        self.current_attempt.load(Ordering::SeqCst) == id
    }

    /// Run a credential store call on the blocking pool
    ///
    /// Keychain and settings-file access may block (OS prompts, D-Bus, disk).
    async fn on_store<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn CredentialStore) -> Result<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || op(store.as_ref()))
            .await
            .map_err(|e| AuthError::internal(format!("credential store task failed: {e}")))?
    }

    fn publish(&self, id: u64, event: AuthEvent) {
        if self.is_current(id) {
            let _ = self.events.send(event);
        }
    }

    async fn run_attempt(
        self: Arc<Self>,
        id: u64,
        cancel: CancellationToken,
        result_tx: oneshot::Sender<Result<String>>,
    ) {
        let outcome = match self.authenticate(id, &cancel).await {
            // A result that arrives after cancellation is discarded
            Ok(_) if cancel.is_cancelled() || !self.is_current(id) => {
                Err(AuthError::AuthorizationCancelled)
            }
            Ok(credential) => {
                let api_key = credential.api_key.clone();
                self.on_store(move |store| store.save(&credential)).await.map(|()| api_key)
            }
            Err(err) => Err(err),
        };

        if self.is_current(id) {
            match &outcome {
                Ok(api_key) => {
                    *self.api_key.write() = Some(api_key.clone());
                    self.state.send_replace(AuthState::LoggedIn);
                    info!(attempt = id, "Login succeeded");
                    let _ = self.events.send(AuthEvent::LoggedIn { api_key: api_key.clone() });
                }
                Err(err) if err.is_cancellation() => {
                    *self.api_key.write() = None;
                    self.state.send_replace(AuthState::LoggedOut);
                    info!(attempt = id, "Login cancelled");
                    let _ = self.events.send(AuthEvent::LoginCancelled);
                }
                Err(err) => {
                    *self.api_key.write() = None;
                    self.state.send_replace(AuthState::LoggedOut);
                    warn!(attempt = id, kind = err.kind(), error = %err, "Login failed");
                    let _ = self.events.send(AuthEvent::LoginFailed { error: err.clone() });
                }
            }
        } else {
            debug!(attempt = id, "Superseded attempt finished");
        }

        let _ = result_tx.send(outcome);
    }

    async fn authenticate(&self, id: u64, cancel: &CancellationToken) -> Result<Credential> {
        if let Some(credential) = self.try_refresh(cancel).await? {
            return Ok(credential);
        }
        self.authorize_interactively(id, cancel).await
    }

    /// Silent path; `Ok(None)` means fall through to the browser
    async fn try_refresh(&self, cancel: &CancellationToken) -> Result<Option<Credential>> {
        let stored = match self.on_store(|store| store.load()).await {
            Ok(stored) => stored,
            Err(err) => {
                warn!(error = %err, "Could not read stored credential, using browser login");
                None
            }
        };
        let Some(refresh_token) = stored.and_then(|credential| credential.refresh_token) else {
            debug!("No stored refresh token");
            return Ok(None);
        };

        let refreshed = cancellable(cancel, async {
            let bundle = self.exchange.refresh(&refresh_token).await?;
            let api_key = self.exchange.exchange_for_api_key(&bundle.access_token).await?;
            Ok(Credential::new(api_key, Some(bundle.refresh_token)))
        })
        .await;

        match refreshed {
            Ok(credential) => {
                info!("Signed in with stored refresh token");
                Ok(Some(credential))
            }
            Err(err) if err.is_cancellation() => Err(err),
            Err(err) => {
                info!(kind = err.kind(), "Silent refresh failed, falling back to browser login");
                Ok(None)
            }
        }
    }

    async fn authorize_interactively(
        &self,
        id: u64,
        cancel: &CancellationToken,
    ) -> Result<Credential> {
        if cancel.is_cancelled() {
            return Err(AuthError::AuthorizationCancelled);
        }

        let pkce = PkcePair::generate();
        let state = generate_state();

        let server = CallbackServer::bind(CallbackOptions::from(&self.config.redirect)).await?;
        let redirect_uri = server.redirect_uri();
        let authorization_url = AuthorizationRequest::new(
            &self.config.client_id,
            &self.config.scope,
            &state,
            &pkce,
            &redirect_uri,
        )
        .build_url(&self.config.authorization_url)?
        .to_string();

        if cancel.is_cancelled() {
            return Err(AuthError::AuthorizationCancelled);
        }

        self.publish(
            id,
            AuthEvent::AuthorizationStarted { authorization_url: authorization_url.clone() },
        );
        if let Err(err) = self.browser.open(&authorization_url) {
            warn!(error = %err, "Could not open the system browser");
        }

        match server.run(&state, cancel.clone()).await? {
            CallbackResult::Success { code } => {
                let bundle = cancellable(
                    cancel,
                    self.exchange.exchange_code(&code, pkce.verifier(), &redirect_uri),
                )
                .await?;
                let api_key =
                    cancellable(cancel, self.exchange.exchange_for_api_key(&bundle.access_token))
                        .await?;
                Ok(Credential::new(api_key, Some(bundle.refresh_token)))
            }
            CallbackResult::Cancelled => Err(AuthError::AuthorizationCancelled),
            CallbackResult::Error { message } => {
                Err(AuthError::AuthorizationFailed { detail: message })
            }
        }
    }
}

/// Race `future` against cancellation; cancellation drops the future
async fn cancellable<T>(
    cancel: &CancellationToken,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(AuthError::AuthorizationCancelled),
        result = future => result,
    }
}
