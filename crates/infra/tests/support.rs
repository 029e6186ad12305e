//! Shared helpers for infra integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::net::TcpListener;
use std::sync::Mutex;
use std::time::Duration;

use geoportal_domain::{AuthEvent, LoginConfig};
use geoportal_infra::BrowserLauncher;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use url::Url;

/// What the simulated user does in the browser
#[derive(Debug, Clone)]
pub enum Consent {
    /// Approve; the provider redirects back with this code
    Approve(&'static str),
    /// Decline; the provider redirects back with `error=access_denied`
    Deny,
    /// Never come back
    Ignore,
}

/// Browser stand-in that plays the provider redirect against the loopback
/// listener
pub struct FakeBrowser {
    consent: Consent,
    runtime: Handle,
    http: reqwest::Client,
    opened: Mutex<Vec<String>>,
}

impl FakeBrowser {
    /// Must be called from within a tokio runtime
    pub fn new(consent: Consent) -> Self {
        Self {
            consent,
            runtime: Handle::current(),
            http: http_client(),
            opened: Mutex::new(Vec::new()),
        }
    }

    /// URLs passed to `open`, in order
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

impl BrowserLauncher for FakeBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        self.opened.lock().unwrap().push(url.to_string());

        let parsed = Url::parse(url).map_err(io::Error::other)?;
        let params: HashMap<String, String> = parsed.query_pairs().into_owned().collect();
        let redirect_uri = params.get("redirect_uri").cloned().unwrap_or_default();
        let state = params.get("state").cloned().unwrap_or_default();

        let callback = match &self.consent {
            Consent::Approve(code) => format!("{redirect_uri}?code={code}&state={state}"),
            Consent::Deny => format!("{redirect_uri}?error=access_denied&state={state}"),
            Consent::Ignore => return Ok(()),
        };

        let http = self.http.clone();
        self.runtime.spawn(async move {
            let _ = http.get(callback).send().await;
        });
        Ok(())
    }
}

/// HTTP client that ignores proxy settings and does not follow redirects
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

/// A loopback port that was free a moment ago
pub fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port()
}

/// Login configuration pointing at `base` with an ephemeral redirect port
pub fn login_config(base: &str) -> LoginConfig {
    let mut config = LoginConfig::new(
        "geoportal-desktop",
        format!("{base}/authorize"),
        format!("{base}/token"),
        format!("{base}/api/keys"),
    );
    config.redirect.port = 0;
    config
}

/// Next session event, failing the test after five seconds
pub async fn next_event(events: &mut broadcast::Receiver<AuthEvent>) -> AuthEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for session event")
        .expect("event channel closed")
}
