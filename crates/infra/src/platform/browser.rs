//! System browser launcher

use std::io;

use tracing::debug;

/// Opens the authorization URL for the user
///
/// Implementations must not block for the duration of the browser session;
/// launching is fire-and-forget.
pub trait BrowserLauncher: Send + Sync {
    /// # Errors
    /// Returns the launcher's I/O error if no browser could be started.
    fn open(&self, url: &str) -> io::Result<()>;
}

/// Launches the platform default browser via the `open` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        debug!("Launching system browser");
        open::that_detached(url)
    }
}
