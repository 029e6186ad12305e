//! Platform integrations
//!
//! - **[`browser`]**: launching the system browser for the authorization step

pub mod browser;

pub use browser::{BrowserLauncher, SystemBrowser};
