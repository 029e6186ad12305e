//! # Geoportal Infrastructure
//!
//! Infrastructure side of the catalog login.
//!
//! This crate contains:
//! - The loopback redirect listener (axum)
//! - The login session state machine
//! - Configuration loading (environment, TOML, JSON)
//! - Platform integration (system browser)
//! - The catalog `Authorization` header contract
//! - Tracing subscriber setup
//!
//! ## Architecture
//! - Builds on the PKCE, token, and credential primitives of
//!   `geoportal-common`
//! - Depends on `geoportal-domain` for errors, types, and configuration
//! - Contains all "impure" code (sockets, browser, tasks)

pub mod api;
pub mod config;
pub mod login;
pub mod observability;
pub mod platform;

// Re-export commonly used items
pub use api::{ApiKeyProvider, WithApiKey};
pub use login::{AuthSession, CallbackOptions, CallbackServer, LoginHandle};
pub use platform::{BrowserLauncher, SystemBrowser};
