//! Domain types and models

pub mod auth;

pub use auth::{AuthEvent, AuthState, CallbackResult, Credential, StoreSecurity, TokenBundle};
