//! Catalog API contract
//!
//! The catalog client lives outside this crate. It authenticates every
//! request with the session's API key through [`ApiKeyProvider`]; the
//! [`WithApiKey`] extension attaches the header to a `reqwest` request.

pub mod auth;

pub use auth::{authorization_value, ApiKeyProvider, WithApiKey};
