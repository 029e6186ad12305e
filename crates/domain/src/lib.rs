//! # Geoportal Domain
//!
//! Domain types for the Geoportal catalog login.
//!
//! This crate contains:
//! - Login data types (`Credential`, `TokenBundle`, `CallbackResult`, ...)
//! - The `AuthError` taxonomy and `Result` alias
//! - Configuration structures
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other Geoportal crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
