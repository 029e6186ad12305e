//! Browser-based sign-in
//!
//! - **[`callback`]**: one-shot loopback listener receiving the authorization
//!   redirect
//! - **[`session`]**: login state machine tying the PKCE flow, token
//!   exchange, and credential persistence together

pub mod callback;
pub mod session;

pub use callback::{CallbackOptions, CallbackServer};
pub use session::{AuthSession, LoginHandle};
