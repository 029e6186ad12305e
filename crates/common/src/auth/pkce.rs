//! PKCE (Proof Key for Code Exchange) implementation for OAuth 2.0
//!
//! Implements RFC 7636 for secure OAuth authorization without client secrets.
//! Used for desktop applications where client secrets cannot be safely stored.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use geoportal_domain::constants::CODE_CHALLENGE_METHOD;

const VERIFIER_BYTES: usize = 32;
const STATE_BYTES: usize = 32;

/// Generate a cryptographically secure code verifier
///
/// Returns a URL-safe base64-encoded random string of 32 bytes (43 characters).
/// Per RFC 7636, verifiers must be 43-128 characters long.
///
/// # Panics
/// Panics if the operating system entropy source is unavailable.
#[must_use]
pub fn generate_code_verifier() -> String {
    let mut bytes = [0u8; VERIFIER_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate code challenge from verifier using SHA256
///
/// Per RFC 7636, the challenge is BASE64URL(SHA256(ASCII(code_verifier)))
#[must_use]
pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Generate a random state token for CSRF protection
///
/// Returns a URL-safe base64-encoded random string of 32 bytes (43 characters).
#[must_use]
pub fn generate_state() -> String {
    let mut bytes = [0u8; STATE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Validate that the state token matches
///
/// Compares in constant time with respect to the content of equal-length
/// inputs.
#[must_use]
pub fn validate_state(expected: &str, actual: &str) -> bool {
    let expected = expected.as_bytes();
    let actual = actual.as_bytes();
    if expected.len() != actual.len() {
        return false;
    }
    expected.iter().zip(actual).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

/// PKCE verifier/challenge pair for one login attempt
///
/// Never persisted. Dropped once the code exchange completes or the attempt
/// is abandoned.
#[derive(Clone, PartialEq, Eq)]
pub struct PkcePair {
    verifier: String,
    challenge: String,
}

impl PkcePair {
    /// Generate a new pair from the OS random source
    ///
    /// # Examples
    /// ```
    /// use geoportal_common::auth::pkce::PkcePair;
    ///
    /// let pair = PkcePair::generate();
    /// assert!(pair.verifier().len() >= 43);
    /// assert!(pair.verifier().len() <= 128);
    /// ```
    #[must_use]
    pub fn generate() -> Self {
        Self::from_verifier(generate_code_verifier())
    }

    /// Build a pair from a known verifier (deterministic, for tests and
    /// fixtures)
    #[must_use]
    pub fn from_verifier(verifier: impl Into<String>) -> Self {
        let verifier = verifier.into();
        let challenge = generate_code_challenge(&verifier);
        Self { verifier, challenge }
    }

    /// Secret sent with the code exchange
    #[must_use]
    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    /// Hash sent with the authorization request
    #[must_use]
    pub fn challenge(&self) -> &str {
        &self.challenge
    }

    /// Get the challenge method (always "S256" for SHA256)
    #[must_use]
    pub const fn challenge_method(&self) -> &'static str {
        CODE_CHALLENGE_METHOD
    }
}

impl fmt::Debug for PkcePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PkcePair")
            .field("verifier", &"<redacted>")
            .field("challenge", &self.challenge)
            .finish()
    }
}
