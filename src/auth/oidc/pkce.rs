//! PKCE verifiers and random request identifiers.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of generated `state` and `nonce` values.
const RANDOM_ID_LENGTH: usize = 32;

/// Challenge method sent with every authorization request.
pub const CODE_CHALLENGE_METHOD: &str = "S256";

/// Generates a random alphanumeric identifier for `state` or `nonce`.
pub fn random_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_ID_LENGTH)
        .map(char::from)
        .collect()
}

/// Generates a PKCE code verifier: 64 random bytes, URL-safe base64 without
/// padding (86 characters, inside the 43-128 range).
pub fn generate_verifier() -> String {
    let mut bytes = [0u8; 64];
    rand::thread_rng().fill(&mut bytes[..]);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Computes the S256 challenge for `verifier`.
pub fn compute_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}
