use {
    base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD},
    sha2::{Digest, Sha256},
};

use crate::types::PkceChallenge;

/// The only challenge method we send.
pub const CHALLENGE_METHOD: &str = "S256";

/// URL-safe base64 without padding (`-` and `_` instead of `+` and `/`).
pub fn base64url(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// S256 challenge for a verifier: base64url(SHA-256(verifier)).
pub fn challenge_for(verifier: &str) -> String {
    base64url(Sha256::digest(verifier.as_bytes()))
}

/// Generate a verifier from 32 random bytes and its S256 challenge.
pub fn generate_pkce() -> PkceChallenge {
    let bytes: [u8; 32] = rand::random();
    let verifier = base64url(bytes);
    let challenge = challenge_for(&verifier);
    PkceChallenge {
        verifier,
        challenge,
    }
}

/// Random anti-CSRF `state` from 16 random bytes.
pub fn generate_state() -> String {
    let bytes: [u8; 16] = rand::random();
    base64url(bytes)
}
