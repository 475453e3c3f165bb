//! Short token generation.
//!
//! A token is derived from the long URL and the current wall-clock second:
//! the pair is hashed with SHA-256 and the digest is encoded with the
//! URL-safe base64 alphabet, keeping the first 7 characters. Truncating a
//! cryptographic digest gives well-distributed, non-invertible tokens
//! without any coordination or global counter.
//!
//! Two calls with the same URL inside the same second may return the same
//! token, so callers must still collision-check against the store before
//! committing a token.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use sha2::{Digest, Sha256};

/// Length of every generated token.
pub const TOKEN_LEN: usize = 7;

/// Generate a token for `url` at the current wall-clock time.
///
/// Never fails; always returns exactly [`TOKEN_LEN`] characters drawn from
/// `[A-Za-z0-9_-]`.
pub fn generate(url: &str) -> String {
    generate_at(url, chrono::Utc::now().timestamp())
}

/// Deterministic variant of [`generate`] with the timestamp supplied by the
/// caller. This is the whole algorithm; `generate` only feeds the clock in.
pub fn generate_at(url: &str, unix_secs: i64) -> String {
    let mut seed = String::with_capacity(url.len() + 20);
    seed.push_str(url);
    seed.push_str(&unix_secs.to_string());

    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    let digest = hasher.finalize();

    // 32-byte digest encodes to 44 chars, padding never reaches the prefix.
    let encoded = URL_SAFE.encode(digest);
    encoded[..TOKEN_LEN].to_string()
}
