//! Deterministic hashing utilities for stable species-to-music mappings.
//!
//! Every function here maps a string key to the same output across runs,
//! processes, and call orders. No seeded random generators are used, only
//! SHA-256 digests of the key, so voice assignment and note placement stay
//! stable no matter which years or species are processed first.

use anyhow::{bail, Result};
use sha2::{Digest, Sha256};

/// Interpret the first 8 bytes of the key's SHA-256 digest as a
/// big-endian unsigned integer.
fn hash_u64(key: &str) -> u64 {
    let digest = Sha256::digest(key.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

/// Generate a stable integer in [0, modulus) from a string key.
///
/// # Example
/// ```
/// use verdant::hashing::stable_int;
/// let a = stable_int("american_robin", 128).unwrap();
/// let b = stable_int("american_robin", 128).unwrap();
/// assert_eq!(a, b);
/// assert!(a < 128);
/// ```
pub fn stable_int(key: &str, modulus: u64) -> Result<u64> {
    if modulus == 0 {
        bail!("modulus must be positive, got 0");
    }
    Ok(hash_u64(key) % modulus)
}

/// Generate a stable float in [0.0, 1.0) from a string key.
pub fn stable_float01(key: &str) -> f64 {
    hash_u64(key) as f64 / 2f64.powi(64)
}

/// Generate a stable sort key for shuffling a species within a year.
pub fn stable_shuffle_key(year: i32, species_id: &str) -> u64 {
    hash_u64(&format!("{}:{}", year, species_id)) % 1_000_000_000_000_000_000
}

/// Generate a short content hash for reproducibility verification.
///
/// Returns the first 16 hex characters of the SHA-256 digest.
pub fn content_hash(data: &str) -> String {
    let digest = Sha256::digest(data.as_bytes());
    let mut out = String::with_capacity(16);
    for byte in &digest[..8] {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}
