use argon2::Config;
use rand::Rng;

use crate::error::Result;

/// Hash a plaintext password into an Argon2 encoded string.
pub fn hash<T: AsRef<[u8]>>(password: T) -> Result<String> {
    // 16 bytes is recommended for password hashing:
    //  https://en.wikipedia.org/wiki/Argon2
    let mut salt = [0_u8; 16];
    rand::thread_rng().fill(&mut salt);
    Ok(argon2::hash_encoded(
        password.as_ref(),
        &salt,
        &Config::default(),
    )?)
}

/// Check a plaintext password against an encoded hash.
///
/// A malformed hash never matches.
pub fn verify<T: AsRef<[u8]>>(encoded: &str, password: T) -> bool {
    argon2::verify_encoded(encoded, password.as_ref()).unwrap_or(false)
}
