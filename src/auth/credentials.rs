//! Salted PBKDF2-HMAC-SHA256 credential records. Stored form is
//! `iterations$salt_b64$hash_b64`; verification is constant-time via ring.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;
use ring::pbkdf2;
use std::num::NonZeroU32;

const SALT_LEN: usize = 16;
const CRED_LEN: usize = 32;

/// Derive a stored credential record from a plaintext secret.
pub fn hash_credential(secret: &str, iterations: u32) -> String {
    let iterations = NonZeroU32::new(iterations).unwrap_or(NonZeroU32::MIN);
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let mut out = [0u8; CRED_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        &salt,
        secret.as_bytes(),
        &mut out,
    );
    format!(
        "{}${}${}",
        iterations.get(),
        BASE64.encode(salt),
        BASE64.encode(out)
    )
}

/// Verify a supplied secret against a stored record. Malformed records
/// verify as false rather than erroring.
pub fn verify_credential(secret: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    let (Some(iters), Some(salt), Some(hash)) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    let Some(iterations) = iters.parse::<u32>().ok().and_then(NonZeroU32::new) else {
        return false;
    };
    let (Ok(salt), Ok(hash)) = (BASE64.decode(salt), BASE64.decode(hash)) else {
        return false;
    };
    pbkdf2::verify(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        &salt,
        secret.as_bytes(),
        &hash,
    )
    .is_ok()
}
