//! Salted PBKDF2-HMAC-SHA256 password hashes.
//!
//! Stored form: `pbkdf2-sha256$<iterations>$<salt b64>$<hash b64>`.

use crate::common::{FaceGateError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

fn pbkdf2(password: &[u8], salt: &[u8], iterations: u32) -> Result<[u8; KEY_LEN]> {
    let mac = HmacSha256::new_from_slice(password)
        .map_err(|e| FaceGateError::Other(anyhow::anyhow!("HMAC key rejected: {}", e)))?;

    // A single output block covers KEY_LEN, so the block index is always 1.
    let mut block = mac.clone();
    block.update(salt);
    block.update(&1u32.to_be_bytes());
    let mut u: [u8; KEY_LEN] = block.finalize().into_bytes().into();
    let mut output = u;

    for _ in 1..iterations {
        let mut round = mac.clone();
        round.update(&u);
        u = round.finalize().into_bytes().into();
        for (out, byte) in output.iter_mut().zip(u.iter()) {
            *out ^= byte;
        }
    }

    Ok(output)
}

pub fn hash_password(password: &str, iterations: u32) -> Result<String> {
    if iterations == 0 {
        return Err(FaceGateError::Config("Password iterations must be positive".into()));
    }

    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill(&mut salt);
    let key = pbkdf2(password.as_bytes(), &salt, iterations)?;

    Ok(format!(
        "{}${}${}${}",
        SCHEME,
        iterations,
        STANDARD.encode(salt),
        STANDARD.encode(key)
    ))
}

/// False for a wrong password and for any hash this module did not produce.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let parts: Vec<&str> = stored.split('$').collect();
    let [scheme, iterations, salt, expected] = parts.as_slice() else {
        return false;
    };
    if *scheme != SCHEME {
        return false;
    }

    let (Ok(iterations), Ok(salt), Ok(expected)) = (
        iterations.parse::<u32>(),
        STANDARD.decode(salt),
        STANDARD.decode(expected),
    ) else {
        return false;
    };
    if iterations == 0 {
        return false;
    }

    match pbkdf2(password.as_bytes(), &salt, iterations) {
        Ok(key) => key[..].ct_eq(expected.as_slice()).into(),
        Err(_) => false,
    }
}
