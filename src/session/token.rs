// Session token generation

use super::error::StoreError;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use rand::rngs::OsRng;

/// Characters of a token that may appear in logs.
const LOGGED_PREFIX_LEN: usize = 8;

/// Generate a URL-safe token from `bytes` bytes of OS entropy
pub fn generate_token(bytes: usize) -> Result<String, StoreError> {
    let mut buf = vec![0u8; bytes];
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|e| StoreError::EntropyUnavailable(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(&buf))
}

/// Shorten a token for log output, e.g. `Xk3f9QaB...`
pub fn redact(token: &str) -> String {
    let prefix: String = token.chars().take(LOGGED_PREFIX_LEN).collect();
    format!("{prefix}...")
}
