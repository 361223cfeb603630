//! Session token generation.

use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;

/// Generate an opaque session token: 64 bytes of OS randomness (512 bits),
/// base64-encoded, with the alphabet remapped so the result is safe inside
/// a cookie value (`+`→`-`, `/`→`_`, `\`→`|`, space→`:`).
pub fn generate() -> String {
    let mut bytes = [0u8; 64];
    rand::rngs::OsRng.fill_bytes(&mut bytes);

    general_purpose::STANDARD
        .encode(bytes)
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            '\\' => '|',
            ' ' => ':',
            other => other,
        })
        .collect()
}

/// Strict allow-list check (`[0-9a-zA-Z\-_=|:]+`) applied before any store
/// lookup. An empty token is never well-formed.
pub fn is_well_formed(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '=' | '|' | ':'))
}
