//! Password digest encoding.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha512};

/// SHA-512 of the secret, rendered as lowercase hex and then base64 encoded.
///
/// The base64 layer wraps the hex *text*, not the raw digest bytes; clients
/// depend on this exact shape.
pub fn digest(secret: &str) -> String {
    let hash = Sha512::digest(secret.as_bytes());
    STANDARD.encode(hex::encode(hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASSWORD_DIGEST: &str = "YjEwOWYzYmJiYzI0NGViODI0NDE5MTdlZDA2ZDYxOGI5MDA4ZGQwOWIzYmVmZDFiNWUwNzM5NGM3MDZhOGJiOTgwYjFkNzc4NWU1OTc2ZWMwNDliNDZkZjVmMTMyNmFmNWEyZWE2ZDEwM2ZkMDdjOTUzODVmZmFiMGNhY2JjODY=";

    #[test]
    fn known_vector() {
        assert_eq!(digest("password"), PASSWORD_DIGEST);
    }

    #[test]
    fn base64_wraps_hex_text() {
        let decoded = STANDARD.decode(digest("password")).unwrap();
        let text = String::from_utf8(decoded).unwrap();
        assert_eq!(text.len(), 128);
        assert!(text.starts_with("b109f3bbbc244eb8"));
    }

    #[test]
    fn distinct_secrets_differ() {
        assert_ne!(digest("first"), digest("second"));
    }
}
