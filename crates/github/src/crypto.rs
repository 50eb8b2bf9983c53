//! Secret sealing for GitHub Actions secrets.
//!
//! GitHub only accepts secret values encrypted to the repository's (or
//! organization's) public key using a libsodium sealed box: an ephemeral
//! X25519 key pair, XSalsa20-Poly1305, and the ephemeral public key
//! prepended to the ciphertext.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use crypto_box::PublicKey;
use crypto_box::aead::OsRng;

use crate::error::{Error, Result};

/// Bytes a sealed box adds to the plaintext: the 32-byte ephemeral public
/// key and the 16-byte authentication tag.
pub const SEALED_BOX_OVERHEAD: usize = 48;

/// Seals `plaintext` to a base64 encoded public key.
///
/// The output is standard padded base64, ready to be sent as
/// `encrypted_value`.
///
/// # Errors
///
/// Returns [`Error::Encryption`] if the key is not valid base64 or does not
/// decode to 32 bytes.
///
/// # Examples
///
/// ```
/// use base64::Engine;
/// use base64::engine::general_purpose::STANDARD;
/// use hubform_github::crypto::{SEALED_BOX_OVERHEAD, encrypt_secret};
///
/// let key = STANDARD.encode([7u8; 32]);
/// let sealed = encrypt_secret("s3cr3t", &key).unwrap();
/// let raw = STANDARD.decode(sealed).unwrap();
/// assert_eq!(raw.len(), "s3cr3t".len() + SEALED_BOX_OVERHEAD);
/// ```
pub fn encrypt_secret(plaintext: &str, public_key_b64: &str) -> Result<String> {
    let key_bytes = STANDARD
        .decode(public_key_b64.trim())
        .map_err(|e| Error::Encryption {
            reason: format!("public key is not valid base64: {e}"),
        })?;
    let key: [u8; 32] = key_bytes
        .as_slice()
        .try_into()
        .map_err(|_| Error::Encryption {
            reason: format!("public key must be 32 bytes, got {}", key_bytes.len()),
        })?;

    let sealed = PublicKey::from(key)
        .seal(&mut OsRng, plaintext.as_bytes())
        .map_err(|e| Error::Encryption {
            reason: format!("sealing failed: {e}"),
        })?;
    Ok(STANDARD.encode(sealed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto_box::SecretKey;

    fn key_pair() -> (SecretKey, String) {
        let secret = SecretKey::generate(&mut OsRng);
        let public = STANDARD.encode(secret.public_key().as_bytes());
        (secret, public)
    }

    #[test]
    fn sealed_value_opens_with_matching_key() {
        let (secret, public) = key_pair();
        let sealed = encrypt_secret("hunter2", &public).unwrap();

        let raw = STANDARD.decode(&sealed).unwrap();
        assert_eq!(raw.len(), "hunter2".len() + SEALED_BOX_OVERHEAD);
        assert_eq!(secret.unseal(&raw).unwrap(), b"hunter2");
    }

    #[test]
    fn sealing_is_randomized() {
        let (_, public) = key_pair();
        let a = encrypt_secret("same", &public).unwrap();
        let b = encrypt_secret("same", &public).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn empty_plaintext_still_carries_overhead() {
        let (secret, public) = key_pair();
        let raw = STANDARD.decode(encrypt_secret("", &public).unwrap()).unwrap();
        assert_eq!(raw.len(), SEALED_BOX_OVERHEAD);
        assert!(secret.unseal(&raw).unwrap().is_empty());
    }

    #[test]
    fn wrong_key_cannot_open() {
        let (_, public) = key_pair();
        let (other, _) = key_pair();
        let raw = STANDARD.decode(encrypt_secret("x", &public).unwrap()).unwrap();
        assert!(other.unseal(&raw).is_err());
    }

    #[test]
    fn invalid_base64_key_is_rejected() {
        let err = encrypt_secret("x", "not base64!").unwrap_err();
        assert!(err.to_string().contains("not valid base64"));
    }

    #[test]
    fn short_key_is_rejected() {
        let err = encrypt_secret("x", &STANDARD.encode([1u8; 16])).unwrap_err();
        assert!(err.to_string().contains("must be 32 bytes, got 16"));
    }
}
