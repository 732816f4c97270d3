// Cryptographic primitives for sealing sessions and signing cookies

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};

/// Nonce size for AES-256-GCM encryption (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Encryption key size for AES-256 (256 bits)
pub const ENCRYPTION_KEY_SIZE: usize = 32;

type HmacSha256 = Hmac<Sha256>;

/// Generic encryption function for any serializable data using AES-256-GCM
///
/// # Returns
///
/// A Base64URL-encoded string containing the nonce + ciphertext
///
/// # Errors
///
/// Returns an error if:
/// - Serialization fails
/// - Key length is invalid
/// - AES encryption fails
pub fn encrypt_data<T: Serialize>(data: &T, key: &[u8]) -> Result<String> {
    if key.len() != ENCRYPTION_KEY_SIZE {
        return Err(anyhow!(
            "Invalid key length: expected {ENCRYPTION_KEY_SIZE} bytes, got {}",
            key.len()
        ));
    }

    let json_data = serde_json::to_vec(data).context("Failed to serialize data")?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let ciphertext = cipher
        .encrypt(nonce, json_data.as_slice())
        .map_err(|e| anyhow!("AES encryption failed: {e}"))?;

    // nonce || ciphertext
    let mut combined = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    combined.extend_from_slice(&nonce_bytes);
    combined.extend_from_slice(&ciphertext);

    Ok(general_purpose::URL_SAFE_NO_PAD.encode(&combined))
}

/// Generic decryption function for any deserializable data using AES-256-GCM
///
/// # Errors
///
/// Returns an error if:
/// - Key length is invalid
/// - Base64 decoding fails
/// - Data length is invalid
/// - AES decryption fails (wrong key or tampered data)
/// - Deserialization fails
pub fn decrypt_data<T: DeserializeOwned>(encrypted_data: &str, key: &[u8]) -> Result<T> {
    if key.len() != ENCRYPTION_KEY_SIZE {
        return Err(anyhow!(
            "Invalid key length: expected {ENCRYPTION_KEY_SIZE} bytes, got {}",
            key.len()
        ));
    }

    let combined = general_purpose::URL_SAFE_NO_PAD
        .decode(encrypted_data)
        .context("Failed to decode base64 data")?;

    if combined.len() < NONCE_SIZE {
        return Err(anyhow!("Invalid data length"));
    }

    let (nonce_bytes, ciphertext) = combined.split_at(NONCE_SIZE);
    let nonce = Nonce::from_slice(nonce_bytes);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| anyhow!("AES decryption failed: {e}"))?;

    serde_json::from_slice(&plaintext).context("Failed to deserialize data from decrypted JSON")
}

/// Derive a 32-byte key from the configured cookie password.
///
/// Passwords are validated to be at least 32 characters at startup, so a
/// single SHA-256 pass is enough to spread them over the key space.
#[must_use]
pub fn derive_encryption_key(password: &[u8]) -> [u8; ENCRYPTION_KEY_SIZE] {
    let digest = Sha256::digest(password);
    let mut key = [0u8; ENCRYPTION_KEY_SIZE];
    key.copy_from_slice(&digest);
    key
}

/// Derive a signing key distinct from the encryption key for the same password
#[must_use]
pub fn derive_signing_key(password: &[u8]) -> [u8; ENCRYPTION_KEY_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update(b"cookie-signature:");
    hasher.update(password);
    let mut key = [0u8; ENCRYPTION_KEY_SIZE];
    key.copy_from_slice(&hasher.finalize());
    key
}

/// Append an HMAC-SHA256 signature to `value` as `value.signature`
///
/// # Errors
///
/// Returns an error if the HMAC key is rejected
pub fn sign_value(value: &str, key: &[u8]) -> Result<String> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key).context("Invalid HMAC key length")?;
    mac.update(value.as_bytes());
    let signature = general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    Ok(format!("{value}.{signature}"))
}

/// Verify a value produced by [`sign_value`], returning the unsigned part
#[must_use]
pub fn verify_signed_value(signed: &str, key: &[u8]) -> Option<String> {
    let (value, signature) = signed.rsplit_once('.')?;
    let signature = general_purpose::URL_SAFE_NO_PAD.decode(signature).ok()?;

    let mut mac = <HmacSha256 as Mac>::new_from_slice(key).ok()?;
    mac.update(value.as_bytes());
    // constant-time comparison
    mac.verify_slice(&signature).ok()?;

    Some(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    const TEST_PASSWORD: &[u8] = b"a-cookie-password-that-is-long-enough";

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn test_encrypt_decrypt_with_derived_key() {
        let key = derive_encryption_key(TEST_PASSWORD);
        let sample = Sample {
            name: "session".to_string(),
            count: 3,
        };

        let sealed = encrypt_data(&sample, &key).unwrap();
        assert!(!sealed.contains("session"));

        let opened: Sample = decrypt_data(&sealed, &key).unwrap();
        assert_eq!(opened, sample);
    }

    #[test]
    fn test_encryption_uses_fresh_nonce() {
        let key = derive_encryption_key(TEST_PASSWORD);
        let sample = Sample {
            name: "same".to_string(),
            count: 1,
        };

        let first = encrypt_data(&sample, &key).unwrap();
        let second = encrypt_data(&sample, &key).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_decrypt_with_wrong_key_fails() {
        let key = derive_encryption_key(TEST_PASSWORD);
        let other = derive_encryption_key(b"another-password-that-is-also-long!!");
        let sealed = encrypt_data(&"secret", &key).unwrap();

        let result: Result<String> = decrypt_data(&sealed, &other);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_key_length_rejected() {
        let result = encrypt_data(&"data", b"short");
        assert!(result.unwrap_err().to_string().contains("Invalid key length"));
    }

    #[test]
    fn test_decrypt_truncated_data_fails() {
        let key = derive_encryption_key(TEST_PASSWORD);
        let result: Result<String> = decrypt_data("AAAA", &key);
        assert!(result.is_err());
    }

    #[test]
    fn test_signing_and_encryption_keys_differ() {
        assert_ne!(
            derive_encryption_key(TEST_PASSWORD),
            derive_signing_key(TEST_PASSWORD)
        );
    }

    #[test]
    fn test_signed_value_round_trip() {
        let key = derive_signing_key(TEST_PASSWORD);
        let signed = sign_value("eyJqd3QiOiJ4In0", &key).unwrap();

        assert_eq!(
            verify_signed_value(&signed, &key).as_deref(),
            Some("eyJqd3QiOiJ4In0")
        );
    }

    #[test]
    fn test_tampered_signed_value_rejected() {
        let key = derive_signing_key(TEST_PASSWORD);
        let signed = sign_value("payload", &key).unwrap();
        let tampered = signed.replacen("payload", "pAyload", 1);

        assert!(verify_signed_value(&tampered, &key).is_none());
        assert!(verify_signed_value("no-signature", &key).is_none());
    }
}
