//! AES-256-GCM authenticated encryption for secret columns at rest.
//!
//! Covers `UpstreamCredential::password_encrypted` and
//! `LLMProviderConfig::api_key_encrypted`. The key is loaded once at
//! process startup from an environment variable and never written to
//! disk or logged; there is no first-run key generation.
//!
//! Ciphertext format: `nonce(12) || ciphertext_with_tag`.

use crate::error::CryptoError;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm};

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// The environment variable holding the base64-encoded 32-byte encryption key.
pub const ENCRYPTION_KEY_ENV_VAR: &str = "YOURMOMENT_ENCRYPTION_KEY";

/// A process-wide AES-256-GCM key, loaded once at startup.
///
/// Cheap to clone (wraps an `Arc`-free fixed-size byte array) and safe to
/// share across stage workers; never implements `Debug`/`Display` so it
/// cannot be accidentally logged.
#[derive(Clone)]
pub struct EncryptionKey([u8; KEY_LEN]);

impl EncryptionKey {
    /// Load the key from `YOURMOMENT_ENCRYPTION_KEY` (base64-encoded, 32 raw bytes).
    pub fn from_env() -> Result<Self, CryptoError> {
        Self::from_env_var(ENCRYPTION_KEY_ENV_VAR)
    }

    /// Load the key from the named environment variable (base64-encoded, 32
    /// raw bytes). Used when the variable name itself is configurable.
    pub fn from_env_var(var_name: &str) -> Result<Self, CryptoError> {
        let raw = std::env::var(var_name).map_err(|_| CryptoError::KeyUnavailable {
            message: format!("{var_name} is not set"),
        })?;
        Self::from_base64(&raw)
    }

    /// Decode a key directly from a base64 string (used by tests and `from_env`).
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        use base64::Engine;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptoError::KeyUnavailable {
                message: format!("invalid base64 encryption key: {e}"),
            })?;
        if bytes.len() != KEY_LEN {
            return Err(CryptoError::KeyUnavailable {
                message: format!(
                    "encryption key has invalid length {} (expected {KEY_LEN} bytes)",
                    bytes.len()
                ),
            });
        }
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&bytes);
        Ok(Self(key))
    }

    /// Encrypt `plaintext`, returning `nonce(12) || ciphertext_with_tag`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let cipher =
            Aes256Gcm::new_from_slice(&self.0).map_err(|_| CryptoError::EncryptFailed)?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| CryptoError::EncryptFailed)?;

        let mut blob = nonce.to_vec();
        blob.extend_from_slice(&ciphertext);
        Ok(blob)
    }

    /// Decrypt a blob produced by `encrypt`.
    pub fn decrypt(&self, blob: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if blob.len() < NONCE_LEN + 16 {
            return Err(CryptoError::CiphertextTooShort {
                len: blob.len(),
                min: NONCE_LEN + 16,
            });
        }

        let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
        let nonce = aes_gcm::Nonce::from_slice(nonce_bytes);

        let cipher =
            Aes256Gcm::new_from_slice(&self.0).map_err(|_| CryptoError::DecryptFailed)?;

        cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CryptoError::DecryptFailed)
    }
}

/// Trait seam over `EncryptionKey` so pipeline stages can be tested against
/// a fixed, in-memory key without touching the environment.
pub trait CryptoAdapter: Send + Sync {
    /// Encrypt plaintext bytes, returning an opaque token.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;
    /// Decrypt a token produced by `encrypt`.
    fn decrypt(&self, token: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

impl CryptoAdapter for EncryptionKey {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        EncryptionKey::encrypt(self, plaintext)
    }
    fn decrypt(&self, token: &[u8]) -> Result<Vec<u8>, CryptoError> {
        EncryptionKey::decrypt(self, token)
    }
}
