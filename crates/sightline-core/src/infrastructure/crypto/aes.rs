//! AES-256-GCM field cipher
//!
//! Stored values carry their nonce inline as `<nonce-b64>:<ciphertext-b64>`
//! so a single text column holds everything needed to decrypt. A fresh
//! nonce is drawn for every encryption.

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use rand_chacha::rand_core::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::infrastructure::crypto::{CipherError, FieldCipher};

/// Size of AES-256 key in bytes
const AES_KEY_SIZE: usize = 32;

/// Size of AES-GCM nonce in bytes
const NONCE_SIZE: usize = 12;

/// A field encryption key that is securely zeroed on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SearchKey {
    bytes: [u8; AES_KEY_SIZE],
}

impl SearchKey {
    /// Generate a new random key
    pub fn generate() -> Self {
        let mut bytes = [0u8; AES_KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Create a key from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CipherError> {
        if bytes.len() != AES_KEY_SIZE {
            return Err(CipherError::InvalidKeyLength {
                expected: AES_KEY_SIZE,
                actual: bytes.len(),
            });
        }
        let mut key_bytes = [0u8; AES_KEY_SIZE];
        key_bytes.copy_from_slice(bytes);
        Ok(Self { bytes: key_bytes })
    }

    /// Create a key from hex-encoded string
    pub fn from_hex(hex: &str) -> Result<Self, CipherError> {
        let bytes = hex::decode(hex).map_err(|e| CipherError::InvalidFormat(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Create a key from base64-encoded string
    pub fn from_base64(b64: &str) -> Result<Self, CipherError> {
        use base64::{engine::general_purpose::STANDARD, Engine};
        let bytes = STANDARD
            .decode(b64)
            .map_err(|e| CipherError::InvalidFormat(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Export key as hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Export key as base64 string
    pub fn to_base64(&self) -> String {
        use base64::{engine::general_purpose::STANDARD, Engine};
        STANDARD.encode(self.bytes)
    }

    /// Get the raw key bytes (use carefully)
    pub(crate) fn as_bytes(&self) -> &[u8; AES_KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for SearchKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// [`FieldCipher`] backed by AES-256-GCM
#[derive(Debug, Clone)]
pub struct AesFieldCipher {
    key: SearchKey,
}

impl AesFieldCipher {
    /// Create a cipher over the given key
    pub fn new(key: SearchKey) -> Self {
        Self { key }
    }
}

impl FieldCipher for AesFieldCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        use base64::{engine::general_purpose::STANDARD, Engine};

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let cipher = Aes256Gcm::new_from_slice(self.key.as_bytes())
            .map_err(|e| CipherError::EncryptionFailed(e.to_string()))?;

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| CipherError::EncryptionFailed(e.to_string()))?;

        Ok(format!(
            "{}:{}",
            STANDARD.encode(nonce_bytes),
            STANDARD.encode(&ciphertext)
        ))
    }

    fn decrypt(&self, stored: &str) -> Result<String, CipherError> {
        use base64::{engine::general_purpose::STANDARD, Engine};

        let (nonce_b64, ciphertext_b64) = stored.split_once(':').ok_or_else(|| {
            CipherError::MalformedCiphertext("missing nonce separator".to_string())
        })?;

        let nonce_bytes = STANDARD
            .decode(nonce_b64)
            .map_err(|e| CipherError::DecryptionFailed(format!("Invalid nonce: {}", e)))?;

        if nonce_bytes.len() != NONCE_SIZE {
            return Err(CipherError::DecryptionFailed(format!(
                "Invalid nonce length: expected {}, got {}",
                NONCE_SIZE,
                nonce_bytes.len()
            )));
        }

        let ciphertext = STANDARD
            .decode(ciphertext_b64)
            .map_err(|e| CipherError::DecryptionFailed(format!("Invalid ciphertext: {}", e)))?;

        let nonce = Nonce::from_slice(&nonce_bytes);
        let cipher = Aes256Gcm::new_from_slice(self.key.as_bytes())
            .map_err(|e| CipherError::DecryptionFailed(e.to_string()))?;

        let plaintext = cipher.decrypt(nonce, ciphertext.as_ref()).map_err(|_| {
            CipherError::DecryptionFailed(
                "Decryption failed (invalid key or corrupted data)".to_string(),
            )
        })?;

        String::from_utf8(plaintext)
            .map_err(|e| CipherError::DecryptionFailed(format!("Invalid UTF-8: {}", e)))
    }
}
