//! Field-level encryption seam
//!
//! Views carrying sensitive columns store ciphertext, and the population
//! stage decrypts through this trait without knowing the algorithm behind
//! it.

use thiserror::Error;

pub mod aes;

pub use aes::{AesFieldCipher, SearchKey};

/// Errors that can occur during field cipher operations
#[derive(Debug, Error)]
pub enum CipherError {
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("Invalid key format: {0}")]
    InvalidFormat(String),

    #[error("Malformed ciphertext: {0}")]
    MalformedCiphertext(String),
}

/// Encrypts and decrypts individual field values
pub trait FieldCipher: Send + Sync {
    /// Encrypt one plaintext value into its stored form
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError>;

    /// Decrypt one stored value back to plaintext
    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError>;
}
