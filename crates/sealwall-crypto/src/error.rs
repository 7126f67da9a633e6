//! Error taxonomy for the codec and key lifecycle.

use sealwall_core::SealwallError;
use thiserror::Error;

pub type CryptoResult<T> = Result<T, CryptoError>;

#[derive(Debug, Error)]
pub enum CryptoError {
    /// The provider could not produce a key pair.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// Malformed key encoding, or a key imported for the wrong usage.
    #[error("key import failed: {0}")]
    KeyImport(String),

    #[error("key export failed: {0}")]
    KeyExport(String),

    /// No recipient public key is configured on this device.
    #[error("no recipient public key configured: the recipient must generate keys first")]
    NoPublicKey,

    /// No private key on this device; expected for everyone but the recipient.
    #[error("no private key on this device: only the recipient can decrypt messages")]
    NoPrivateKey,

    #[error("refusing to encrypt an empty message")]
    EmptyMessage,

    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Wrong key, corrupted or truncated ciphertext.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Decrypted bytes are not valid UTF-8.
    #[error("decrypted message is not valid UTF-8: {0}")]
    Decoding(#[from] std::string::FromUtf8Error),

    #[error("malformed record: {0}")]
    RecordFormat(String),

    /// The decryption thread pool could not start.
    #[error("inbox worker pool: {0}")]
    WorkerPool(String),

    #[error(transparent)]
    Store(#[from] SealwallError),
}

impl CryptoError {
    /// Key material is missing: the user should set up or import keys.
    pub fn is_missing_key(&self) -> bool {
        matches!(self, CryptoError::NoPublicKey | CryptoError::NoPrivateKey)
    }

    /// The message itself cannot be read with the keys at hand.
    pub fn is_unreadable(&self) -> bool {
        matches!(
            self,
            CryptoError::Decryption(_) | CryptoError::Decoding(_) | CryptoError::RecordFormat(_)
        )
    }
}
