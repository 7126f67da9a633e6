//! Chunked RSA-OAEP encryption of a whole message
//!
//! The UTF-8 plaintext is cut into consecutive chunks of at most
//! `max_plain_len` bytes (190 for RSA-2048 with SHA-256 OAEP) and every chunk
//! is encrypted on its own. An empty message produces no blocks at all.
//!
//! Decryption is all-or-nothing: a single bad block fails the message.

use tracing::debug;

use crate::envelope::EncryptedEnvelope;
use crate::error::{CryptoError, CryptoResult};
use crate::provider::CryptoProvider;

/// Number of blocks a plaintext of `len` bytes needs (0 for empty input).
pub fn chunk_count(len: usize, max_plain_len: usize) -> usize {
    len.div_ceil(max_plain_len)
}

/// Encrypt raw bytes chunk by chunk under `key`.
pub fn encrypt_bytes<P: CryptoProvider>(
    provider: &P,
    key: &P::PublicKey,
    plaintext: &[u8],
) -> CryptoResult<EncryptedEnvelope> {
    let max_plain = provider.max_plain_len(key);
    if max_plain == 0 {
        return Err(CryptoError::Encryption(
            "public key too small to carry any plaintext".into(),
        ));
    }

    let blocks = plaintext
        .chunks(max_plain)
        .map(|chunk| provider.encrypt(key, chunk))
        .collect::<CryptoResult<Vec<_>>>()?;

    debug!(
        plain_bytes = plaintext.len(),
        blocks = blocks.len(),
        "encrypted message"
    );
    Ok(EncryptedEnvelope::new(blocks, plaintext.len()))
}

/// Encrypt a text message.
pub fn encrypt_message<P: CryptoProvider>(
    provider: &P,
    key: &P::PublicKey,
    message: &str,
) -> CryptoResult<EncryptedEnvelope> {
    encrypt_bytes(provider, key, message.as_bytes())
}

/// Decrypt every block in order and concatenate the output.
///
/// If the envelope records its original length, the output must match it.
pub fn decrypt_envelope<P: CryptoProvider>(
    provider: &P,
    key: &P::PrivateKey,
    envelope: &EncryptedEnvelope,
) -> CryptoResult<Vec<u8>> {
    let mut plaintext = Vec::with_capacity(envelope.block_count() * provider.block_len(key));
    for (index, block) in envelope.blocks.iter().enumerate() {
        let chunk = provider.decrypt(key, block).map_err(|e| match e {
            CryptoError::Decryption(reason) => {
                CryptoError::Decryption(format!("block {index}: {reason}"))
            }
            other => other,
        })?;
        plaintext.extend_from_slice(&chunk);
    }

    if let Some(expected) = envelope.original_len {
        if plaintext.len() != expected {
            return Err(CryptoError::Decryption(format!(
                "decrypted {} bytes but the envelope records {expected}",
                plaintext.len()
            )));
        }
    }

    debug!(
        blocks = envelope.block_count(),
        plain_bytes = plaintext.len(),
        "decrypted message"
    );
    Ok(plaintext)
}

/// Decrypt an envelope and decode it as UTF-8.
pub fn decrypt_message<P: CryptoProvider>(
    provider: &P,
    key: &P::PrivateKey,
    envelope: &EncryptedEnvelope,
) -> CryptoResult<String> {
    let bytes = decrypt_envelope(provider, key, envelope)?;
    Ok(String::from_utf8(bytes)?)
}
