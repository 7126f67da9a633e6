//! Encrypted envelope: ordered ciphertext blocks plus the plaintext length
//!
//! The armored text form keeps the original length, which the word-aligned
//! record does not transmit:
//! ```text
//! base64( {"chunks": ["<base64 block 0>", ...], "originalLength": n} )
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CryptoError, CryptoResult};

/// One OAEP ciphertext; exactly one modulus length long.
pub type CipherBlock = Vec<u8>;

/// Ordered ciphertext blocks of one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedEnvelope {
    /// Blocks in chunk order; position is the only reassembly information
    pub blocks: Vec<CipherBlock>,
    /// UTF-8 byte length of the plaintext, when known. Envelopes rebuilt from
    /// a wire record do not carry it.
    pub original_len: Option<usize>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmoredEnvelope {
    chunks: Vec<String>,
    original_length: usize,
}

impl EncryptedEnvelope {
    pub fn new(blocks: Vec<CipherBlock>, original_len: usize) -> Self {
        Self {
            blocks,
            original_len: Some(original_len),
        }
    }

    /// Envelope rebuilt from ciphertext alone
    pub fn from_blocks(blocks: Vec<CipherBlock>) -> Self {
        Self {
            blocks,
            original_len: None,
        }
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Sum of all block lengths
    pub fn cipher_len(&self) -> usize {
        self.blocks.iter().map(Vec::len).sum()
    }

    /// Serialize to the armored text form.
    pub fn to_armored(&self) -> CryptoResult<String> {
        let original_length = match self.original_len {
            Some(n) => n,
            None => {
                return Err(CryptoError::RecordFormat(
                    "cannot armor an envelope without its original length".into(),
                ))
            }
        };
        let armored = ArmoredEnvelope {
            chunks: self.blocks.iter().map(|b| base64_encode(b)).collect(),
            original_length,
        };
        let json = serde_json::to_vec(&armored)
            .map_err(|e| CryptoError::RecordFormat(format!("envelope serialization: {e}")))?;
        Ok(base64_encode(&json))
    }

    /// Parse the armored text form.
    pub fn from_armored(text: &str) -> CryptoResult<Self> {
        let json = base64_decode(text.trim())?;
        let armored: ArmoredEnvelope = serde_json::from_slice(&json)
            .map_err(|e| CryptoError::RecordFormat(format!("envelope deserialization: {e}")))?;
        let blocks = armored
            .chunks
            .iter()
            .map(|c| base64_decode(c))
            .collect::<CryptoResult<Vec<_>>>()?;
        Ok(Self::new(blocks, armored.original_length))
    }
}

fn base64_encode(data: &[u8]) -> String {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    STANDARD.encode(data)
}

fn base64_decode(s: &str) -> CryptoResult<Vec<u8>> {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    STANDARD
        .decode(s)
        .map_err(|e| CryptoError::RecordFormat(format!("base64 decode: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_armor_roundtrip() {
        let envelope = EncryptedEnvelope::new(vec![vec![0xAB; 256], vec![0x01; 256]], 200);
        let text = envelope.to_armored().unwrap();
        let restored = EncryptedEnvelope::from_armored(&text).unwrap();

        assert_eq!(restored, envelope);
        assert_eq!(restored.block_count(), 2);
        assert_eq!(restored.cipher_len(), 512);
    }

    #[test]
    fn test_armor_json_shape() {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine;

        let envelope = EncryptedEnvelope::new(vec![vec![1, 2, 3]], 3);
        let json = STANDARD.decode(envelope.to_armored().unwrap()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();

        assert_eq!(value["originalLength"], 3);
        assert_eq!(value["chunks"][0], "AQID");
    }

    #[test]
    fn test_armor_requires_length() {
        let envelope = EncryptedEnvelope::from_blocks(vec![vec![1; 256]]);
        assert!(matches!(envelope.to_armored(), Err(CryptoError::RecordFormat(_))));
    }

    #[test]
    fn test_from_armored_rejects_garbage() {
        assert!(EncryptedEnvelope::from_armored("***").is_err());
        // valid base64, not JSON
        assert!(EncryptedEnvelope::from_armored("aGVsbG8=").is_err());
    }

    #[test]
    fn test_empty_envelope() {
        let envelope = EncryptedEnvelope::new(Vec::new(), 0);
        let restored = EncryptedEnvelope::from_armored(&envelope.to_armored().unwrap()).unwrap();
        assert_eq!(restored.block_count(), 0);
        assert_eq!(restored.original_len, Some(0));
    }
}
