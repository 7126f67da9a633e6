//! Asymmetric primitive behind the codec.
//!
//! Everything above this module only sees key handles, DER bytes and
//! ciphertext blocks, so any library offering RSA-OAEP(SHA-256) with SPKI and
//! PKCS8 encodings can stand in for [`RsaOaep`].

use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sealwall_core::config::SUPPORTED_KEY_BITS;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};
use crate::keys::KeyPair;
use crate::{HASH_SIZE, KEY_BITS};

pub trait CryptoProvider: Send + Sync {
    type PublicKey: Clone + Send + Sync;
    type PrivateKey: Clone + Send + Sync;

    /// Generate a fresh key pair; the two halves are only ever handed out together.
    fn generate_key_pair(&self) -> CryptoResult<KeyPair<Self>>
    where
        Self: Sized;

    /// Public key → SPKI DER
    fn export_public(&self, key: &Self::PublicKey) -> CryptoResult<Vec<u8>>;

    /// Private key → PKCS8 DER
    fn export_private(&self, key: &Self::PrivateKey) -> CryptoResult<Zeroizing<Vec<u8>>>;

    /// SPKI DER → public key
    fn import_public(&self, der: &[u8]) -> CryptoResult<Self::PublicKey>;

    /// PKCS8 DER → private key
    fn import_private(&self, der: &[u8]) -> CryptoResult<Self::PrivateKey>;

    /// The public half of a private key
    fn public_of(&self, key: &Self::PrivateKey) -> Self::PublicKey;

    /// Encrypt one chunk of at most `max_plain_len(key)` bytes.
    fn encrypt(&self, key: &Self::PublicKey, chunk: &[u8]) -> CryptoResult<Vec<u8>>;

    /// Decrypt one ciphertext block of exactly `block_len(key)` bytes.
    fn decrypt(&self, key: &Self::PrivateKey, block: &[u8]) -> CryptoResult<Vec<u8>>;

    /// Ciphertext size of one block produced under `key`
    fn ciphertext_len(&self, key: &Self::PublicKey) -> usize;

    /// Ciphertext size of one block this private key decrypts
    fn block_len(&self, key: &Self::PrivateKey) -> usize;

    /// Largest plaintext chunk one block can carry
    fn max_plain_len(&self, key: &Self::PublicKey) -> usize {
        self.ciphertext_len(key).saturating_sub(2 * HASH_SIZE + 2)
    }
}

/// RSA-OAEP with SHA-256 over the `rsa` crate.
#[derive(Debug, Clone, Copy)]
pub struct RsaOaep {
    bits: usize,
}

impl RsaOaep {
    pub fn new(bits: usize) -> CryptoResult<Self> {
        if !SUPPORTED_KEY_BITS.contains(&bits) {
            return Err(CryptoError::KeyGeneration(format!(
                "unsupported RSA modulus size: {bits} bits (expected one of {SUPPORTED_KEY_BITS:?})"
            )));
        }
        Ok(Self { bits })
    }

    pub fn bits(&self) -> usize {
        self.bits
    }
}

impl Default for RsaOaep {
    fn default() -> Self {
        Self { bits: KEY_BITS }
    }
}

fn check_modulus(bytes: usize) -> CryptoResult<()> {
    if SUPPORTED_KEY_BITS.contains(&(bytes * 8)) {
        Ok(())
    } else {
        Err(CryptoError::KeyImport(format!(
            "unsupported RSA modulus size: {} bits",
            bytes * 8
        )))
    }
}

impl CryptoProvider for RsaOaep {
    type PublicKey = RsaPublicKey;
    type PrivateKey = RsaPrivateKey;

    fn generate_key_pair(&self) -> CryptoResult<KeyPair<Self>> {
        let private = RsaPrivateKey::new(&mut rand::thread_rng(), self.bits)
            .map_err(|e| CryptoError::KeyGeneration(format!("RSA-{}: {e}", self.bits)))?;
        let public = RsaPublicKey::from(&private);
        Ok(KeyPair::new(public, private))
    }

    fn export_public(&self, key: &RsaPublicKey) -> CryptoResult<Vec<u8>> {
        key.to_public_key_der()
            .map(|doc| doc.as_bytes().to_vec())
            .map_err(|e| CryptoError::KeyExport(format!("SPKI encoding: {e}")))
    }

    fn export_private(&self, key: &RsaPrivateKey) -> CryptoResult<Zeroizing<Vec<u8>>> {
        key.to_pkcs8_der()
            .map(|doc| Zeroizing::new(doc.as_bytes().to_vec()))
            .map_err(|e| CryptoError::KeyExport(format!("PKCS8 encoding: {e}")))
    }

    fn import_public(&self, der: &[u8]) -> CryptoResult<RsaPublicKey> {
        let key = RsaPublicKey::from_public_key_der(der)
            .map_err(|e| CryptoError::KeyImport(format!("not an RSA SPKI public key: {e}")))?;
        check_modulus(key.size())?;
        Ok(key)
    }

    fn import_private(&self, der: &[u8]) -> CryptoResult<RsaPrivateKey> {
        let key = RsaPrivateKey::from_pkcs8_der(der)
            .map_err(|e| CryptoError::KeyImport(format!("not an RSA PKCS8 private key: {e}")))?;
        check_modulus(key.size())?;
        Ok(key)
    }

    fn public_of(&self, key: &RsaPrivateKey) -> RsaPublicKey {
        RsaPublicKey::from(key)
    }

    fn encrypt(&self, key: &RsaPublicKey, chunk: &[u8]) -> CryptoResult<Vec<u8>> {
        key.encrypt(&mut rand::thread_rng(), Oaep::new::<Sha256>(), chunk)
            .map_err(|e| CryptoError::Encryption(format!("RSA-OAEP: {e}")))
    }

    fn decrypt(&self, key: &RsaPrivateKey, block: &[u8]) -> CryptoResult<Vec<u8>> {
        if block.len() != key.size() {
            return Err(CryptoError::Decryption(format!(
                "ciphertext block is {} bytes (expected {})",
                block.len(),
                key.size()
            )));
        }
        key.decrypt(Oaep::new::<Sha256>(), block).map_err(|_| {
            CryptoError::Decryption("RSA-OAEP: wrong key or corrupted ciphertext".into())
        })
    }

    fn ciphertext_len(&self, key: &RsaPublicKey) -> usize {
        key.size()
    }

    fn block_len(&self, key: &RsaPrivateKey) -> usize {
        key.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{pair_a, pair_b};
    use crate::{CIPHER_BLOCK_SIZE, MAX_BLOCK_PLAIN};

    #[test]
    fn test_block_geometry_2048() {
        let provider = RsaOaep::default();
        let pair = pair_a();
        assert_eq!(provider.ciphertext_len(pair.public()), CIPHER_BLOCK_SIZE);
        assert_eq!(provider.block_len(pair.private()), CIPHER_BLOCK_SIZE);
        assert_eq!(provider.max_plain_len(pair.public()), MAX_BLOCK_PLAIN);
        assert_eq!(MAX_BLOCK_PLAIN, 190);
    }

    #[test]
    fn test_encrypt_decrypt_block() {
        let provider = RsaOaep::default();
        let pair = pair_a();
        let block = provider.encrypt(pair.public(), b"one block").unwrap();
        assert_eq!(block.len(), CIPHER_BLOCK_SIZE);
        let plain = provider.decrypt(pair.private(), &block).unwrap();
        assert_eq!(plain, b"one block");
    }

    #[test]
    fn test_encrypt_is_randomized() {
        let provider = RsaOaep::default();
        let pair = pair_a();
        let c1 = provider.encrypt(pair.public(), b"same").unwrap();
        let c2 = provider.encrypt(pair.public(), b"same").unwrap();
        assert_ne!(c1, c2, "OAEP must be randomized");
    }

    #[test]
    fn test_oversized_chunk_rejected() {
        let provider = RsaOaep::default();
        let pair = pair_a();
        let result = provider.encrypt(pair.public(), &[0x41; MAX_BLOCK_PLAIN + 1]);
        assert!(matches!(result, Err(CryptoError::Encryption(_))));
        provider
            .encrypt(pair.public(), &[0x41; MAX_BLOCK_PLAIN])
            .unwrap();
    }

    #[test]
    fn test_decrypt_wrong_key() {
        let provider = RsaOaep::default();
        let block = provider.encrypt(pair_a().public(), b"secret").unwrap();
        let result = provider.decrypt(pair_b().private(), &block);
        assert!(matches!(result, Err(CryptoError::Decryption(_))));
    }

    #[test]
    fn test_decrypt_short_block() {
        let provider = RsaOaep::default();
        let result = provider.decrypt(pair_a().private(), &[0x11; 100]);
        assert!(matches!(result, Err(CryptoError::Decryption(_))));
    }

    #[test]
    fn test_der_roundtrip_is_bit_exact() {
        let provider = RsaOaep::default();
        let pair = pair_a();

        let spki = provider.export_public(pair.public()).unwrap();
        let public = provider.import_public(&spki).unwrap();
        assert_eq!(&public, pair.public());
        assert_eq!(provider.export_public(&public).unwrap(), spki);

        let pkcs8 = provider.export_private(pair.private()).unwrap();
        let private = provider.import_private(&pkcs8).unwrap();
        assert_eq!(provider.export_private(&private).unwrap().as_slice(), pkcs8.as_slice());
        assert_eq!(&provider.public_of(&private), pair.public());
    }

    #[test]
    fn test_import_usage_mismatch() {
        let provider = RsaOaep::default();
        let pair = pair_a();
        let spki = provider.export_public(pair.public()).unwrap();
        let pkcs8 = provider.export_private(pair.private()).unwrap();

        assert!(matches!(provider.import_public(&pkcs8), Err(CryptoError::KeyImport(_))));
        assert!(matches!(provider.import_private(&spki), Err(CryptoError::KeyImport(_))));
    }

    #[test]
    fn test_import_garbage() {
        let provider = RsaOaep::default();
        assert!(provider.import_public(b"not der").is_err());
        assert!(provider.import_private(&[]).is_err());
    }

    #[test]
    fn test_unsupported_modulus() {
        assert!(RsaOaep::new(1024).is_err());
        assert!(RsaOaep::new(1000).is_err());
        assert_eq!(RsaOaep::new(3072).unwrap().bits(), 3072);
    }
}
