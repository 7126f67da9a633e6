//! Key lifecycle: generation, base64 SPKI/PKCS8 export and import, persistence

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sealwall_core::{KeySlot, KeyStore};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};
use crate::provider::{CryptoProvider, RsaOaep};

/// A public key and the private key generated alongside it.
pub struct KeyPair<P: CryptoProvider = RsaOaep> {
    public: P::PublicKey,
    private: P::PrivateKey,
}

impl<P: CryptoProvider> KeyPair<P> {
    /// Providers build pairs from one generation call; halves are never mixed.
    pub fn new(public: P::PublicKey, private: P::PrivateKey) -> Self {
        Self { public, private }
    }

    pub fn public(&self) -> &P::PublicKey {
        &self.public
    }

    pub fn private(&self) -> &P::PrivateKey {
        &self.private
    }
}

impl<P: CryptoProvider> Clone for KeyPair<P> {
    fn clone(&self) -> Self {
        Self {
            public: self.public.clone(),
            private: self.private.clone(),
        }
    }
}

impl<P: CryptoProvider> std::fmt::Debug for KeyPair<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("private", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Transport-safe form of a key pair: standard base64 of SPKI / PKCS8 DER.
#[derive(Clone)]
pub struct EncodedKeyPair {
    pub public: String,
    pub private: SecretString,
}

impl std::fmt::Debug for EncodedKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodedKeyPair")
            .field("public", &self.public)
            .field("private", &"[REDACTED]")
            .finish()
    }
}

/// What an imported key will be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyUsage {
    /// Public key, SPKI encoding
    Encrypt,
    /// Private key, PKCS8 encoding
    Decrypt,
}

/// A key imported for a specific usage
pub enum KeyHandle<P: CryptoProvider = RsaOaep> {
    Public(P::PublicKey),
    Private(P::PrivateKey),
}

impl<P: CryptoProvider> KeyHandle<P> {
    pub fn usage(&self) -> KeyUsage {
        match self {
            KeyHandle::Public(_) => KeyUsage::Encrypt,
            KeyHandle::Private(_) => KeyUsage::Decrypt,
        }
    }
}

/// Generates, persists and loads the recipient key pair.
///
/// The key store is an explicit value owned by the caller; nothing here is
/// process-global.
pub struct KeyManager<P: CryptoProvider = RsaOaep> {
    provider: P,
    store: Arc<dyn KeyStore>,
    public_override: Option<String>,
}

impl KeyManager<RsaOaep> {
    /// RSA-2048 key manager over the given store
    pub fn rsa(store: Arc<dyn KeyStore>) -> Self {
        Self::new(RsaOaep::default(), store)
    }
}

impl<P: CryptoProvider> KeyManager<P> {
    pub fn new(provider: P, store: Arc<dyn KeyStore>) -> Self {
        Self {
            provider,
            store,
            public_override: None,
        }
    }

    /// Use this encoded public key for encryption instead of the store's.
    pub fn with_public_override(mut self, encoded: Option<String>) -> Self {
        self.public_override = encoded.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn store(&self) -> &Arc<dyn KeyStore> {
        &self.store
    }

    /// Generate a fresh key pair. Nothing is persisted.
    pub fn generate(&self) -> CryptoResult<KeyPair<P>> {
        self.provider.generate_key_pair()
    }

    pub fn export_public(&self, key: &P::PublicKey) -> CryptoResult<String> {
        Ok(STANDARD.encode(self.provider.export_public(key)?))
    }

    pub fn export_private(&self, key: &P::PrivateKey) -> CryptoResult<SecretString> {
        let der = self.provider.export_private(key)?;
        Ok(SecretString::from(STANDARD.encode(der.as_slice())))
    }

    /// Export either kind of key handle as base64 text.
    pub fn export_encoded(&self, key: &KeyHandle<P>) -> CryptoResult<SecretString> {
        match key {
            KeyHandle::Public(k) => self.export_public(k).map(SecretString::from),
            KeyHandle::Private(k) => self.export_private(k),
        }
    }

    pub fn export_pair(&self, pair: &KeyPair<P>) -> CryptoResult<EncodedKeyPair> {
        Ok(EncodedKeyPair {
            public: self.export_public(pair.public())?,
            private: self.export_private(pair.private())?,
        })
    }

    /// Decode base64 key text for the given usage.
    ///
    /// Fails with `KeyImport` on bad base64, bad DER, or when the encoding
    /// does not match the usage (a PKCS8 private key imported for `Encrypt`).
    pub fn import_encoded(&self, encoded: &str, usage: KeyUsage) -> CryptoResult<KeyHandle<P>> {
        let der = Zeroizing::new(
            STANDARD
                .decode(encoded.trim())
                .map_err(|e| CryptoError::KeyImport(format!("base64 decode: {e}")))?,
        );
        match usage {
            KeyUsage::Encrypt => self.provider.import_public(&der).map(KeyHandle::Public),
            KeyUsage::Decrypt => self.provider.import_private(&der).map(KeyHandle::Private),
        }
    }

    fn import_public(&self, encoded: &str) -> CryptoResult<P::PublicKey> {
        match self.import_encoded(encoded, KeyUsage::Encrypt)? {
            KeyHandle::Public(k) => Ok(k),
            KeyHandle::Private(_) => Err(CryptoError::KeyImport("expected a public key".into())),
        }
    }

    fn import_private(&self, encoded: &str) -> CryptoResult<P::PrivateKey> {
        match self.import_encoded(encoded, KeyUsage::Decrypt)? {
            KeyHandle::Private(k) => Ok(k),
            KeyHandle::Public(_) => Err(CryptoError::KeyImport("expected a private key".into())),
        }
    }

    /// Write both halves of the pair to the store in one call.
    pub fn persist(&self, pair: &KeyPair<P>) -> CryptoResult<EncodedKeyPair> {
        let encoded = self.export_pair(pair)?;
        self.store
            .put_pair(&encoded.public, encoded.private.expose_secret())?;
        info!(
            store = %self.store.describe(),
            fingerprint = %self.fingerprint(pair.public())?,
            "persisted recipient key pair"
        );
        Ok(encoded)
    }

    /// Generate a new pair and persist it.
    ///
    /// Records encrypted under a previous pair become permanently unreadable.
    pub fn generate_and_persist(&self) -> CryptoResult<(KeyPair<P>, EncodedKeyPair)> {
        let pair = self.generate()?;
        let encoded = self.persist(&pair)?;
        Ok((pair, encoded))
    }

    /// Encoded public key to encrypt with: the override if set, else the store's.
    pub fn public_encoded(&self) -> CryptoResult<Option<String>> {
        if let Some(encoded) = &self.public_override {
            return Ok(Some(encoded.clone()));
        }
        Ok(self.store.get(KeySlot::Public)?)
    }

    /// Recipient public key, or `None` if none is configured.
    pub fn load_public(&self) -> CryptoResult<Option<P::PublicKey>> {
        match self.public_encoded()? {
            Some(encoded) => {
                let source = if self.public_override.is_some() {
                    "override"
                } else {
                    "store"
                };
                debug!(source, "loaded recipient public key");
                self.import_public(&encoded).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Recipient private key, or `None` on any device that never generated one.
    pub fn load_private(&self) -> CryptoResult<Option<P::PrivateKey>> {
        match self.store.get(KeySlot::Private)? {
            Some(encoded) => {
                let encoded = SecretString::from(encoded);
                self.import_private(encoded.expose_secret()).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Whether this device holds a private key
    pub fn has_private(&self) -> CryptoResult<bool> {
        Ok(self.store.get(KeySlot::Private)?.is_some())
    }

    /// Short BLAKE3 fingerprint of the SPKI encoding, for comparing keys by eye.
    pub fn fingerprint(&self, key: &P::PublicKey) -> CryptoResult<String> {
        let der = self.provider.export_public(key)?;
        Ok(blake3::hash(&der).to_hex().as_str()[..16].to_string())
    }
}
