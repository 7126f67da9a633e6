//! Sender and reader entry points over the key manager and record codec

use tracing::{debug, instrument, warn};

use sealwall_core::Record;

use crate::chunk;
use crate::envelope::EncryptedEnvelope;
use crate::error::{CryptoError, CryptoResult};
use crate::keys::KeyManager;
use crate::provider::{CryptoProvider, RsaOaep};
use crate::record::{self, LengthRecovery};

/// Encrypts messages for the recipient and decrypts ledger records on the
/// recipient's device.
pub struct EncryptionService<P: CryptoProvider = RsaOaep> {
    keys: KeyManager<P>,
    recovery: LengthRecovery,
}

impl<P: CryptoProvider> EncryptionService<P> {
    pub fn new(keys: KeyManager<P>, recovery: LengthRecovery) -> Self {
        Self { keys, recovery }
    }

    pub fn keys(&self) -> &KeyManager<P> {
        &self.keys
    }

    pub fn recovery(&self) -> LengthRecovery {
        self.recovery
    }

    /// Encrypt `message` under the recipient public key and pack it into words.
    #[instrument(skip_all, fields(plain_bytes = message.len()))]
    pub fn encrypt_for_recipient(&self, message: &str) -> CryptoResult<Record> {
        let envelope = self.encrypt_envelope(message)?;
        let record = record::pack(&envelope.blocks);
        debug!(words = record.len(), "packed record");
        Ok(record)
    }

    /// Encrypt `message` but keep the envelope, for the armored form.
    pub fn encrypt_envelope(&self, message: &str) -> CryptoResult<EncryptedEnvelope> {
        if message.is_empty() {
            return Err(CryptoError::EmptyMessage);
        }
        let public = self.keys.load_public()?.ok_or(CryptoError::NoPublicKey)?;
        chunk::encrypt_message(self.keys.provider(), &public, message)
    }

    /// Decrypt one ledger record with the locally stored private key.
    #[instrument(skip_all, fields(words = record.len()))]
    pub fn decrypt_as_recipient(&self, record: &Record) -> CryptoResult<String> {
        let private = self.private_key()?;
        self.decrypt_with_key(&private, record)
    }

    /// Decrypt an armored envelope with the locally stored private key.
    pub fn decrypt_envelope(&self, envelope: &EncryptedEnvelope) -> CryptoResult<String> {
        let private = self.private_key()?;
        chunk::decrypt_message(self.keys.provider(), &private, envelope)
    }

    pub(crate) fn private_key(&self) -> CryptoResult<P::PrivateKey> {
        self.keys.load_private()?.ok_or(CryptoError::NoPrivateKey)
    }

    /// Decrypt with an already loaded key so batch readers import it once.
    pub(crate) fn decrypt_with_key(
        &self,
        private: &P::PrivateKey,
        record: &Record,
    ) -> CryptoResult<String> {
        let provider = self.keys.provider();
        let block_len = provider.block_len(private);
        let flat = record::recover(record, block_len, self.recovery).inspect_err(|e| {
            if self.recovery == LengthRecovery::ZeroTrim {
                warn!(error = %e, "zero-trim could not recover the ciphertext length");
            }
        })?;
        let blocks = record::split_blocks(&flat, block_len)?;
        chunk::decrypt_message(provider, private, &EncryptedEnvelope::from_blocks(blocks))
    }
}
