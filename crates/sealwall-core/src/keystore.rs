//! Local key-value store for the recipient's encoded key pair.
//!
//! Values are opaque encoded strings (base64 SPKI / PKCS8). Implementations
//! must make `put_pair` a single logical write so a concurrent reader never
//! sees a public key without its private half, or the other way round.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{SealwallError, SealwallResult};
use crate::types::KeySlot;

pub trait KeyStore: Send + Sync {
    /// Write one slot.
    fn put(&self, slot: KeySlot, value: &str) -> SealwallResult<()>;

    /// Read one slot; `None` if it was never written.
    fn get(&self, slot: KeySlot) -> SealwallResult<Option<String>>;

    /// Write both halves of a key pair in one transaction.
    fn put_pair(&self, public: &str, private: &str) -> SealwallResult<()>;

    /// Human-readable description of where keys live (for logs and `keys show`)
    fn describe(&self) -> String;
}

/// In-process key store. Contents are lost when the value is dropped.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    slots: RwLock<HashMap<KeySlot, String>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for MemoryKeyStore {
    fn put(&self, slot: KeySlot, value: &str) -> SealwallResult<()> {
        let mut slots = self
            .slots
            .write()
            .map_err(|_| SealwallError::KeyStore("memory key store lock poisoned".into()))?;
        slots.insert(slot, value.to_string());
        Ok(())
    }

    fn get(&self, slot: KeySlot) -> SealwallResult<Option<String>> {
        let slots = self
            .slots
            .read()
            .map_err(|_| SealwallError::KeyStore("memory key store lock poisoned".into()))?;
        Ok(slots.get(&slot).cloned())
    }

    fn put_pair(&self, public: &str, private: &str) -> SealwallResult<()> {
        let mut slots = self
            .slots
            .write()
            .map_err(|_| SealwallError::KeyStore("memory key store lock poisoned".into()))?;
        slots.insert(KeySlot::Public, public.to_string());
        slots.insert(KeySlot::Private, private.to_string());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".into()
    }
}
