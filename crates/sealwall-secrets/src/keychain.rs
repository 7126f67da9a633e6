//! Platform keychain backend.
//!
//! Uses the `keyring` crate for cross-platform access:
//! - macOS: Keychain Services
//! - Linux: GNOME Keyring / Secret Service (D-Bus)
//! - Windows: Credential Manager (DPAPI)
//!
//! Both slots live in a single keychain entry as one JSON document, so a pair
//! is always replaced in one write.

use std::sync::Mutex;

use sealwall_core::{KeySlot, KeyStore, SealwallError, SealwallResult};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

const SERVICE_NAME: &str = "sealwall";

/// Well-known keychain entry names
pub mod entries {
    /// The recipient key pair (JSON with `public` and `private`)
    pub const RECIPIENT_KEYS: &str = "recipient-keys";
}

#[derive(Default, Serialize, Deserialize)]
struct StoredPair {
    #[serde(default)]
    public: Option<String>,
    #[serde(default)]
    private: Option<String>,
}

impl Drop for StoredPair {
    fn drop(&mut self) {
        if let Some(private) = self.private.as_mut() {
            private.zeroize();
        }
    }
}

pub struct KeychainKeyStore {
    entry: keyring::Entry,
    account: String,
    write_lock: Mutex<()>,
}

impl KeychainKeyStore {
    pub fn new() -> SealwallResult<Self> {
        Self::with_account(entries::RECIPIENT_KEYS)
    }

    /// Store under a custom account name (one keychain entry per account).
    pub fn with_account(account: &str) -> SealwallResult<Self> {
        let entry = keyring::Entry::new(SERVICE_NAME, account)
            .map_err(|e| SealwallError::KeyStore(format!("keychain entry creation: {e}")))?;
        Ok(Self {
            entry,
            account: account.to_string(),
            write_lock: Mutex::new(()),
        })
    }

    fn read(&self) -> SealwallResult<StoredPair> {
        match self.entry.get_password() {
            Ok(mut password) => {
                let secret = SecretString::from(password.clone());
                password.zeroize();
                serde_json::from_str(secret.expose_secret()).map_err(|e| {
                    SealwallError::KeyStore(format!(
                        "keychain entry '{}' is not a key pair: {e}",
                        self.account
                    ))
                })
            }
            Err(keyring::Error::NoEntry) => Ok(StoredPair::default()),
            Err(e) => Err(SealwallError::KeyStore(format!(
                "keychain get for '{}': {e}",
                self.account
            ))),
        }
    }

    fn write(&self, pair: &StoredPair) -> SealwallResult<()> {
        let json = serde_json::to_string(pair)
            .map_err(|e| SealwallError::KeyStore(format!("serializing key pair: {e}")))?;
        let secret = SecretString::from(json);
        self.entry
            .set_password(secret.expose_secret())
            .map_err(|e| {
                SealwallError::KeyStore(format!("keychain store for '{}': {e}", self.account))
            })?;
        tracing::debug!(account = %self.account, "stored key pair in platform keychain");
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut StoredPair)) -> SealwallResult<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| SealwallError::KeyStore("keychain lock poisoned".into()))?;
        let mut pair = self.read()?;
        apply(&mut pair);
        self.write(&pair)
    }
}

impl KeyStore for KeychainKeyStore {
    fn put(&self, slot: KeySlot, value: &str) -> SealwallResult<()> {
        self.update(|pair| match slot {
            KeySlot::Public => pair.public = Some(value.to_string()),
            KeySlot::Private => pair.private = Some(value.to_string()),
        })
    }

    fn get(&self, slot: KeySlot) -> SealwallResult<Option<String>> {
        let mut pair = self.read()?;
        Ok(match slot {
            KeySlot::Public => pair.public.take(),
            KeySlot::Private => pair.private.take(),
        })
    }

    fn put_pair(&self, public: &str, private: &str) -> SealwallResult<()> {
        self.update(|pair| {
            pair.public = Some(public.to_string());
            pair.private = Some(private.to_string());
        })
    }

    fn describe(&self) -> String {
        format!("keychain:{SERVICE_NAME}/{}", self.account)
    }
}
