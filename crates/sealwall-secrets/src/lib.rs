//! sealwall-secrets: persistent homes for the recipient key pair
//!
//! Backends (selected by `[keys] store`):
//!   - `file`:     JSON file with both slots, replaced atomically, mode 0600
//!   - `keychain`: platform keychain, one entry holding both slots
//!   - `memory`:   process memory, for tests and throwaway sessions

pub mod file;
pub mod keychain;

pub use file::FileKeyStore;
pub use keychain::KeychainKeyStore;

use std::sync::Arc;

use sealwall_core::config::{expand_tilde, KeyStoreBackend, KeysConfig};
use sealwall_core::{KeyStore, MemoryKeyStore, SealwallResult};

/// Open the key store selected by configuration.
pub fn open_key_store(config: &KeysConfig) -> SealwallResult<Arc<dyn KeyStore>> {
    let store: Arc<dyn KeyStore> = match config.store {
        KeyStoreBackend::File => Arc::new(FileKeyStore::new(expand_tilde(&config.path))),
        KeyStoreBackend::Keychain => Arc::new(KeychainKeyStore::new()?),
        KeyStoreBackend::Memory => Arc::new(MemoryKeyStore::new()),
    };
    tracing::debug!(store = %store.describe(), "opened key store");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealwall_core::KeySlot;

    #[test]
    fn test_open_file_store() {
        let tmp = tempfile::tempdir().unwrap();
        let config = KeysConfig {
            store: KeyStoreBackend::File,
            path: tmp.path().join("keys.json"),
            ..Default::default()
        };
        let store = open_key_store(&config).unwrap();
        store.put_pair("pub", "priv").unwrap();
        assert_eq!(store.get(KeySlot::Public).unwrap().as_deref(), Some("pub"));
        assert!(store.describe().starts_with("file:"));
    }

    #[test]
    fn test_open_memory_store() {
        let config = KeysConfig {
            store: KeyStoreBackend::Memory,
            ..Default::default()
        };
        let store = open_key_store(&config).unwrap();
        assert!(store.get(KeySlot::Private).unwrap().is_none());
        assert_eq!(store.describe(), "memory");
    }
}
