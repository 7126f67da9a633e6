pub mod config;
pub mod error;
pub mod keystore;
pub mod types;

pub use error::{SealwallError, SealwallResult};
pub use keystore::{KeyStore, MemoryKeyStore};
pub use types::{KeySlot, Record, Word, WORD_SIZE};
