//! sealwall-crypto: client-side encryption for anonymous messages to one recipient
//!
//! Architecture: Chunk-then-Encrypt with RSA-OAEP(SHA-256), packed into ledger words
//!
//! Sender pipeline: plaintext → UTF-8 → 190-byte chunks → RSA-OAEP per chunk → concat → 32-byte words
//! Reader pipeline: words → concat → undo last-word padding → 256-byte blocks → RSA-OAEP decrypt → UTF-8
//!
//! Record layout for a 2048-bit key:
//! ```text
//! block 0 (256 bytes) || block 1 (256 bytes) || ... || zero padding to a 32-byte boundary
//! └──────── word 0..7 ──┴──── word 8..15 ────┘
//! ```
//!
//! Blocks carry no index; their order in the record is the only reassembly
//! information, so a record is always appended to the ledger in one call.

pub mod chunk;
pub mod envelope;
pub mod error;
pub mod inbox;
pub mod keys;
pub mod provider;
pub mod record;
pub mod service;

pub use chunk::{chunk_count, decrypt_envelope, decrypt_message, encrypt_bytes, encrypt_message};
pub use envelope::{CipherBlock, EncryptedEnvelope};
pub use error::{CryptoError, CryptoResult};
pub use inbox::{decrypt_all, decrypt_all_with_progress, worker_count, InboxEntry, ProgressFn};
pub use keys::{EncodedKeyPair, KeyHandle, KeyManager, KeyPair, KeyUsage};
pub use provider::{CryptoProvider, RsaOaep};
pub use record::{pack, recover, split_blocks, unpack, unpack_aligned, LengthRecovery};
pub use service::EncryptionService;

/// Default RSA modulus size in bits
pub const KEY_BITS: usize = 2048;

/// Output size of SHA-256, the OAEP hash
pub const HASH_SIZE: usize = 32;

/// Ciphertext size of one block under a 2048-bit key
pub const CIPHER_BLOCK_SIZE: usize = KEY_BITS / 8;

/// Largest plaintext chunk one 2048-bit OAEP block can carry: k - 2*hLen - 2
pub const MAX_BLOCK_PLAIN: usize = CIPHER_BLOCK_SIZE - 2 * HASH_SIZE - 2;
