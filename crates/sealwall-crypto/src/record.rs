//! Word-aligned record format for the ledger
//!
//! ```text
//! pack:   block0 || block1 || ... → split into 32-byte words, last word zero-padded
//! unpack: words → concat → drop trailing zero bytes → must be k * block_len
//! ```
//!
//! The record has no length prefix, so the padding in the last word is
//! indistinguishable from ciphertext that happens to end in zero bytes
//! (about 1 message in 256). `unpack` refuses such records instead of
//! truncating them; `unpack_aligned` restores the zeros by rounding back up to
//! the block boundary, which is exact because every block has the same size.

use sealwall_core::{Record, Word, WORD_SIZE};

pub use sealwall_core::config::LengthRecovery;

use crate::envelope::CipherBlock;
use crate::error::{CryptoError, CryptoResult};

/// Flatten blocks into 32-byte words, zero-padding the last one.
pub fn pack(blocks: &[CipherBlock]) -> Record {
    let total: usize = blocks.iter().map(Vec::len).sum();
    let mut buf = Vec::with_capacity(total);
    for block in blocks {
        buf.extend_from_slice(block);
    }

    let words = buf
        .chunks(WORD_SIZE)
        .map(|slice| {
            let mut word = [0u8; WORD_SIZE];
            word[..slice.len()].copy_from_slice(slice);
            Word::from_bytes(word)
        })
        .collect();
    Record::new(words)
}

/// Concatenate the words and strip every trailing zero byte.
///
/// Fails if the record is empty or the stripped length is not a positive
/// multiple of `block_len`.
pub fn unpack(record: &Record, block_len: usize) -> CryptoResult<Vec<u8>> {
    let mut bytes = record_bytes(record)?;
    let trimmed = trimmed_len(&bytes);

    if trimmed == 0 || trimmed % block_len != 0 {
        return Err(CryptoError::RecordFormat(format!(
            "{trimmed} bytes after trimming zero padding is not a positive multiple of \
             the {block_len}-byte cipher block (ciphertext may end in a zero byte)"
        )));
    }
    bytes.truncate(trimmed);
    Ok(bytes)
}

/// Like [`unpack`], but rounds the trimmed length back up to the next block
/// boundary, recovering ciphertext that ends in zero bytes.
pub fn unpack_aligned(record: &Record, block_len: usize) -> CryptoResult<Vec<u8>> {
    let mut bytes = record_bytes(record)?;
    let trimmed = trimmed_len(&bytes);
    if trimmed == 0 {
        return Err(CryptoError::RecordFormat("record is all zero bytes".into()));
    }

    let aligned = trimmed.div_ceil(block_len) * block_len;
    if aligned > bytes.len() {
        return Err(CryptoError::RecordFormat(format!(
            "record holds {} bytes, short of the {aligned} needed for whole {block_len}-byte blocks",
            bytes.len()
        )));
    }
    bytes.truncate(aligned);
    Ok(bytes)
}

/// Recover the flat ciphertext with the chosen strategy.
pub fn recover(record: &Record, block_len: usize, mode: LengthRecovery) -> CryptoResult<Vec<u8>> {
    match mode {
        LengthRecovery::ZeroTrim => unpack(record, block_len),
        LengthRecovery::BlockAligned => unpack_aligned(record, block_len),
    }
}

/// Slice flat ciphertext into fixed-size blocks.
pub fn split_blocks(bytes: &[u8], block_len: usize) -> CryptoResult<Vec<CipherBlock>> {
    if block_len == 0 || bytes.is_empty() || bytes.len() % block_len != 0 {
        return Err(CryptoError::RecordFormat(format!(
            "{} bytes is not a positive multiple of the {block_len}-byte cipher block",
            bytes.len()
        )));
    }
    Ok(bytes.chunks_exact(block_len).map(<[u8]>::to_vec).collect())
}

fn record_bytes(record: &Record) -> CryptoResult<Vec<u8>> {
    if record.is_empty() {
        return Err(CryptoError::RecordFormat("record has no words".into()));
    }
    Ok(record.to_bytes())
}

fn trimmed_len(bytes: &[u8]) -> usize {
    bytes.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1)
}
