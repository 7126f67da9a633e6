use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SealwallError;

/// Width of one ledger slot in bytes (`bytes32`)
pub const WORD_SIZE: usize = 32;

/// One fixed-width ledger word, rendered as `0x` + 64 lowercase hex digits
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Word([u8; WORD_SIZE]);

impl Word {
    pub const ZERO: Word = Word([0u8; WORD_SIZE]);

    pub fn from_bytes(bytes: [u8; WORD_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; WORD_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse a word from hex, with or without the `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, SealwallError> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.len() != WORD_SIZE * 2 {
            return Err(SealwallError::Format(format!(
                "word must be {} hex digits, got {}",
                WORD_SIZE * 2,
                digits.len()
            )));
        }

        let mut bytes = [0u8; WORD_SIZE];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| SealwallError::Format(format!("invalid word {s:?}: {e}")))?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Word({})", self.to_hex())
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Word {
    type Err = SealwallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s.trim())
    }
}

impl TryFrom<String> for Word {
    type Error = SealwallError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<Word> for String {
    fn from(w: Word) -> Self {
        w.to_hex()
    }
}

/// The wire form of one encrypted message: an ordered sequence of words.
///
/// Word order is the only thing that ties the ciphertext back together, so a
/// record is always written to a ledger in a single append.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Vec<Word>);

impl Record {
    pub fn new(words: Vec<Word>) -> Self {
        Self(words)
    }

    pub fn words(&self) -> &[Word] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total byte length of the record (`len * WORD_SIZE`)
    pub fn byte_len(&self) -> usize {
        self.0.len() * WORD_SIZE
    }

    /// Concatenate all words into one buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.byte_len());
        for word in &self.0 {
            out.extend_from_slice(word.as_bytes());
        }
        out
    }

    /// Render as one `0x…` word per line.
    pub fn to_hex_lines(&self) -> String {
        self.0
            .iter()
            .map(Word::to_hex)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Parse whitespace- or comma-separated hex words.
    pub fn from_hex_words(text: &str) -> Result<Self, SealwallError> {
        text.split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(Word::from_hex)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

/// Key store slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeySlot {
    Public,
    Private,
}

impl KeySlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeySlot::Public => "public",
            KeySlot::Private => "private",
        }
    }
}

impl fmt::Display for KeySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
