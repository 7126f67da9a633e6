use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{SealwallError, SealwallResult};

/// RSA modulus sizes the codec accepts
pub const SUPPORTED_KEY_BITS: [usize; 3] = [2048, 3072, 4096];

/// Top-level configuration (loaded from sealwall.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SealwallConfig {
    pub logging: LoggingConfig,
    pub keys: KeysConfig,
    pub codec: CodecConfig,
    pub ledger: LedgerConfig,
    pub inbox: InboxConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStoreBackend {
    /// JSON file holding both halves, rewritten atomically
    File,
    /// Platform keychain (macOS Keychain, Secret Service, Credential Manager)
    Keychain,
    /// Process memory only
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    pub store: KeyStoreBackend,
    /// Key file path for the `file` backend
    pub path: PathBuf,
    /// Base64 SPKI public key of the recipient. Overrides the key store for
    /// encryption, so senders never need a local key pair.
    pub recipient_public_key: Option<String>,
    /// RSA modulus size for newly generated keys (default: 2048)
    pub key_bits: usize,
}

/// How the trailing zero padding of the last word is undone on read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LengthRecovery {
    /// Trim every trailing zero byte; fails when the ciphertext itself ends in zero
    ZeroTrim,
    /// Trim, then round back up to the cipher block boundary
    #[default]
    BlockAligned,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    pub length_recovery: LengthRecovery,
    /// Maximum message length in characters accepted from the user (0 = unlimited)
    pub max_message_chars: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    Fs,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub backend: LedgerBackend,
    /// Root directory for the `fs` backend
    pub root: PathBuf,
    /// Key prefix inside the backend
    pub prefix: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InboxConfig {
    /// Decryption worker threads (0 = available parallelism, capped at 8)
    pub workers: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            store: KeyStoreBackend::File,
            path: PathBuf::from("~/.local/share/sealwall/keys.json"),
            recipient_public_key: None,
            key_bits: 2048,
        }
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            length_recovery: LengthRecovery::BlockAligned,
            max_message_chars: 256,
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backend: LedgerBackend::Fs,
            root: PathBuf::from("~/.local/share/sealwall/ledger"),
            prefix: "sealwall".into(),
        }
    }
}

impl SealwallConfig {
    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> SealwallResult<Self> {
        if !path.exists() {
            tracing::warn!("config file not found: {}  (using defaults)", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| SealwallError::Config(format!("parsing {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SealwallResult<()> {
        if !SUPPORTED_KEY_BITS.contains(&self.keys.key_bits) {
            return Err(SealwallError::Config(format!(
                "keys.key_bits = {} is not supported (expected one of {:?})",
                self.keys.key_bits, SUPPORTED_KEY_BITS
            )));
        }
        if !matches!(self.logging.format.as_str(), "json" | "text") {
            return Err(SealwallError::Config(format!(
                "logging.format = {:?} (expected \"json\" or \"text\")",
                self.logging.format
            )));
        }
        Ok(())
    }
}

/// Expand `~/` in a path to the user's home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(rest) = path.to_str().and_then(|s| s.strip_prefix("~/")) {
        let home = std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"));
        return home.join(rest);
    }
    path.to_path_buf()
}
