//! Key pair in a local JSON file.
//!
//! ```json
//! { "public": "<base64 SPKI>", "private": "<base64 PKCS8>" }
//! ```
//!
//! Every write replaces the whole file through a temp file and a rename, so
//! readers see either the old pair or the new one.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use sealwall_core::{KeySlot, KeyStore, SealwallError, SealwallResult};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

#[derive(Debug, Default, Serialize, Deserialize)]
struct KeyFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    public: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    private: Option<String>,
}

impl KeyFile {
    fn slot_mut(&mut self, slot: KeySlot) -> &mut Option<String> {
        match slot {
            KeySlot::Public => &mut self.public,
            KeySlot::Private => &mut self.private,
        }
    }
}

impl Drop for KeyFile {
    fn drop(&mut self) {
        if let Some(private) = self.private.as_mut() {
            private.zeroize();
        }
    }
}

pub struct FileKeyStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileKeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<KeyFile> {
        if !self.path.exists() {
            return Ok(KeyFile::default());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading key file: {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("parsing key file: {}", self.path.display()))
    }

    fn save(&self, keys: &KeyFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating key dir: {}", parent.display()))?;
        }

        let mut json = serde_json::to_string_pretty(keys).context("serializing key file")?;
        let tmp_path = self.path.with_extension("tmp");
        let written = write_private(&tmp_path, &json);
        json.zeroize();
        written.with_context(|| format!("writing key file temp: {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("renaming key file: {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), "key file written");
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut KeyFile)) -> SealwallResult<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| SealwallError::KeyStore("key file lock poisoned".into()))?;
        let mut keys = self.load().map_err(store_error)?;
        apply(&mut keys);
        self.save(&keys).map_err(store_error)
    }
}

/// Create `path` readable by the owner only and write `content` to it.
fn write_private(path: &Path, content: &str) -> std::io::Result<()> {
    use std::io::Write;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()
}

fn store_error(e: anyhow::Error) -> SealwallError {
    SealwallError::KeyStore(format!("{e:#}"))
}

impl KeyStore for FileKeyStore {
    fn put(&self, slot: KeySlot, value: &str) -> SealwallResult<()> {
        self.update(|keys| *keys.slot_mut(slot) = Some(value.to_string()))
    }

    fn get(&self, slot: KeySlot) -> SealwallResult<Option<String>> {
        let mut keys = self.load().map_err(store_error)?;
        Ok(keys.slot_mut(slot).take())
    }

    fn put_pair(&self, public: &str, private: &str) -> SealwallResult<()> {
        self.update(|keys| {
            keys.public = Some(public.to_string());
            keys.private = Some(private.to_string());
        })
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}
