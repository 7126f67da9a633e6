//! OpenDAL Operator factory for ledger backends

use anyhow::{Context, Result};
use opendal::Operator;
use sealwall_core::config::{expand_tilde, LedgerBackend, LedgerConfig};

/// Build the operator selected by `[ledger] backend`.
pub fn build_operator(cfg: &LedgerConfig) -> Result<Operator> {
    let op = match cfg.backend {
        LedgerBackend::Fs => {
            let root = expand_tilde(&cfg.root);
            std::fs::create_dir_all(&root)
                .with_context(|| format!("creating ledger root: {}", root.display()))?;
            let root = root
                .to_str()
                .with_context(|| format!("ledger root is not UTF-8: {}", root.display()))?
                .to_string();
            Operator::new(opendal::services::Fs::default().root(&root))
                .context("creating OpenDAL fs operator")?
                .layer(opendal::layers::LoggingLayer::default())
                .finish()
        }
        LedgerBackend::Memory => memory_operator()?,
    };
    tracing::debug!(backend = ?cfg.backend, "ledger operator ready");
    Ok(op)
}

/// In-process operator; contents vanish with the last clone.
pub fn memory_operator() -> Result<Operator> {
    Ok(Operator::new(opendal::services::Memory::default())
        .context("creating OpenDAL memory operator")?
        .finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_fs_operator_creates_root() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = LedgerConfig {
            backend: LedgerBackend::Fs,
            root: tmp.path().join("ledger"),
            ..Default::default()
        };
        let op = build_operator(&cfg);
        assert!(op.is_ok(), "operator construction should succeed");
        assert!(tmp.path().join("ledger").is_dir());
    }

    #[test]
    fn test_build_memory_operator() {
        let cfg = LedgerConfig {
            backend: LedgerBackend::Memory,
            ..Default::default()
        };
        assert!(build_operator(&cfg).is_ok());
    }
}
