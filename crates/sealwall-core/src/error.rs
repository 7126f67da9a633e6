use thiserror::Error;

pub type SealwallResult<T> = Result<T, SealwallError>;

#[derive(Debug, Error)]
pub enum SealwallError {
    #[error("key store error: {0}")]
    KeyStore(String),

    #[error("ledger error: {0}")]
    Ledger(String),

    #[error("format error: {0}")]
    Format(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
