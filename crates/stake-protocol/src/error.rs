use thiserror::Error;

/// Protocol-layer errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("derivation error: {0}")]
    Derivation(String),

    #[error("layout error: {0}")]
    Layout(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("transaction build error: {0}")]
    TransactionBuild(String),

    #[error("signing error: {0}")]
    Signing(String),
}
