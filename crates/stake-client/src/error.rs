use stake_protocol::ProtocolError;
use thiserror::Error;

/// Client-side operation errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The account does not exist on chain yet. Expected on first contact;
    /// callers typically fall back to defaults or create the account.
    #[error("account not found: {address}")]
    AccountNotFound { address: String },

    /// Submission was rejected (stale blockhash, insufficient funds,
    /// simulation failure). Retryable by re-assembling with a fresh
    /// blockhash; retry policy is the caller's.
    #[error("submission failed: {0}")]
    Submission(String),

    /// The transaction was accepted but confirmation was not observed in
    /// time. The outcome is ambiguous: re-query account state instead of
    /// resubmitting.
    #[error("confirmation timed out for signature {signature}")]
    ConfirmationTimeout { signature: String },

    /// Transport-level RPC failure.
    #[error("rpc error: {0}")]
    Rpc(String),
}

impl ClientError {
    /// Whether re-assembling with a fresh blockhash and resubmitting is a
    /// sound response to this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Submission(_) | ClientError::Rpc(_))
    }
}
