//! Error handling for the application

use solana_sdk::{pubkey::Pubkey, signature::Signature};
use thiserror::Error;

/// Swap pipeline errors
///
/// Every variant names the stage that failed. `Indeterminate` is kept apart
/// from `TransactionFailed`: a transaction whose status is unknown may still
/// land on-chain and must never be reported as a failure.
#[derive(Error, Debug, Clone)]
pub enum SwapError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Quote unavailable: {0}")]
    QuoteUnavailable(String),

    #[error("Swap transaction build failed: {0}")]
    BuildFailed(String),

    #[error("Malformed transaction: {0}")]
    MalformedTransaction(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Submission failed: {0}")]
    SubmissionFailed(String),

    #[error("Transaction {signature} failed: {reason}")]
    TransactionFailed { signature: Signature, reason: String },

    #[error("Transaction {signature} status is indeterminate ({reason}); check it before retrying")]
    Indeterminate { signature: Signature, reason: String },

    #[error("No tokens to sell for mint {0}")]
    NothingToSell(Pubkey),

    #[error("Amount to sell must be specified when not selling all")]
    MissingAmount,

    #[error("Retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<SwapError> },

    #[error("RPC error: {0}")]
    Rpc(String),
}

impl SwapError {
    /// Errors that repeat identically on every attempt.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SwapError::InvalidAmount(_)
                | SwapError::InvalidAddress(_)
                | SwapError::MalformedTransaction(_)
                | SwapError::SigningFailed(_)
                | SwapError::MissingAmount
        )
    }

    /// Submission id of a transaction whose outcome is still unknown.
    pub fn pending_signature(&self) -> Option<&Signature> {
        match self {
            SwapError::Indeterminate { signature, .. } => Some(signature),
            SwapError::RetriesExhausted { last, .. } => last.pending_signature(),
            _ => None,
        }
    }
}
