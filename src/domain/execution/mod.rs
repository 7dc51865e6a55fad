//! Execution domain - signing, submission and outcome resolution

mod finalizer;

pub use finalizer::TransactionFinalizer;

use std::time::Duration;

use solana_sdk::signature::Signature;

use crate::domain::ledger::{ConfirmationDepth, SendOptions};
use crate::shared::errors::SwapError;

/// Resolved state of a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionOutcome {
    /// Included in the ledger without error
    Confirmed,
    /// Included in the ledger, execution errored
    Failed { reason: String },
    /// Status unknown; the transaction may still land
    Indeterminate { reason: String },
}

impl TransactionOutcome {
    pub fn into_result(self, signature: Signature) -> Result<Signature, SwapError> {
        match self {
            TransactionOutcome::Confirmed => Ok(signature),
            TransactionOutcome::Failed { reason } => Err(SwapError::TransactionFailed { signature, reason }),
            TransactionOutcome::Indeterminate { reason } => Err(SwapError::Indeterminate { signature, reason }),
        }
    }
}

/// How a submitted transaction's outcome is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationPolicy {
    /// Query the status once, right after submission
    Poll,
    /// Wait for a status-change notification at `depth`, at most `timeout`
    Subscribe {
        depth: ConfirmationDepth,
        timeout: Duration,
    },
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        ConfirmationPolicy::Subscribe {
            depth: ConfirmationDepth::Finalized,
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalizerConfig {
    pub policy: ConfirmationPolicy,
    pub send: SendOptions,
}
