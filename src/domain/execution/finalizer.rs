//! Transaction finalizer: Built -> Signed -> Submitted -> {Confirmed | Failed | Indeterminate}

use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use solana_sdk::{
    signature::{Keypair, Signature},
    transaction::VersionedTransaction,
};
use tracing::{debug, error, info, warn};

use super::{ConfirmationPolicy, FinalizerConfig, TransactionOutcome};
use crate::domain::ledger::{ConfirmationDepth, Ledger};
use crate::domain::swap::UnsignedTransaction;
use crate::shared::errors::SwapError;

/// Signs, submits and resolves aggregator-built transactions.
///
/// A transaction is submitted at most once per [`finalize`] call. Once
/// submitted, only its signature is ever polled again; it is never re-signed.
///
/// [`finalize`]: TransactionFinalizer::finalize
pub struct TransactionFinalizer {
    ledger: Arc<dyn Ledger>,
    config: FinalizerConfig,
}

impl TransactionFinalizer {
    pub fn new(ledger: Arc<dyn Ledger>, config: FinalizerConfig) -> Self {
        Self { ledger, config }
    }

    pub fn config(&self) -> &FinalizerConfig {
        &self.config
    }

    /// Run the whole pipeline and map the outcome to a result
    pub async fn finalize(
        &self,
        unsigned: &UnsignedTransaction,
        signer: &Keypair,
    ) -> Result<Signature, SwapError> {
        let transaction = self.sign(unsigned, signer)?;
        let signature = self.submit(&transaction).await?;
        let outcome = self.resolve(&signature).await;

        match &outcome {
            TransactionOutcome::Confirmed => info!("✅ Transaction {} confirmed", signature),
            TransactionOutcome::Failed { reason } => error!("❌ Transaction {} failed: {}", signature, reason),
            TransactionOutcome::Indeterminate { reason } => {
                warn!("⚠️ Transaction {} indeterminate: {}", signature, reason)
            }
        }

        outcome.into_result(signature)
    }

    /// Decode the aggregator blob and attach the wallet's signature
    pub fn sign(
        &self,
        unsigned: &UnsignedTransaction,
        signer: &Keypair,
    ) -> Result<VersionedTransaction, SwapError> {
        let bytes = BASE64
            .decode(unsigned.base64.trim())
            .map_err(|e| SwapError::MalformedTransaction(format!("invalid base64: {}", e)))?;

        let transaction: VersionedTransaction = bincode::deserialize(&bytes)
            .map_err(|e| SwapError::MalformedTransaction(format!("cannot deserialize transaction: {}", e)))?;

        let required = transaction.message.header().num_required_signatures;
        if required != 1 {
            return Err(SwapError::SigningFailed(format!(
                "expected exactly one required signature, transaction requires {}",
                required
            )));
        }

        let signed = VersionedTransaction::try_new(transaction.message, &[signer])
            .map_err(|e| SwapError::SigningFailed(e.to_string()))?;

        debug!("Signed transaction {}", signed.signatures[0]);
        Ok(signed)
    }

    pub async fn submit(&self, transaction: &VersionedTransaction) -> Result<Signature, SwapError> {
        let signature = self.ledger.send_transaction(transaction, &self.config.send).await?;
        info!("🚀 Transaction sent with signature: {}", signature);
        Ok(signature)
    }

    /// Resolve a submitted signature with the configured policy
    pub async fn resolve(&self, signature: &Signature) -> TransactionOutcome {
        match self.config.policy {
            ConfirmationPolicy::Poll => self.poll_once(signature).await,
            ConfirmationPolicy::Subscribe { depth, timeout } => {
                self.await_notification(signature, depth, timeout).await
            }
        }
    }

    /// Re-check a signature that previously resolved indeterminate
    pub async fn check_status(&self, signature: &Signature) -> TransactionOutcome {
        match self.config.policy {
            ConfirmationPolicy::Poll => self.poll_once(signature).await,
            ConfirmationPolicy::Subscribe { depth, .. } => self.check_status_at(signature, depth).await,
        }
    }

    async fn poll_once(&self, signature: &Signature) -> TransactionOutcome {
        match self.ledger.get_signature_status(signature).await {
            Ok(Some(status)) => match status.err {
                None => TransactionOutcome::Confirmed,
                Some(reason) => TransactionOutcome::Failed { reason },
            },
            Ok(None) => TransactionOutcome::Indeterminate {
                reason: "signature status not available yet".to_string(),
            },
            Err(e) => TransactionOutcome::Indeterminate {
                reason: format!("status query failed: {}", e),
            },
        }
    }

    async fn await_notification(
        &self,
        signature: &Signature,
        depth: ConfirmationDepth,
        timeout: Duration,
    ) -> TransactionOutcome {
        let mut subscription = match self.ledger.subscribe_signature(signature, depth).await {
            Ok(subscription) => subscription,
            Err(e) => {
                warn!("Signature subscription for {} failed: {}; polling instead", signature, e);
                return self.check_status_at(signature, depth).await;
            }
        };

        let waited = tokio::time::timeout(timeout, subscription.next_notification()).await;
        subscription.unsubscribe().await;

        match waited {
            Ok(Some(notification)) => match notification.err {
                None => TransactionOutcome::Confirmed,
                Some(reason) if depth >= ConfirmationDepth::Confirmed => TransactionOutcome::Failed { reason },
                Some(reason) => TransactionOutcome::Indeterminate {
                    reason: format!("error reported at {} depth only: {}", depth.as_str(), reason),
                },
            },
            Ok(None) => {
                debug!("Notification stream for {} closed, polling status", signature);
                self.check_status_at(signature, depth).await
            }
            Err(_) => {
                warn!(
                    "⏰ No {} notification for {} within {:?}, polling status",
                    depth.as_str(),
                    signature,
                    timeout
                );
                self.check_status_at(signature, depth).await
            }
        }
    }

    /// A missing status is not a failure: the transaction may still land.
    async fn check_status_at(&self, signature: &Signature, depth: ConfirmationDepth) -> TransactionOutcome {
        match self.ledger.get_signature_status(signature).await {
            Ok(Some(status)) => match status.err {
                None if status.confirmation >= depth => TransactionOutcome::Confirmed,
                Some(reason) if status.confirmation >= ConfirmationDepth::Confirmed => {
                    TransactionOutcome::Failed { reason }
                }
                None => TransactionOutcome::Indeterminate {
                    reason: format!(
                        "reached {} but not {}",
                        status.confirmation.as_str(),
                        depth.as_str()
                    ),
                },
                Some(reason) => TransactionOutcome::Indeterminate {
                    reason: format!(
                        "error reported at {} depth only: {}",
                        status.confirmation.as_str(),
                        reason
                    ),
                },
            },
            Ok(None) => TransactionOutcome::Indeterminate {
                reason: "no status observed".to_string(),
            },
            Err(e) => TransactionOutcome::Indeterminate {
                reason: format!("status query failed: {}", e),
            },
        }
    }
}
