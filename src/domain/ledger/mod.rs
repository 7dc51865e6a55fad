//! Ledger domain - the RPC operations the swap pipeline relies on

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::StreamExt;
use solana_sdk::{pubkey::Pubkey, signature::Signature, transaction::VersionedTransaction};
use tracing::warn;

use crate::shared::errors::SwapError;

/// Confirmation depth of a submitted transaction, shallowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfirmationDepth {
    Processed,
    Confirmed,
    Finalized,
}

impl ConfirmationDepth {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfirmationDepth::Processed => "processed",
            ConfirmationDepth::Confirmed => "confirmed",
            ConfirmationDepth::Finalized => "finalized",
        }
    }
}

impl std::str::FromStr for ConfirmationDepth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "processed" => Ok(ConfirmationDepth::Processed),
            "confirmed" => Ok(ConfirmationDepth::Confirmed),
            "finalized" => Ok(ConfirmationDepth::Finalized),
            _ => Err(format!("Unknown commitment level: {}", s)),
        }
    }
}

/// Status the ledger reports for a submitted signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureStatus {
    pub slot: u64,
    /// Execution error, if the transaction was included but failed
    pub err: Option<String>,
    pub confirmation: ConfirmationDepth,
}

/// Status-change notification delivered through a subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureNotification {
    pub slot: u64,
    pub err: Option<String>,
}

/// Options for raw transaction submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOptions {
    pub skip_preflight: bool,
    pub preflight_commitment: ConfirmationDepth,
    /// Node-side rebroadcast budget; `None` leaves it to the node
    pub max_retries: Option<usize>,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            skip_preflight: false,
            preflight_commitment: ConfirmationDepth::Confirmed,
            max_retries: None,
        }
    }
}

/// One SPL token account owned by a wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAccountBalance {
    pub address: Pubkey,
    pub mint: Pubkey,
    pub amount: u64,
    pub decimals: u8,
}

/// Releases a subscription on the node side
pub type UnsubscribeFn = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// Live registration for status-change notifications of one signature.
///
/// Holders should await [`unsubscribe`] on the normal path. A subscription
/// dropped without it, e.g. by a cancelled wait, releases the registration
/// on a spawned task.
///
/// [`unsubscribe`]: SignatureSubscription::unsubscribe
pub struct SignatureSubscription<'a> {
    notifications: BoxStream<'a, SignatureNotification>,
    unsubscribe: Option<UnsubscribeFn>,
}

impl<'a> SignatureSubscription<'a> {
    pub fn new(notifications: BoxStream<'a, SignatureNotification>, unsubscribe: UnsubscribeFn) -> Self {
        Self {
            notifications,
            unsubscribe: Some(unsubscribe),
        }
    }

    /// Next notification, or `None` once the node closed the stream
    pub async fn next_notification(&mut self) -> Option<SignatureNotification> {
        self.notifications.next().await
    }

    pub async fn unsubscribe(mut self) {
        let release = self.unsubscribe.take();
        drop(self);
        if let Some(release) = release {
            release().await;
        }
    }
}

impl Drop for SignatureSubscription<'_> {
    fn drop(&mut self) {
        let Some(release) = self.unsubscribe.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(release());
            }
            Err(_) => warn!("⚠️ Signature subscription dropped outside a runtime, left open"),
        }
    }
}

/// Ledger RPC seam.
///
/// Implementations hold a single connection handle that is read-only after
/// construction, so one ledger can serve concurrent independent swaps.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn get_mint_decimals(&self, mint: &Pubkey) -> Result<u8, SwapError>;

    /// All SPL token accounts owned by `owner`, zero balances included
    async fn get_token_accounts(&self, owner: &Pubkey) -> Result<Vec<TokenAccountBalance>, SwapError>;

    /// Native balance in lamports
    async fn get_native_balance(&self, owner: &Pubkey) -> Result<u64, SwapError>;

    /// Submit signed transaction bytes. Not idempotent.
    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
        options: &SendOptions,
    ) -> Result<Signature, SwapError>;

    /// Current status, `None` if the ledger does not know the signature
    async fn get_signature_status(&self, signature: &Signature) -> Result<Option<SignatureStatus>, SwapError>;

    async fn subscribe_signature<'a>(
        &'a self,
        signature: &Signature,
        depth: ConfirmationDepth,
    ) -> Result<SignatureSubscription<'a>, SwapError>;
}
