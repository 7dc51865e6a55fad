//! Test doubles for the ledger, aggregator and token registry seams

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use futures::{FutureExt, StreamExt};
use serde_json::json;
use solana_sdk::{
    message::{Message, VersionedMessage},
    pubkey::Pubkey,
    signature::Signature,
    system_instruction,
    transaction::VersionedTransaction,
};

use crate::domain::ledger::{
    ConfirmationDepth, Ledger, SendOptions, SignatureNotification, SignatureStatus, SignatureSubscription,
    TokenAccountBalance,
};
use crate::domain::swap::{Quote, QuoteRequest, SwapApi, UnsignedTransaction};
use crate::domain::wallet::TokenRegistry;
use crate::shared::errors::SwapError;

/// Unsigned single-signer transfer paid by `payer`, encoded like an aggregator response
pub fn unsigned_transfer(payer: &Pubkey) -> UnsignedTransaction {
    let instruction = system_instruction::transfer(payer, &Pubkey::new_unique(), 1_000);
    let message = Message::new(&[instruction], Some(payer));
    let transaction = VersionedTransaction {
        signatures: vec![Signature::default()],
        message: VersionedMessage::Legacy(message),
    };
    let bytes = bincode::serialize(&transaction).expect("serialize transaction");
    UnsignedTransaction::new(BASE64.encode(bytes))
}

/// In-memory ledger recording every side-effecting call
#[derive(Default)]
pub struct MockLedger {
    pub token_accounts: Mutex<Vec<TokenAccountBalance>>,
    pub mint_decimals: Mutex<HashMap<Pubkey, u8>>,
    pub native_balance: AtomicU64,
    /// Served in order; the last entry repeats
    pub statuses: Mutex<VecDeque<Option<SignatureStatus>>>,
    /// `None` keeps the notification stream pending forever
    pub notifications: Mutex<Option<Vec<SignatureNotification>>>,
    pub fail_subscribe: AtomicBool,
    pub fail_send: AtomicBool,
    pub sent: Mutex<Vec<VersionedTransaction>>,
    pub rpc_calls: AtomicUsize,
    pub status_queries: AtomicUsize,
    pub subscriptions: AtomicUsize,
    pub unsubscribed: Arc<AtomicUsize>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(self, status: SignatureStatus) -> Self {
        self.statuses.lock().unwrap().push_back(Some(status));
        self
    }

    pub fn with_statuses(self, statuses: Vec<Option<SignatureStatus>>) -> Self {
        self.statuses.lock().unwrap().extend(statuses);
        self
    }

    pub fn with_notifications(self, notifications: Vec<SignatureNotification>) -> Self {
        *self.notifications.lock().unwrap() = Some(notifications);
        self
    }

    pub fn with_token_account(self, mint: Pubkey, amount: u64, decimals: u8) -> Self {
        self.token_accounts.lock().unwrap().push(TokenAccountBalance {
            address: Pubkey::new_unique(),
            mint,
            amount,
            decimals,
        });
        self.mint_decimals.lock().unwrap().insert(mint, decimals);
        self
    }

    pub fn with_mint(self, mint: Pubkey, decimals: u8) -> Self {
        self.mint_decimals.lock().unwrap().insert(mint, decimals);
        self
    }

    pub fn sent_signatures(&self) -> Vec<Signature> {
        self.sent.lock().unwrap().iter().map(|tx| tx.signatures[0]).collect()
    }

    fn next_status(&self) -> Option<SignatureStatus> {
        let mut statuses = self.statuses.lock().unwrap();
        if statuses.len() > 1 {
            statuses.pop_front().flatten()
        } else {
            statuses.front().cloned().flatten()
        }
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn get_mint_decimals(&self, mint: &Pubkey) -> Result<u8, SwapError> {
        self.rpc_calls.fetch_add(1, Ordering::SeqCst);
        self.mint_decimals
            .lock()
            .unwrap()
            .get(mint)
            .copied()
            .ok_or_else(|| SwapError::Rpc(format!("mint {} not found", mint)))
    }

    async fn get_token_accounts(&self, _owner: &Pubkey) -> Result<Vec<TokenAccountBalance>, SwapError> {
        self.rpc_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.token_accounts.lock().unwrap().clone())
    }

    async fn get_native_balance(&self, _owner: &Pubkey) -> Result<u64, SwapError> {
        self.rpc_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.native_balance.load(Ordering::SeqCst))
    }

    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
        _options: &SendOptions,
    ) -> Result<Signature, SwapError> {
        self.rpc_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(SwapError::SubmissionFailed("preflight check failed".to_string()));
        }
        self.sent.lock().unwrap().push(transaction.clone());
        Ok(transaction.signatures[0])
    }

    async fn get_signature_status(&self, _signature: &Signature) -> Result<Option<SignatureStatus>, SwapError> {
        self.rpc_calls.fetch_add(1, Ordering::SeqCst);
        self.status_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.next_status())
    }

    async fn subscribe_signature<'a>(
        &'a self,
        _signature: &Signature,
        _depth: ConfirmationDepth,
    ) -> Result<SignatureSubscription<'a>, SwapError> {
        self.rpc_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(SwapError::Rpc("websocket unavailable".to_string()));
        }
        self.subscriptions.fetch_add(1, Ordering::SeqCst);

        let notifications = match self.notifications.lock().unwrap().clone() {
            Some(notifications) => futures::stream::iter(notifications).boxed(),
            None => futures::stream::pending::<SignatureNotification>().boxed(),
        };
        let released = self.unsubscribed.clone();

        Ok(SignatureSubscription::new(
            notifications,
            Box::new(move || {
                async move {
                    released.fetch_add(1, Ordering::SeqCst);
                }
                .boxed()
            }),
        ))
    }
}

/// Aggregator double quoting 1:2 and returning a transfer paid by `payer`
pub struct MockSwapApi {
    pub payer: Pubkey,
    pub quote_requests: Mutex<Vec<QuoteRequest>>,
    pub builds: AtomicUsize,
    pub fail_quote: AtomicBool,
}

impl MockSwapApi {
    pub fn new(payer: Pubkey) -> Self {
        Self {
            payer,
            quote_requests: Mutex::new(Vec::new()),
            builds: AtomicUsize::new(0),
            fail_quote: AtomicBool::new(false),
        }
    }

    pub fn requests(&self) -> Vec<QuoteRequest> {
        self.quote_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SwapApi for MockSwapApi {
    async fn get_quote(&self, request: &QuoteRequest) -> Result<Quote, SwapError> {
        self.quote_requests.lock().unwrap().push(request.clone());
        if self.fail_quote.load(Ordering::SeqCst) {
            return Err(SwapError::QuoteUnavailable("no route found".to_string()));
        }
        Ok(Quote {
            input_mint: request.input_mint,
            output_mint: request.output_mint,
            in_amount: request.amount,
            out_amount: request.amount * 2,
            price_impact_pct: 0.0,
            slippage_bps: request.slippage_bps()?,
            route: json!({ "inAmount": request.amount.to_string() }),
        })
    }

    async fn build_swap_transaction(
        &self,
        _quote: &Quote,
        _wallet: &Pubkey,
    ) -> Result<UnsignedTransaction, SwapError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        Ok(unsigned_transfer(&self.payer))
    }
}

/// Fixed token registry
#[derive(Default)]
pub struct StaticRegistry {
    pub names: HashMap<Pubkey, String>,
    pub fail: bool,
    pub lookups: AtomicUsize,
}

#[async_trait]
impl TokenRegistry for StaticRegistry {
    async fn token_names(&self) -> Result<HashMap<Pubkey, String>, SwapError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SwapError::Rpc("token list unavailable".to_string()));
        }
        Ok(self.names.clone())
    }
}
