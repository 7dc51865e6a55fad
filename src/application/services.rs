//! Application services and use cases

use std::future::Future;
use std::sync::Arc;

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::domain::execution::{FinalizerConfig, TransactionFinalizer, TransactionOutcome};
use crate::domain::ledger::Ledger;
use crate::domain::swap::{QuoteRequest, SwapApi, DEFAULT_SLIPPAGE_PERCENT};
use crate::domain::wallet::{BalanceReader, TokenRegistry, WalletTokens};
use crate::shared::errors::SwapError;
use crate::shared::retry::{with_retries, RetryPolicy};
use crate::shared::types::{native_mint, Amount, NATIVE_DECIMALS};
use crate::shared::utils::to_base_units;

/// Spend native SOL on a token
#[derive(Debug, Clone, PartialEq)]
pub struct BuyRequest {
    pub mint: Pubkey,
    /// SOL to spend, in whole units
    pub amount_sol: f64,
    pub slippage_percent: f64,
}

impl BuyRequest {
    pub fn new(mint: Pubkey, amount_sol: f64) -> Self {
        Self {
            mint,
            amount_sol,
            slippage_percent: DEFAULT_SLIPPAGE_PERCENT,
        }
    }
}

/// Sell a token for native SOL
#[derive(Debug, Clone, PartialEq)]
pub struct SellRequest {
    pub mint: Pubkey,
    pub slippage_percent: f64,
    /// Sell the full balance read right before quoting
    pub sell_all: bool,
    /// Whole-token amount, required unless `sell_all`
    pub amount: Option<f64>,
}

impl SellRequest {
    pub fn all(mint: Pubkey) -> Self {
        Self {
            mint,
            slippage_percent: DEFAULT_SLIPPAGE_PERCENT,
            sell_all: true,
            amount: None,
        }
    }

    pub fn amount(mint: Pubkey, amount: f64) -> Self {
        Self {
            mint,
            slippage_percent: DEFAULT_SLIPPAGE_PERCENT,
            sell_all: false,
            amount: Some(amount),
        }
    }
}

/// Swap and balance operations over a ledger and an aggregator.
///
/// Holds no per-wallet state; the signing key is passed to every swap.
pub struct SwapService {
    ledger: Arc<dyn Ledger>,
    swap_api: Arc<dyn SwapApi>,
    finalizer: TransactionFinalizer,
    balances: BalanceReader,
}

impl SwapService {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        swap_api: Arc<dyn SwapApi>,
        registry: Arc<dyn TokenRegistry>,
        finalizer_config: FinalizerConfig,
    ) -> Self {
        Self {
            finalizer: TransactionFinalizer::new(Arc::clone(&ledger), finalizer_config),
            balances: BalanceReader::new(Arc::clone(&ledger), registry),
            ledger,
            swap_api,
        }
    }

    /// Buy `request.mint` with native SOL
    pub async fn buy_token(&self, wallet: &Keypair, request: &BuyRequest) -> Result<Signature, SwapError> {
        let amount = to_base_units(request.amount_sol, NATIVE_DECIMALS)?;
        if amount == 0 {
            return Err(SwapError::InvalidAmount(format!(
                "{} SOL is less than one lamport",
                request.amount_sol
            )));
        }

        info!("🛒 Buying {} with {} SOL", request.mint, request.amount_sol);
        let quote_request = QuoteRequest::new(native_mint(), request.mint, amount, request.slippage_percent);
        self.swap(wallet, &quote_request).await
    }

    /// Sell `request.mint` for native SOL
    pub async fn sell_token(&self, wallet: &Keypair, request: &SellRequest) -> Result<Signature, SwapError> {
        let amount = match (request.sell_all, request.amount) {
            (true, _) => {
                let balance = self.balances.get_balance(&wallet.pubkey(), &request.mint).await?;
                info!("💼 Selling full balance of {}: {}", request.mint, balance);
                balance.value
            }
            (false, Some(amount)) => {
                let decimals = self.ledger.get_mint_decimals(&request.mint).await?;
                to_base_units(amount, decimals)?
            }
            (false, None) => return Err(SwapError::MissingAmount),
        };

        if amount == 0 {
            return Err(SwapError::NothingToSell(request.mint));
        }

        info!("💸 Selling {} base units of {}", amount, request.mint);
        let quote_request = QuoteRequest::new(request.mint, native_mint(), amount, request.slippage_percent);
        self.swap(wallet, &quote_request).await
    }

    pub async fn buy_token_with_retries(
        &self,
        wallet: &Keypair,
        request: &BuyRequest,
        policy: &RetryPolicy,
    ) -> Result<Signature, SwapError> {
        let pending = Mutex::new(None);
        with_retries(policy, |_| self.guarded(&pending, || self.buy_token(wallet, request))).await
    }

    pub async fn sell_token_with_retries(
        &self,
        wallet: &Keypair,
        request: &SellRequest,
        policy: &RetryPolicy,
    ) -> Result<Signature, SwapError> {
        let pending = Mutex::new(None);
        with_retries(policy, |_| self.guarded(&pending, || self.sell_token(wallet, request))).await
    }

    pub async fn get_balance_of_token(&self, wallet: &Pubkey, mint: &Pubkey) -> Result<Amount, SwapError> {
        self.balances.get_balance(wallet, mint).await
    }

    pub async fn get_all_balances(&self, wallet: &Pubkey) -> Result<WalletTokens, SwapError> {
        self.balances.get_all_balances(wallet).await
    }

    pub async fn get_sol_balance(&self, wallet: &Pubkey) -> Result<Amount, SwapError> {
        self.balances.get_sol_balance(wallet).await
    }

    /// Quote, build and finalize
    async fn swap(&self, wallet: &Keypair, quote_request: &QuoteRequest) -> Result<Signature, SwapError> {
        quote_request.slippage_bps()?;
        let quote = self.swap_api.get_quote(quote_request).await?;
        let unsigned = self
            .swap_api
            .build_swap_transaction(&quote, &wallet.pubkey())
            .await?;
        self.finalizer.finalize(&unsigned, wallet).await
    }

    /// One retry attempt. A signature left indeterminate by an earlier
    /// attempt is re-checked first and never submitted again.
    async fn guarded<F, Fut>(&self, pending: &Mutex<Option<Signature>>, swap: F) -> Result<Signature, SwapError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Signature, SwapError>>,
    {
        let mut pending = pending.lock().await;

        if let Some(signature) = *pending {
            match self.finalizer.check_status(&signature).await {
                TransactionOutcome::Confirmed => {
                    info!("✅ Earlier submission {} confirmed", signature);
                    *pending = None;
                    return Ok(signature);
                }
                TransactionOutcome::Failed { reason } => {
                    warn!("Earlier submission {} failed ({}), swapping again", signature, reason);
                    *pending = None;
                }
                TransactionOutcome::Indeterminate { reason } => {
                    return Err(SwapError::Indeterminate { signature, reason });
                }
            }
        }

        let result = swap().await;
        if let Err(e) = &result {
            *pending = e.pending_signature().copied();
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::execution::ConfirmationPolicy;
    use crate::domain::ledger::{ConfirmationDepth, SendOptions, SignatureStatus};
    use crate::test_support::{MockLedger, MockSwapApi, StaticRegistry};
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    struct Harness {
        ledger: Arc<MockLedger>,
        api: Arc<MockSwapApi>,
        wallet: Keypair,
        service: SwapService,
    }

    fn harness(ledger: MockLedger) -> Harness {
        let wallet = Keypair::new();
        let ledger = Arc::new(ledger);
        let api = Arc::new(MockSwapApi::new(wallet.pubkey()));
        let config = FinalizerConfig {
            policy: ConfirmationPolicy::Poll,
            send: SendOptions::default(),
        };
        let service = SwapService::new(
            ledger.clone(),
            api.clone(),
            Arc::new(StaticRegistry::default()),
            config,
        );
        Harness {
            ledger,
            api,
            wallet,
            service,
        }
    }

    fn landed() -> SignatureStatus {
        SignatureStatus {
            slot: 1,
            err: None,
            confirmation: ConfirmationDepth::Finalized,
        }
    }

    fn fast_retries() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_buy_spends_native_base_units() {
        let h = harness(MockLedger::new().with_status(landed()));
        let mint = Pubkey::new_unique();

        let signature = h.service.buy_token(&h.wallet, &BuyRequest::new(mint, 0.001)).await.unwrap();

        let requests = h.api.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].input_mint, native_mint());
        assert_eq!(requests[0].output_mint, mint);
        assert_eq!(requests[0].amount, 1_000_000);
        assert_eq!(requests[0].slippage_percent, 1.0);
        assert_eq!(h.ledger.sent_signatures(), vec![signature]);
    }

    #[tokio::test]
    async fn test_buy_dust_is_rejected() {
        let h = harness(MockLedger::new());

        let result = h
            .service
            .buy_token(&h.wallet, &BuyRequest::new(Pubkey::new_unique(), 0.0000000001))
            .await;

        assert!(matches!(result, Err(SwapError::InvalidAmount(_))));
        assert!(h.api.requests().is_empty());
    }

    #[tokio::test]
    async fn test_sell_all_uses_current_balance() {
        let mint = Pubkey::new_unique();
        let h = harness(
            MockLedger::new()
                .with_token_account(mint, 13_880_000, 6)
                .with_status(landed()),
        );

        let balance = h.service.get_balance_of_token(&h.wallet.pubkey(), &mint).await.unwrap();
        assert_eq!(balance.ui_amount(), 13.88);

        h.service.sell_token(&h.wallet, &SellRequest::all(mint)).await.unwrap();

        let requests = h.api.requests();
        assert_eq!(requests[0].input_mint, mint);
        assert_eq!(requests[0].output_mint, native_mint());
        assert_eq!(requests[0].amount, balance.value);
    }

    #[tokio::test]
    async fn test_sell_all_with_zero_balance() {
        let mint = Pubkey::new_unique();
        let h = harness(MockLedger::new().with_token_account(mint, 0, 6));

        let result = h.service.sell_token(&h.wallet, &SellRequest::all(mint)).await;

        assert!(matches!(result, Err(SwapError::NothingToSell(m)) if m == mint));
        assert!(h.api.requests().is_empty());
        assert!(h.ledger.sent_signatures().is_empty());
    }

    #[tokio::test]
    async fn test_sell_all_of_unheld_unknown_mint() {
        let mint = Pubkey::new_unique();
        let h = harness(MockLedger::new());

        let result = h.service.sell_token(&h.wallet, &SellRequest::all(mint)).await;

        assert!(matches!(result, Err(SwapError::NothingToSell(m)) if m == mint));
        assert!(h.api.requests().is_empty());
    }

    #[tokio::test]
    async fn test_sell_without_amount_makes_no_network_call() {
        let h = harness(MockLedger::new());
        let request = SellRequest {
            mint: Pubkey::new_unique(),
            slippage_percent: 1.0,
            sell_all: false,
            amount: None,
        };

        let result = h.service.sell_token(&h.wallet, &request).await;

        assert!(matches!(result, Err(SwapError::MissingAmount)));
        assert_eq!(h.ledger.rpc_calls.load(Ordering::SeqCst), 0);
        assert!(h.api.requests().is_empty());
    }

    #[tokio::test]
    async fn test_sell_explicit_amount_uses_mint_decimals() {
        let mint = Pubkey::new_unique();
        let h = harness(MockLedger::new().with_mint(mint, 2).with_status(landed()));

        h.service
            .sell_token(&h.wallet, &SellRequest::amount(mint, 0.29))
            .await
            .unwrap();

        assert_eq!(h.api.requests()[0].amount, 29);
    }

    #[tokio::test]
    async fn test_retry_rechecks_indeterminate_signature() {
        let h = harness(MockLedger::new().with_statuses(vec![None, Some(landed())]));

        let signature = h
            .service
            .buy_token_with_retries(&h.wallet, &BuyRequest::new(Pubkey::new_unique(), 0.5), &fast_retries())
            .await
            .unwrap();

        assert_eq!(h.ledger.sent_signatures(), vec![signature]);
        assert_eq!(h.api.requests().len(), 1);
        assert_eq!(h.ledger.status_queries.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_never_resubmits_unknown_signature() {
        let h = harness(MockLedger::new());

        let result = h
            .service
            .buy_token_with_retries(&h.wallet, &BuyRequest::new(Pubkey::new_unique(), 0.5), &fast_retries())
            .await;

        match result {
            Err(SwapError::RetriesExhausted { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert_eq!(last.pending_signature(), h.ledger.sent_signatures().first());
            }
            other => panic!("expected RetriesExhausted, got {:?}", other),
        }
        assert_eq!(h.ledger.sent_signatures().len(), 1);
    }

    #[tokio::test]
    async fn test_quote_failure_is_retried_until_exhausted() {
        let h = harness(MockLedger::new());
        h.api.fail_quote.store(true, Ordering::SeqCst);

        let result = h
            .service
            .buy_token_with_retries(&h.wallet, &BuyRequest::new(Pubkey::new_unique(), 1.0), &fast_retries())
            .await;

        match result {
            Err(SwapError::RetriesExhausted { last, .. }) => {
                assert!(matches!(*last, SwapError::QuoteUnavailable(_)));
            }
            other => panic!("expected RetriesExhausted, got {:?}", other),
        }
        assert_eq!(h.api.requests().len(), 3);
        assert!(h.ledger.sent_signatures().is_empty());
    }
}
