//! Swap domain - quotes and unsigned swap transactions from an aggregator

use async_trait::async_trait;
use serde_json::Value;
use solana_sdk::pubkey::Pubkey;

use crate::shared::errors::SwapError;

/// Default slippage tolerance, in percent
pub const DEFAULT_SLIPPAGE_PERCENT: f64 = 1.0;

/// Exchange quote request
///
/// `slippage_percent` is a percentage (1.0 = 1%). The aggregator expects basis
/// points, so it is multiplied by 100 before it goes on the wire; passing raw
/// basis points here would ask for 100x the intended tolerance.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRequest {
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    /// Amount of `input_mint` to sell, in base units
    pub amount: u64,
    pub slippage_percent: f64,
}

impl QuoteRequest {
    pub fn new(input_mint: Pubkey, output_mint: Pubkey, amount: u64, slippage_percent: f64) -> Self {
        Self {
            input_mint,
            output_mint,
            amount,
            slippage_percent,
        }
    }

    pub fn slippage_bps(&self) -> Result<u16, SwapError> {
        let percent = self.slippage_percent;
        if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
            return Err(SwapError::InvalidAmount(format!(
                "slippage must be between 0 and 100 percent, got {}",
                percent
            )));
        }
        Ok((percent * 100.0).round() as u16)
    }
}

/// Proposed exchange, immutable once received.
///
/// `route` is the aggregator's full quote payload. It is opaque to this crate
/// and is sent back verbatim when the swap transaction is requested.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    pub in_amount: u64,
    /// Estimated output before slippage
    pub out_amount: u64,
    pub price_impact_pct: f64,
    pub slippage_bps: u16,
    pub route: Value,
}

/// Base64 encoded, not yet signed, serialized ledger transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub base64: String,
    pub last_valid_block_height: Option<u64>,
}

impl UnsignedTransaction {
    pub fn new(base64: impl Into<String>) -> Self {
        Self {
            base64: base64.into(),
            last_valid_block_height: None,
        }
    }
}

/// Aggregator seam: quoting and transaction building.
///
/// Both operations are free of on-chain side effects and safe to retry.
#[async_trait]
pub trait SwapApi: Send + Sync {
    async fn get_quote(&self, request: &QuoteRequest) -> Result<Quote, SwapError>;

    /// Transaction wraps/unwraps SOL as needed, leaves intermediate routing
    /// tokens unrestricted and lets the builder pick the priority fee.
    async fn build_swap_transaction(
        &self,
        quote: &Quote,
        wallet: &Pubkey,
    ) -> Result<UnsignedTransaction, SwapError>;
}
