//! Wallet domain - token holdings and balances

mod balance_reader;

pub use balance_reader::BalanceReader;

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;

use crate::shared::errors::SwapError;
use crate::shared::types::Amount;

/// One token held by a wallet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenHolding {
    /// Display name from the token registry, empty when unknown
    pub name: String,
    pub balance: Amount,
}

impl TokenHolding {
    pub fn ui_balance(&self) -> f64 {
        self.balance.ui_amount()
    }
}

/// Non-zero holdings keyed by mint, rebuilt on every query
pub type WalletTokens = BTreeMap<Pubkey, TokenHolding>;

/// Source of token display names
#[async_trait]
pub trait TokenRegistry: Send + Sync {
    async fn token_names(&self) -> Result<HashMap<Pubkey, String>, SwapError>;
}
