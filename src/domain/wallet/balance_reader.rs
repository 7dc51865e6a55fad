//! Wallet balance reader

use std::collections::HashMap;
use std::sync::Arc;

use solana_sdk::pubkey::Pubkey;
use tracing::{debug, warn};

use super::{TokenHolding, TokenRegistry, WalletTokens};
use crate::domain::ledger::Ledger;
use crate::shared::errors::SwapError;
use crate::shared::types::{Amount, NATIVE_DECIMALS};

/// Reads token balances straight from the ledger, no caching
pub struct BalanceReader {
    ledger: Arc<dyn Ledger>,
    registry: Arc<dyn TokenRegistry>,
}

impl BalanceReader {
    pub fn new(ledger: Arc<dyn Ledger>, registry: Arc<dyn TokenRegistry>) -> Self {
        Self { ledger, registry }
    }

    /// Balance of one mint; zero when the wallet has no account for it.
    ///
    /// Decimals of a zero balance are looked up best-effort and fall back to 0.
    pub async fn get_balance(&self, wallet: &Pubkey, mint: &Pubkey) -> Result<Amount, SwapError> {
        let accounts = self.ledger.get_token_accounts(wallet).await?;

        let mut matching = accounts.iter().filter(|account| account.mint == *mint).peekable();
        let decimals = match matching.peek() {
            Some(account) => account.decimals,
            None => {
                debug!("Wallet {} holds no account for mint {}", wallet, mint);
                let decimals = match self.ledger.get_mint_decimals(mint).await {
                    Ok(decimals) => decimals,
                    Err(e) => {
                        warn!("⚠️ Decimals lookup for mint {} failed, reporting zero balance: {}", mint, e);
                        0
                    }
                };
                return Ok(Amount::zero(decimals));
            }
        };

        let value = matching.try_fold(0u64, |total, account| total.checked_add(account.amount));
        let value = value.ok_or_else(|| balance_overflow(mint))?;
        Ok(Amount::new(value, decimals))
    }

    /// All non-zero holdings, names enriched from the token registry.
    ///
    /// The registry is fetched on every call. A failed lookup leaves names
    /// empty instead of withholding balances.
    pub async fn get_all_balances(&self, wallet: &Pubkey) -> Result<WalletTokens, SwapError> {
        let accounts = self.ledger.get_token_accounts(wallet).await?;

        let mut totals: HashMap<Pubkey, Amount> = HashMap::new();
        for account in accounts.iter().filter(|account| account.amount > 0) {
            let entry = totals
                .entry(account.mint)
                .or_insert_with(|| Amount::zero(account.decimals));
            entry.value = entry
                .value
                .checked_add(account.amount)
                .ok_or_else(|| balance_overflow(&account.mint))?;
        }

        if totals.is_empty() {
            return Ok(WalletTokens::new());
        }

        let names = match self.registry.token_names().await {
            Ok(names) => names,
            Err(e) => {
                warn!("⚠️ Token registry lookup failed, names left empty: {}", e);
                HashMap::new()
            }
        };

        Ok(totals
            .into_iter()
            .map(|(mint, balance)| {
                let name = names.get(&mint).cloned().unwrap_or_default();
                (mint, TokenHolding { name, balance })
            })
            .collect())
    }

    /// Native SOL balance
    pub async fn get_sol_balance(&self, wallet: &Pubkey) -> Result<Amount, SwapError> {
        let lamports = self.ledger.get_native_balance(wallet).await?;
        Ok(Amount::new(lamports, NATIVE_DECIMALS))
    }
}

fn balance_overflow(mint: &Pubkey) -> SwapError {
    SwapError::Rpc(format!("balance overflow for mint {}", mint))
}
