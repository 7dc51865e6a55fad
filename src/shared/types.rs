//! Common types used across the application

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// Decimal precision of the native currency (lamports per SOL = 10^9)
pub const NATIVE_DECIMALS: u8 = spl_token::native_mint::DECIMALS;

/// Wrapped SOL mint, used by the aggregator to denote the native currency
pub fn native_mint() -> Pubkey {
    spl_token::native_mint::id()
}

/// Amount representation with precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Serialize, Deserialize)]
pub struct Amount {
    pub value: u64,
    pub decimals: u8,
}

impl Amount {
    pub fn new(value: u64, decimals: u8) -> Self {
        Self { value, decimals }
    }

    pub fn zero(decimals: u8) -> Self {
        Self { value: 0, decimals }
    }

    pub fn from_lamports(value: u64) -> Self {
        Self {
            value,
            decimals: NATIVE_DECIMALS,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.value == 0
    }

    /// Human-readable value, e.g. 13_880_000 with 6 decimals is 13.88
    pub fn ui_amount(&self) -> f64 {
        self.value as f64 / 10_f64.powi(self.decimals as i32)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&crate::shared::utils::format_amount(self.value, self.decimals))
    }
}
