//! Swapper - Solana token swaps through the Jupiter aggregator
//! Built with Domain-Driven Design principles

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod shared;

#[cfg(test)]
mod test_support;

// Re-export main types for convenience
pub use application::{BuyRequest, SellRequest, SwapService};
pub use domain::execution::{ConfirmationPolicy, FinalizerConfig, TransactionFinalizer, TransactionOutcome};
pub use domain::wallet::{TokenHolding, WalletTokens};
pub use shared::errors::SwapError;
pub use shared::retry::{with_retries, RetryPolicy};
pub use shared::types::Amount;
pub use shared::utils::to_base_units;
