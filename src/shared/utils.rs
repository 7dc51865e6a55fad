//! Utility functions and helpers

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::shared::errors::SwapError;

/// Convert a human-readable amount into on-chain base units.
///
/// Computes `floor(amount * 10^decimals)` over the shortest decimal form of
/// `amount`, so `0.29` with 2 decimals is 29 and never 28. The result is
/// truncated, never rounded up.
pub fn to_base_units(amount: f64, decimals: u8) -> Result<u64, SwapError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(SwapError::InvalidAmount(format!(
            "{} is not a non-negative finite number",
            amount
        )));
    }

    let exact = Decimal::from_str(&amount.to_string())
        .map_err(|e| SwapError::InvalidAmount(format!("{}: {}", amount, e)))?;

    let mut scaled = exact;
    for _ in 0..decimals {
        scaled = scaled.checked_mul(Decimal::TEN).ok_or_else(|| {
            SwapError::InvalidAmount(format!(
                "{} with {} decimals overflows base units",
                amount, decimals
            ))
        })?;
    }

    scaled.trunc().to_u64().ok_or_else(|| {
        SwapError::InvalidAmount(format!(
            "{} with {} decimals does not fit in u64 base units",
            amount, decimals
        ))
    })
}

/// Format amount with proper decimals, trailing zeros trimmed
pub fn format_amount(amount: u64, decimals: u8) -> String {
    match Decimal::try_from_i128_with_scale(amount as i128, decimals as u32) {
        Ok(value) => value.normalize().to_string(),
        Err(_) => format!("{:.6}", amount as f64 / 10_f64.powi(decimals as i32)),
    }
}

/// Derive the websocket endpoint that pairs with an HTTP RPC endpoint
pub fn derive_ws_url(rpc_url: &str) -> String {
    let ws = if let Some(rest) = rpc_url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = rpc_url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        rpc_url.to_string()
    };

    // solana-test-validator serves pubsub on the next port
    ws.replacen(":8899", ":8900", 1)
}
