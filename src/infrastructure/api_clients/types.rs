//! Jupiter v6 wire types

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Subset of the quote response the swap pipeline reads.
///
/// The full payload is kept separately and echoed back on `/swap`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub input_mint: String,
    pub output_mint: String,
    pub in_amount: String,
    pub out_amount: String,
    #[serde(default, deserialize_with = "number_or_string")]
    pub price_impact_pct: f64,
    pub slippage_bps: u16,
}

/// Body of `POST /swap`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest<'a> {
    pub quote_response: &'a Value,
    pub user_public_key: String,
    pub wrap_and_unwrap_sol: bool,
    pub restrict_intermediate_tokens: bool,
    pub prioritization_fee_lamports: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dynamic_compute_unit_limit: Option<bool>,
}

/// Response from `POST /swap`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapResponse {
    /// Base64-encoded serialized transaction
    pub swap_transaction: String,
    #[serde(default)]
    pub last_valid_block_height: Option<u64>,
}

/// Error body returned with non-2xx statuses
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
}

/// Token list entry from `GET /all`
#[derive(Debug, Clone, Deserialize)]
pub struct TokenListEntry {
    pub address: String,
    #[serde(default)]
    pub name: String,
}

/// Jupiter sends `priceImpactPct` as a decimal string
fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quote_response_string_price_impact() {
        let raw = json!({
            "inputMint": "So11111111111111111111111111111111111111112",
            "outputMint": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
            "inAmount": "1000000",
            "outAmount": "171234",
            "priceImpactPct": "0.0012",
            "slippageBps": 100,
            "routePlan": []
        });

        let quote: QuoteResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(quote.price_impact_pct, 0.0012);
        assert_eq!(quote.out_amount, "171234");
    }

    #[test]
    fn test_swap_request_body() {
        let quote = json!({ "inAmount": "1" });
        let body = SwapRequest {
            quote_response: &quote,
            user_public_key: "wallet".to_string(),
            wrap_and_unwrap_sol: true,
            restrict_intermediate_tokens: false,
            prioritization_fee_lamports: "auto",
            dynamic_compute_unit_limit: None,
        };

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["quoteResponse"], quote);
        assert_eq!(value["wrapAndUnwrapSol"], true);
        assert_eq!(value["restrictIntermediateTokens"], false);
        assert_eq!(value["prioritizationFeeLamports"], "auto");
        assert!(value.get("dynamicComputeUnitLimit").is_none());
    }
}
