//! Jupiter aggregator client: quotes and unsigned swap transactions

use std::str::FromStr;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde_json::Value;
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, info};

use super::types::{ApiErrorBody, QuoteResponse, SwapRequest, SwapResponse};
use crate::domain::swap::{Quote, QuoteRequest, SwapApi, UnsignedTransaction};
use crate::shared::errors::SwapError;

/// Jupiter v6 API client
pub struct JupiterApiClient {
    http_client: Client,
    base_url: String,
    /// Forwarded as `dynamicComputeUnitLimit` when set
    dynamic_compute_unit_limit: Option<bool>,
}

impl JupiterApiClient {
    pub fn new(http_client: Client, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            dynamic_compute_unit_limit: None,
        }
    }

    pub fn with_dynamic_compute_unit_limit(mut self, enabled: bool) -> Self {
        self.dynamic_compute_unit_limit = Some(enabled);
        self
    }

    /// `GET /quote` URL; slippage goes on the wire in basis points
    pub fn quote_url(&self, request: &QuoteRequest) -> Result<Url, SwapError> {
        let slippage_bps = request.slippage_bps()?;
        Url::parse_with_params(
            &format!("{}/quote", self.base_url),
            &[
                ("inputMint", request.input_mint.to_string()),
                ("outputMint", request.output_mint.to_string()),
                ("amount", request.amount.to_string()),
                ("slippageBps", slippage_bps.to_string()),
            ],
        )
        .map_err(|e| SwapError::QuoteUnavailable(format!("Invalid quote URL: {}", e)))
    }

    fn swap_url(&self) -> String {
        format!("{}/swap", self.base_url)
    }
}

/// Converts the raw quote payload, keeping it whole as the route
pub fn parse_quote(raw: Value) -> Result<Quote, SwapError> {
    let wire: QuoteResponse = serde_json::from_value(raw.clone())
        .map_err(|e| SwapError::QuoteUnavailable(format!("Unexpected quote payload: {}", e)))?;

    let parse_mint = |value: &str| {
        Pubkey::from_str(value)
            .map_err(|e| SwapError::QuoteUnavailable(format!("Invalid mint {} in quote: {}", value, e)))
    };
    let parse_amount = |value: &str| {
        value
            .parse::<u64>()
            .map_err(|e| SwapError::QuoteUnavailable(format!("Invalid amount {} in quote: {}", value, e)))
    };

    Ok(Quote {
        input_mint: parse_mint(&wire.input_mint)?,
        output_mint: parse_mint(&wire.output_mint)?,
        in_amount: parse_amount(&wire.in_amount)?,
        out_amount: parse_amount(&wire.out_amount)?,
        price_impact_pct: wire.price_impact_pct,
        slippage_bps: wire.slippage_bps,
        route: raw,
    })
}

/// Body text of a failed response, preferring the API's own error message
async fn error_message(response: Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ApiErrorBody>(&text) {
        Ok(body) => format!("{} ({})", body.error, status),
        Err(_) if text.is_empty() => format!("status {}", status),
        Err(_) => format!("{} ({})", text, status),
    }
}

#[async_trait]
impl SwapApi for JupiterApiClient {
    async fn get_quote(&self, request: &QuoteRequest) -> Result<Quote, SwapError> {
        let url = self.quote_url(request)?;
        debug!("Jupiter quote request: {}", url);

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| SwapError::QuoteUnavailable(format!("Jupiter quote request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(SwapError::QuoteUnavailable(error_message(response).await));
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| SwapError::QuoteUnavailable(format!("Jupiter quote parse failed: {}", e)))?;
        let quote = parse_quote(raw)?;

        info!(
            "📈 Quote {} -> {}: {} -> {} (impact {:.4}%)",
            quote.input_mint, quote.output_mint, quote.in_amount, quote.out_amount, quote.price_impact_pct
        );
        Ok(quote)
    }

    async fn build_swap_transaction(
        &self,
        quote: &Quote,
        wallet: &Pubkey,
    ) -> Result<UnsignedTransaction, SwapError> {
        let body = SwapRequest {
            quote_response: &quote.route,
            user_public_key: wallet.to_string(),
            wrap_and_unwrap_sol: true,
            restrict_intermediate_tokens: false,
            prioritization_fee_lamports: "auto",
            dynamic_compute_unit_limit: self.dynamic_compute_unit_limit,
        };

        debug!("Jupiter swap transaction request for user: {}", wallet);

        let response = self
            .http_client
            .post(self.swap_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| SwapError::BuildFailed(format!("Jupiter swap request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(SwapError::BuildFailed(error_message(response).await));
        }

        let swap: SwapResponse = response
            .json()
            .await
            .map_err(|e| SwapError::BuildFailed(format!("Jupiter swap parse failed: {}", e)))?;

        if swap.swap_transaction.is_empty() {
            return Err(SwapError::BuildFailed("Jupiter returned an empty swap transaction".to_string()));
        }

        debug!("Jupiter swap transaction received");
        Ok(UnsignedTransaction {
            base64: swap.swap_transaction,
            last_valid_block_height: swap.last_valid_block_height,
        })
    }
}
