//! HTTP clients for external APIs

pub mod jupiter_client;
pub mod types;

pub use jupiter_client::JupiterApiClient;

use std::time::Duration;

use reqwest::Client;

use crate::shared::errors::SwapError;

/// Jupiter v6 swap API
pub const DEFAULT_JUPITER_URL: &str = "https://quote-api.jup.ag/v6";

/// Jupiter token list
pub const DEFAULT_TOKEN_LIST_URL: &str = "https://token.jup.ag";

/// HTTP client shared by the API clients
pub fn build_http_client(timeout: Duration) -> Result<Client, SwapError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| SwapError::Rpc(format!("Failed to build HTTP client: {}", e)))
}
