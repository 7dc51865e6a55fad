//! Token display names from the Jupiter token list

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use reqwest::Client;
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, warn};

use crate::domain::wallet::TokenRegistry;
use crate::infrastructure::api_clients::types::TokenListEntry;
use crate::shared::errors::SwapError;

/// Token registry backed by `GET {base_url}/all`
pub struct TokenRegistryClient {
    http_client: Client,
    base_url: String,
}

impl TokenRegistryClient {
    pub fn new(http_client: Client, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn list_url(&self) -> String {
        format!("{}/all", self.base_url)
    }
}

/// Mint to name map; entries with an unparsable address are skipped
pub fn names_by_mint(entries: Vec<TokenListEntry>) -> HashMap<Pubkey, String> {
    entries
        .into_iter()
        .filter_map(|entry| match Pubkey::from_str(&entry.address) {
            Ok(mint) => Some((mint, entry.name)),
            Err(_) => {
                warn!("⚠️ Token list entry with invalid address {}", entry.address);
                None
            }
        })
        .collect()
}

#[async_trait]
impl TokenRegistry for TokenRegistryClient {
    async fn token_names(&self) -> Result<HashMap<Pubkey, String>, SwapError> {
        let url = self.list_url();
        debug!("Fetching token list from {}", url);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| SwapError::Rpc(format!("Token list request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(SwapError::Rpc(format!("Token list request failed with status: {}", response.status())));
        }

        let entries: Vec<TokenListEntry> = response
            .json()
            .await
            .map_err(|e| SwapError::Rpc(format!("Token list parse failed: {}", e)))?;

        debug!("Token list holds {} entries", entries.len());
        Ok(names_by_mint(entries))
    }
}
