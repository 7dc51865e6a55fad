use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use solana_sdk::signature::Keypair;
use std::{fs, path::Path, time::Duration};

use crate::domain::execution::{ConfirmationPolicy, FinalizerConfig};
use crate::domain::ledger::{ConfirmationDepth, SendOptions};
use crate::domain::swap::DEFAULT_SLIPPAGE_PERCENT;
use crate::infrastructure::api_clients::{DEFAULT_JUPITER_URL, DEFAULT_TOKEN_LIST_URL};
use crate::shared::retry::RetryPolicy;
use crate::shared::utils::derive_ws_url;

pub const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RpcCfg {
    pub url: String,
    /// Derived from `url` when unset
    pub ws_url: Option<String>,
    /// Commitment for reads and signature subscriptions
    pub commitment: String,
}

impl Default for RpcCfg {
    fn default() -> Self {
        Self {
            url: DEFAULT_RPC_URL.to_string(),
            ws_url: None,
            commitment: "finalized".to_string(),
        }
    }
}

impl RpcCfg {
    pub fn ws_url(&self) -> String {
        self.ws_url.clone().unwrap_or_else(|| derive_ws_url(&self.url))
    }

    pub fn depth(&self) -> Result<ConfirmationDepth> {
        self.commitment.parse().map_err(|e: String| anyhow!(e))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WalletCfg {
    /// Base58 encoded 64-byte keypair
    pub private_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TradeCfg {
    pub slippage_percent: f64,
}

impl Default for TradeCfg {
    fn default() -> Self {
        Self {
            slippage_percent: DEFAULT_SLIPPAGE_PERCENT,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryCfg {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetryCfg {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationMode {
    Subscribe,
    Poll,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConfirmationCfg {
    pub mode: ConfirmationMode,
    pub timeout_ms: u64,
    pub skip_preflight: bool,
    pub max_retries: Option<usize>,
}

impl Default for ConfirmationCfg {
    fn default() -> Self {
        Self {
            mode: ConfirmationMode::Subscribe,
            timeout_ms: 60_000,
            skip_preflight: false,
            max_retries: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiCfg {
    pub jupiter_url: String,
    pub token_list_url: String,
    pub dynamic_compute_unit_limit: Option<bool>,
    pub timeout_ms: u64,
}

impl Default for ApiCfg {
    fn default() -> Self {
        Self {
            jupiter_url: DEFAULT_JUPITER_URL.to_string(),
            token_list_url: DEFAULT_TOKEN_LIST_URL.to_string(),
            dynamic_compute_unit_limit: None,
            timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rpc: RpcCfg,
    pub wallet: WalletCfg,
    pub trade: TradeCfg,
    pub retry: RetryCfg,
    pub confirmation: ConfirmationCfg,
    pub api: ApiCfg,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path.as_ref())
            .with_context(|| format!("read {}", path.as_ref().display()))?;
        let cfg: Self = toml::from_str(&s).context("parse config TOML")?;
        Ok(cfg)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry.max_attempts, Duration::from_millis(self.retry.delay_ms))
    }

    pub fn finalizer_config(&self) -> Result<FinalizerConfig> {
        let policy = match self.confirmation.mode {
            ConfirmationMode::Poll => ConfirmationPolicy::Poll,
            ConfirmationMode::Subscribe => ConfirmationPolicy::Subscribe {
                depth: self.rpc.depth()?,
                timeout: Duration::from_millis(self.confirmation.timeout_ms),
            },
        };

        Ok(FinalizerConfig {
            policy,
            send: SendOptions {
                skip_preflight: self.confirmation.skip_preflight,
                max_retries: self.confirmation.max_retries,
                ..SendOptions::default()
            },
        })
    }
}

/// Decode a base58 64-byte keypair
pub fn parse_keypair(encoded: &str) -> Result<Keypair> {
    let bytes = bs58::decode(encoded.trim())
        .into_vec()
        .context("private key is not valid base58")?;
    if bytes.len() != 64 {
        bail!("Invalid Solana keypair (expected 64 bytes, got {})", bytes.len());
    }
    Keypair::from_bytes(&bytes).map_err(|e| anyhow!("Invalid Solana keypair: {}", e))
}
