//! CLI commands and handlers
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::application::services::{BuyRequest, SellRequest, SwapService};
use crate::domain::wallet::TokenHolding;
use crate::config::{parse_keypair, Config, ConfirmationMode};
use crate::infrastructure::api_clients::{build_http_client, JupiterApiClient};
use crate::infrastructure::blockchain::{SolanaRpcClient, TokenRegistryClient};

#[derive(Parser, Debug)]
#[command(name = "swapper", version)]
#[command(about = "Buy and sell Solana tokens through the Jupiter aggregator")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// RPC endpoint URL (overrides config)
    #[arg(long, global = true)]
    pub rpc_url: Option<String>,

    /// Path to config file (optional)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Base58 encoded wallet keypair
    #[arg(long, global = true, env = "WALLET_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// Total swap attempts (overrides config)
    #[arg(long, global = true)]
    pub retries: Option<u32>,

    /// Delay between swap attempts in milliseconds (overrides config)
    #[arg(long, global = true)]
    pub retry_delay_ms: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Spend SOL on a token
    Buy {
        /// Mint of the token to buy
        #[arg(long)]
        token: Pubkey,

        /// SOL to spend
        #[arg(long)]
        amount: f64,

        /// Slippage tolerance in percent (overrides config)
        #[arg(long)]
        slippage: Option<f64>,
    },

    /// Sell a token for SOL
    Sell {
        /// Mint of the token to sell
        #[arg(long)]
        token: Pubkey,

        /// Sell the whole balance
        #[arg(long, conflicts_with = "amount", required_unless_present = "amount")]
        all: bool,

        /// Token amount to sell
        #[arg(long)]
        amount: Option<f64>,

        /// Slippage tolerance in percent (overrides config)
        #[arg(long)]
        slippage: Option<f64>,
    },

    /// Show the balance of one token
    Balance {
        #[arg(long)]
        wallet: Pubkey,

        #[arg(long)]
        token: Pubkey,
    },

    /// List every non-zero token balance
    Balances {
        #[arg(long)]
        wallet: Pubkey,
    },

    /// Show the SOL balance
    SolBalance {
        #[arg(long)]
        wallet: Pubkey,
    },
}

/// Merge CLI flags over the config file over defaults
pub fn resolve_config(global: &GlobalArgs) -> Result<Config> {
    let mut config = match &global.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    if let Some(rpc_url) = &global.rpc_url {
        config.rpc.url = rpc_url.clone();
    }
    if let Some(private_key) = &global.private_key {
        config.wallet.private_key = Some(private_key.clone());
    }
    if let Some(retries) = global.retries {
        config.retry.max_attempts = retries;
    }
    if let Some(delay_ms) = global.retry_delay_ms {
        config.retry.delay_ms = delay_ms;
    }

    Ok(config)
}

pub struct CommandExecutor;

impl CommandExecutor {
    /// Execute the selected command
    pub async fn execute(cli: Cli) -> Result<()> {
        let config = resolve_config(&cli.global)?;
        let service = Self::build_service(&config).await?;

        match cli.command {
            Commands::Buy { token, amount, slippage } => {
                let wallet = Self::wallet(&config)?;
                let request = BuyRequest {
                    mint: token,
                    amount_sol: amount,
                    slippage_percent: slippage.unwrap_or(config.trade.slippage_percent),
                };
                let signature = service
                    .buy_token_with_retries(&wallet, &request, &config.retry_policy())
                    .await?;
                println!("{}", signature);
            }
            Commands::Sell { token, all, amount, slippage } => {
                let wallet = Self::wallet(&config)?;
                let request = SellRequest {
                    mint: token,
                    slippage_percent: slippage.unwrap_or(config.trade.slippage_percent),
                    sell_all: all,
                    amount,
                };
                let signature = service
                    .sell_token_with_retries(&wallet, &request, &config.retry_policy())
                    .await?;
                println!("{}", signature);
            }
            Commands::Balance { wallet, token } => {
                let balance = service.get_balance_of_token(&wallet, &token).await?;
                println!("{}", balance);
            }
            Commands::Balances { wallet } => {
                let holdings = service.get_all_balances(&wallet).await?;
                info!("📊 {} tokens held by {}", holdings.len(), wallet);
                let by_address: BTreeMap<String, &TokenHolding> = holdings
                    .iter()
                    .map(|(mint, holding)| (mint.to_string(), holding))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&by_address)?);
            }
            Commands::SolBalance { wallet } => {
                let balance = service.get_sol_balance(&wallet).await?;
                println!("{}", balance);
            }
        }

        Ok(())
    }

    async fn build_service(config: &Config) -> Result<SwapService> {
        let finalizer_config = config.finalizer_config()?;
        let depth = config.rpc.depth()?;

        let ledger = match config.confirmation.mode {
            ConfirmationMode::Subscribe => {
                SolanaRpcClient::connect(config.rpc.url.clone(), &config.rpc.ws_url(), depth).await
            }
            ConfirmationMode::Poll => SolanaRpcClient::new(config.rpc.url.clone(), depth),
        };
        info!("🔗 Using RPC {}", ledger.url());

        let http_client = build_http_client(Duration::from_millis(config.api.timeout_ms))?;
        let mut jupiter = JupiterApiClient::new(http_client.clone(), config.api.jupiter_url.clone());
        if let Some(enabled) = config.api.dynamic_compute_unit_limit {
            jupiter = jupiter.with_dynamic_compute_unit_limit(enabled);
        }
        let registry = TokenRegistryClient::new(http_client, config.api.token_list_url.clone());

        Ok(SwapService::new(
            Arc::new(ledger),
            Arc::new(jupiter),
            Arc::new(registry),
            finalizer_config,
        ))
    }

    fn wallet(config: &Config) -> Result<Keypair> {
        let encoded = config
            .wallet
            .private_key
            .as_deref()
            .context("wallet private key required: pass --private-key, set WALLET_PRIVATE_KEY or [wallet] private_key")?;
        let wallet = parse_keypair(encoded)?;
        info!("👛 Wallet {}", wallet.pubkey());
        Ok(wallet)
    }
}
