//! Solana RPC client for ledger reads, submission and signature tracking

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use futures::{future, StreamExt};
use solana_account_decoder::UiAccountEncoding;
use solana_client::nonblocking::pubsub_client::PubsubClient;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::{
    RpcAccountInfoConfig, RpcProgramAccountsConfig, RpcSendTransactionConfig, RpcSignatureSubscribeConfig,
};
use solana_client::rpc_filter::{Memcmp, RpcFilterType};
use solana_client::rpc_response::RpcSignatureResult;
use solana_sdk::commitment_config::{CommitmentConfig, CommitmentLevel};
use solana_sdk::program_pack::Pack;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;
use solana_transaction_status::TransactionConfirmationStatus;
use spl_token::state::{Account as TokenAccount, Mint};
use tracing::{debug, info, warn};

use crate::domain::ledger::{
    ConfirmationDepth, Ledger, SendOptions, SignatureNotification, SignatureStatus, SignatureSubscription,
    TokenAccountBalance,
};
use crate::shared::errors::SwapError;

/// Byte offset of the owner field in an SPL token account
const TOKEN_ACCOUNT_OWNER_OFFSET: usize = 32;

/// `getMultipleAccounts` accepts at most this many keys
const MAX_MULTIPLE_ACCOUNTS: usize = 100;

fn commitment(depth: ConfirmationDepth) -> CommitmentConfig {
    let commitment = match depth {
        ConfirmationDepth::Processed => CommitmentLevel::Processed,
        ConfirmationDepth::Confirmed => CommitmentLevel::Confirmed,
        ConfirmationDepth::Finalized => CommitmentLevel::Finalized,
    };
    CommitmentConfig { commitment }
}

fn depth_of(status: TransactionConfirmationStatus) -> ConfirmationDepth {
    match status {
        TransactionConfirmationStatus::Processed => ConfirmationDepth::Processed,
        TransactionConfirmationStatus::Confirmed => ConfirmationDepth::Confirmed,
        TransactionConfirmationStatus::Finalized => ConfirmationDepth::Finalized,
    }
}

/// Decimals from a mint account. Only the base mint layout is read, so
/// Token-2022 mints with extensions parse too.
fn unpack_mint_decimals(mint: &Pubkey, data: &[u8]) -> Result<u8, SwapError> {
    if data.len() < Mint::LEN {
        return Err(SwapError::Rpc(format!("Account {} is not a token mint", mint)));
    }
    Mint::unpack_from_slice(&data[..Mint::LEN])
        .map(|mint| mint.decimals)
        .map_err(|e| SwapError::Rpc(format!("Failed to parse mint {}: {}", mint, e)))
}

/// Solana RPC client wrapper
pub struct SolanaRpcClient {
    client: RpcClient,
    /// Websocket connection for signature subscriptions, when reachable
    pubsub: Option<PubsubClient>,
}

impl SolanaRpcClient {
    /// Create new RPC client without websocket support
    pub fn new(rpc_url: String, depth: ConfirmationDepth) -> Self {
        Self {
            client: RpcClient::new_with_commitment(rpc_url, commitment(depth)),
            pubsub: None,
        }
    }

    /// Create new RPC client and open the websocket used for signature
    /// subscriptions. An unreachable websocket is logged and left out.
    pub async fn connect(rpc_url: String, ws_url: &str, depth: ConfirmationDepth) -> Self {
        let mut client = Self::new(rpc_url, depth);
        match PubsubClient::new(ws_url).await {
            Ok(pubsub) => {
                debug!("Connected to websocket {}", ws_url);
                client.pubsub = Some(pubsub);
            }
            Err(e) => warn!("⚠️ Websocket {} unavailable, confirmations will poll: {}", ws_url, e),
        }
        client
    }

    pub fn url(&self) -> String {
        self.client.url()
    }

    /// Decimals for several mints, chunked to the RPC key limit
    async fn get_decimals_for(&self, mints: &[Pubkey]) -> Result<HashMap<Pubkey, u8>, SwapError> {
        let mut decimals = HashMap::with_capacity(mints.len());
        for chunk in mints.chunks(MAX_MULTIPLE_ACCOUNTS) {
            let accounts = self
                .client
                .get_multiple_accounts(chunk)
                .await
                .map_err(|e| SwapError::Rpc(format!("Failed to get mint accounts: {}", e)))?;

            for (mint, account) in chunk.iter().zip(accounts) {
                let account = account.ok_or_else(|| SwapError::Rpc(format!("Mint {} not found", mint)))?;
                decimals.insert(*mint, unpack_mint_decimals(mint, &account.data)?);
            }
        }
        Ok(decimals)
    }
}

#[async_trait]
impl Ledger for SolanaRpcClient {
    async fn get_mint_decimals(&self, mint: &Pubkey) -> Result<u8, SwapError> {
        let account = self
            .client
            .get_account(mint)
            .await
            .map_err(|e| SwapError::Rpc(format!("Failed to get mint account {}: {}", mint, e)))?;
        unpack_mint_decimals(mint, &account.data)
    }

    async fn get_token_accounts(&self, owner: &Pubkey) -> Result<Vec<TokenAccountBalance>, SwapError> {
        let filters = vec![
            RpcFilterType::DataSize(TokenAccount::LEN as u64),
            RpcFilterType::Memcmp(Memcmp::new_base58_encoded(TOKEN_ACCOUNT_OWNER_OFFSET, owner.as_ref())),
        ];
        let config = RpcProgramAccountsConfig {
            filters: Some(filters),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                ..Default::default()
            },
            ..Default::default()
        };

        let accounts = self
            .client
            .get_program_accounts_with_config(&spl_token::id(), config)
            .await
            .map_err(|e| SwapError::Rpc(format!("Failed to get token accounts: {}", e)))?;

        let mut parsed = Vec::with_capacity(accounts.len());
        for (address, account) in accounts {
            match TokenAccount::unpack(&account.data) {
                Ok(token_account) => parsed.push((address, token_account)),
                Err(e) => warn!("⚠️ Skipping unparsable token account {}: {}", address, e),
            }
        }

        let mints: Vec<Pubkey> = parsed
            .iter()
            .map(|(_, account)| account.mint)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let decimals = self.get_decimals_for(&mints).await?;

        debug!("Found {} token accounts for {}", parsed.len(), owner);
        Ok(parsed
            .into_iter()
            .map(|(address, account)| TokenAccountBalance {
                address,
                mint: account.mint,
                amount: account.amount,
                decimals: decimals.get(&account.mint).copied().unwrap_or_default(),
            })
            .collect())
    }

    async fn get_native_balance(&self, owner: &Pubkey) -> Result<u64, SwapError> {
        self.client
            .get_balance(owner)
            .await
            .map_err(|e| SwapError::Rpc(format!("Failed to get balance of {}: {}", owner, e)))
    }

    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
        options: &SendOptions,
    ) -> Result<Signature, SwapError> {
        let config = RpcSendTransactionConfig {
            skip_preflight: options.skip_preflight,
            preflight_commitment: Some(commitment(options.preflight_commitment).commitment),
            max_retries: options.max_retries,
            ..RpcSendTransactionConfig::default()
        };

        let signature = self
            .client
            .send_transaction_with_config(transaction, config)
            .await
            .map_err(|e| SwapError::SubmissionFailed(e.to_string()))?;

        info!("📤 Submitted {} to {}", signature, self.client.url());
        Ok(signature)
    }

    async fn get_signature_status(&self, signature: &Signature) -> Result<Option<SignatureStatus>, SwapError> {
        let statuses = self
            .client
            .get_signature_statuses_with_history(&[*signature])
            .await
            .map_err(|e| SwapError::Rpc(format!("Failed to get signature status: {}", e)))?
            .value;

        Ok(statuses.into_iter().next().flatten().map(|status| SignatureStatus {
            slot: status.slot,
            err: status.err.as_ref().map(|e| e.to_string()),
            confirmation: depth_of(status.confirmation_status()),
        }))
    }

    async fn subscribe_signature<'a>(
        &'a self,
        signature: &Signature,
        depth: ConfirmationDepth,
    ) -> Result<SignatureSubscription<'a>, SwapError> {
        let pubsub = self
            .pubsub
            .as_ref()
            .ok_or_else(|| SwapError::Rpc("No websocket connection".to_string()))?;

        let config = RpcSignatureSubscribeConfig {
            commitment: Some(commitment(depth)),
            enable_received_notification: Some(false),
        };
        let (stream, unsubscribe) = pubsub
            .signature_subscribe(signature, Some(config))
            .await
            .map_err(|e| SwapError::Rpc(format!("Signature subscription failed: {}", e)))?;

        let notifications = stream
            .filter_map(|response| {
                future::ready(match response.value {
                    RpcSignatureResult::ProcessedSignature(result) => Some(SignatureNotification {
                        slot: response.context.slot,
                        err: result.err.map(|e| e.to_string()),
                    }),
                    RpcSignatureResult::ReceivedSignature(_) => None,
                })
            })
            .boxed();

        Ok(SignatureSubscription::new(notifications, unsubscribe))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpack_mint_decimals() {
        let mint = Mint {
            decimals: 6,
            is_initialized: true,
            ..Default::default()
        };
        let mut data = vec![0u8; Mint::LEN];
        Mint::pack(mint, &mut data).unwrap();
        // Token-2022 extension bytes after the base layout
        data.extend_from_slice(&[1, 2, 3]);

        let key = Pubkey::new_unique();
        assert_eq!(unpack_mint_decimals(&key, &data).unwrap(), 6);
        assert!(unpack_mint_decimals(&key, &data[..40]).is_err());
    }

    #[test]
    fn test_commitment_mapping() {
        assert_eq!(commitment(ConfirmationDepth::Finalized), CommitmentConfig::finalized());
        assert_eq!(commitment(ConfirmationDepth::Confirmed), CommitmentConfig::confirmed());
        assert_eq!(depth_of(TransactionConfirmationStatus::Processed), ConfirmationDepth::Processed);
    }
}
