//! Direct blockchain access: ledger RPC and token names

pub mod rpc_client;
pub mod token_metadata;

pub use rpc_client::SolanaRpcClient;
pub use token_metadata::TokenRegistryClient;
