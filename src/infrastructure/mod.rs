//! Infrastructure layer - concrete RPC and HTTP collaborators

pub mod api_clients;
pub mod blockchain;
