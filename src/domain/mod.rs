//! Domain layer - core business logic and entities

pub mod execution;
pub mod ledger;
pub mod swap;
pub mod wallet;
